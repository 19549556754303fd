//! Trace context propagation subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → sampling.rs (Pinpoint-Sampled → should sample?)
//!     → trace_id.rs (Pinpoint-TraceID / SpanID / pSpanID / Flags → TraceId)
//!     → trace context continues or starts a trace
//!
//! Outbound call made by a handler
//!     → CurrentTrace::inject (header.rs names)
//!     → downstream service repeats the inbound flow
//! ```
//!
//! # Design Decisions
//! - Header lookups are case-insensitive (http::HeaderMap)
//! - Malformed numeric values degrade to sentinels, never to errors
//! - Only non-UTF-8 header bytes surface as errors, and only on the
//!   recording path

pub mod header;
pub mod sampling;
pub mod trace_id;

pub use sampling::{should_sample, SamplingFlag};
pub use trace_id::{extract_trace_id, SpanId, TraceId};
