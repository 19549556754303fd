//! Trace context subsystem.
//!
//! # Data Flow
//! ```text
//! TraceContext (one per interceptor, shared via Arc)
//!     → new_trace / continue_trace / disable_sampling
//!     → Trace handle (owned by the request future)
//!         → SpanRecorder (root span fields)
//!         → SpanEventRecorder (per trace block)
//!     → close()
//!         → SpanSink (completed span leaves the request path)
//!         → ActiveTraceRegistry (entry removed)
//! ```
//!
//! # Design Decisions
//! - A Trace is owned by exactly one request; nothing looks it up globally
//! - close() is idempotent and also runs on drop
//! - The registry is for introspection only

pub mod context;
pub mod registry;
pub mod sampler;
pub mod service_type;
pub mod sink;
pub mod span;
#[allow(clippy::module_inception)]
pub mod trace;

pub use context::TraceContext;
pub use registry::{ActiveTraceInfo, ActiveTraceRegistry};
pub use sampler::{FalseSampler, RateSampler, Sampler, TrueSampler};
pub use service_type::{AnnotationKey, ApiDescriptor, ServiceType};
pub use sink::{CollectingSink, LoggingSink, SpanSink};
pub use span::{Annotation, Span, SpanEvent};
pub use trace::{SpanEventRecorder, SpanRecorder, Trace, TraceState};
