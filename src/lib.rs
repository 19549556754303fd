//! HTTP dispatcher tracing agent.
//!
//! Propagates distributed-trace context through an HTTP request
//! dispatcher: reads incoming trace headers, decides whether to sample,
//! opens or continues a trace, records a root span and a dispatch span
//! event, and closes the trace on every exit path.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ TraceDispatchLayer ──▶ dispatcher handler
//!                       │ before()             │ CurrentTrace::inject
//!                       │  exclude filter      ▼ (downstream headers)
//!                       │  sampling flag
//!                       │  trace id extract ─▶ TraceContext ─▶ Trace
//!                       │  root span             (sampler,       │
//!                       │  span event             sequence,      │ close
//!                       │ after()                 registry)      ▼
//!     Client Response ◀─┘  status, params                     SpanSink
//! ```
//!
//! The interceptor is built from [`config::TraceConfig`] and sits behind an
//! `ArcSwap`, so a reloaded configuration applies to new requests.

pub mod admin;
pub mod config;
pub mod http;
pub mod interceptor;
pub mod lifecycle;
pub mod observability;
pub mod propagation;
pub mod trace;

pub use config::schema::AgentConfig;
pub use http::HttpServer;
pub use interceptor::{CurrentTrace, DispatchInterceptor, TraceDispatchLayer};
pub use lifecycle::Shutdown;
