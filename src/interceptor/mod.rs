//! Request dispatch interception.
//!
//! # Data Flow
//! ```text
//! Request
//!     → layer.rs (TraceDispatch service, before/after around the inner call)
//!     → dispatch.rs (DispatchInterceptor::before)
//!         → filter.rs (excluded path? stop here)
//!         → propagation (sampling flag, TraceId)
//!         → trace context (new / continue / not-sampled)
//!         → remote_address.rs (client address for the root span)
//!     → inner service (handler)
//!     → dispatch.rs (DispatchInterceptor::after)
//!         → params.rs (bounded query-string capture)
//!         → trace close
//! ```
//!
//! # Design Decisions
//! - before() returns a scope value; after() consumes it, so a request
//!   can never close a trace it did not create
//! - Recording failures are logged and swallowed; handler errors are
//!   recorded and returned unchanged
//! - Dropping an in-flight request future still closes its trace

pub mod current;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod layer;
pub mod params;
pub mod remote_address;

pub use current::CurrentTrace;
pub use dispatch::{DispatchInterceptor, DispatchOutcome, DispatchScope};
pub use error::TraceError;
pub use filter::{ExcludePathFilter, SkipFilter, UrlFilter};
pub use layer::{InterceptorHandle, TraceDispatch, TraceDispatchLayer};
pub use remote_address::RemoteAddressResolver;
