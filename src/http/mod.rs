//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → TraceDispatchLayer (before: decide, open trace, root span)
//!     → dispatcher handler (echo, downstream header preview)
//!     → TraceDispatchLayer (after: status, params, close)
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
