//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor and trace lifecycle produce:
//!     → logging.rs (structured log events, completed spans)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
