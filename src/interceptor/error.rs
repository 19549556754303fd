//! Tracing error definitions.

use thiserror::Error;

/// Errors raised while building or running the dispatch interceptor.
///
/// Per-request variants are caught at the interceptor boundary and logged;
/// they never reach the wrapped request.
#[derive(Debug, Error)]
pub enum TraceError {
    /// A header needed for recording is not valid UTF-8.
    #[error("Header {0} is not valid UTF-8")]
    InvalidHeader(String),

    /// The real-ip resolver was selected without a header name.
    #[error("Real-ip header name must be set to use the real-ip resolver")]
    MissingRealIpHeader,

    /// The configured real-ip header name is not a legal header name.
    #[error("Invalid real-ip header name: {0:?}")]
    InvalidRealIpHeader(String),

    /// A propagation value cannot be written as a header value.
    #[error("Cannot encode {0} as a header value")]
    InvalidHeaderValue(&'static str),
}
