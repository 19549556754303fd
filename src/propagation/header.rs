//! Propagation header names and lenient header accessors.
//!
//! Canonical wire spellings are `Pinpoint-TraceID`, `Pinpoint-SpanID`,
//! `Pinpoint-pSpanID`, `Pinpoint-Sampled`, `Pinpoint-Flags`,
//! `Pinpoint-pAppName`, `Pinpoint-pAppType` and `Pinpoint-Host`.
//! `HeaderName` stores names lowercased; HTTP header matching is
//! case-insensitive so the two spellings are the same header on the wire.

use axum::http::header::{HeaderMap, HeaderName, HOST};

use crate::interceptor::error::TraceError;

/// Transaction id of the distributed trace.
pub const TRACE_ID: HeaderName = HeaderName::from_static("pinpoint-traceid");

/// Span id assigned by the caller to this hop.
pub const SPAN_ID: HeaderName = HeaderName::from_static("pinpoint-spanid");

/// Span id of the caller.
pub const PARENT_SPAN_ID: HeaderName = HeaderName::from_static("pinpoint-pspanid");

/// Client-side sampling override.
pub const SAMPLED: HeaderName = HeaderName::from_static("pinpoint-sampled");

/// Trace flags (16-bit).
pub const FLAGS: HeaderName = HeaderName::from_static("pinpoint-flags");

/// Application name of the caller.
pub const PARENT_APPLICATION_NAME: HeaderName = HeaderName::from_static("pinpoint-pappname");

/// Service type code of the caller.
pub const PARENT_APPLICATION_TYPE: HeaderName = HeaderName::from_static("pinpoint-papptype");

/// Host the caller addressed when it made the call.
pub const PARENT_HOST: HeaderName = HeaderName::from_static("pinpoint-host");

/// Read a header as a string, treating non-UTF-8 bytes as absent.
///
/// Used on the extraction path where leniency is required.
pub fn get_lenient<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Read a header as a string, reporting non-UTF-8 bytes as an error.
///
/// Used on the recording path; the interceptor catches and logs the error.
pub fn get_strict<'a>(
    headers: &'a HeaderMap,
    name: &HeaderName,
) -> Result<Option<&'a str>, TraceError> {
    match headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| TraceError::InvalidHeader(name.as_str().to_string())),
        None => Ok(None),
    }
}

/// Read the `Host` header on the recording path.
pub fn host(headers: &HeaderMap) -> Result<Option<&str>, TraceError> {
    get_strict(headers, &HOST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"Pinpoint-TraceID").unwrap(),
            HeaderValue::from_static("agent^1^1"),
        );

        assert_eq!(get_lenient(&headers, &TRACE_ID), Some("agent^1^1"));
    }

    #[test]
    fn test_non_utf8_value() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        assert_eq!(get_lenient(&headers, &HOST), None);
        assert!(matches!(host(&headers), Err(TraceError::InvalidHeader(name)) if name == "host"));
    }
}
