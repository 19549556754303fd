//! Request-scoped view of the trace, for handlers making outbound calls.

use axum::http::{HeaderMap, HeaderValue};

use crate::interceptor::error::TraceError;
use crate::propagation::{header, SamplingFlag, TraceId};

/// Attached to request extensions by the dispatch layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTrace {
    trace_id: Option<TraceId>,
    sampled: bool,
    application_name: String,
    service_type: i16,
}

impl CurrentTrace {
    pub(crate) fn new(trace_id: Option<TraceId>, sampled: bool, application_name: &str, service_type: i16) -> Self {
        Self {
            trace_id,
            sampled,
            application_name: application_name.to_string(),
            service_type,
        }
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Write propagation headers for a call to `host`.
    ///
    /// Unsampled traces only forward `Pinpoint-Sampled: s0`.
    pub fn inject(&self, headers: &mut HeaderMap, host: &str) -> Result<(), TraceError> {
        let id = match (&self.trace_id, self.sampled) {
            (Some(id), true) => id,
            _ => {
                headers.insert(
                    header::SAMPLED,
                    HeaderValue::from_static(SamplingFlag::DoNotSample.as_token()),
                );
                return Ok(());
            }
        };

        let child = id.next_child();
        headers.insert(header::TRACE_ID, value(&child.transaction_id, "transaction id")?);
        headers.insert(header::SPAN_ID, HeaderValue::from(child.span_id));
        headers.insert(header::PARENT_SPAN_ID, HeaderValue::from(child.parent_span_id));
        headers.insert(header::FLAGS, HeaderValue::from(child.flags));
        headers.insert(
            header::PARENT_APPLICATION_NAME,
            value(&self.application_name, "application name")?,
        );
        headers.insert(header::PARENT_APPLICATION_TYPE, HeaderValue::from(self.service_type));
        headers.insert(header::PARENT_HOST, value(host, "host")?);
        Ok(())
    }
}

fn value(s: &str, what: &'static str) -> Result<HeaderValue, TraceError> {
    HeaderValue::from_str(s).map_err(|_| TraceError::InvalidHeaderValue(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::extract_trace_id;

    #[test]
    fn test_inject_not_sampled() {
        let current = CurrentTrace::new(None, false, "app", 1140);
        let mut headers = HeaderMap::new();
        current.inject(&mut headers, "downstream:8080").unwrap();

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(header::SAMPLED).unwrap(), "s0");
    }

    #[test]
    fn test_inject_round_trips_through_extraction() {
        let id = TraceId::new("agent^1^3", 5, 9, 0);
        let current = CurrentTrace::new(Some(id.clone()), true, "app", 1140);
        let mut headers = HeaderMap::new();
        current.inject(&mut headers, "downstream:8080").unwrap();

        let downstream = extract_trace_id(&headers).unwrap();
        assert_eq!(downstream.transaction_id, id.transaction_id);
        assert_eq!(downstream.parent_span_id, 9);
        assert_ne!(downstream.span_id, 9);
        assert_eq!(headers.get(header::PARENT_APPLICATION_NAME).unwrap(), "app");
        assert_eq!(headers.get(header::PARENT_APPLICATION_TYPE).unwrap(), "1140");
        assert_eq!(headers.get(header::PARENT_HOST).unwrap(), "downstream:8080");
    }
}
