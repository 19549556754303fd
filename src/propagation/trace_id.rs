//! Structured trace identifiers and their extraction from request headers.

use std::fmt;

use axum::http::HeaderMap;
use serde::Serialize;

use crate::propagation::header;

/// Span id helpers.
pub struct SpanId;

impl SpanId {
    /// Reserved "unset" span id. Never produced by [`SpanId::next`].
    pub const NULL: i64 = -1;

    /// Generate a fresh span id, never equal to [`SpanId::NULL`].
    pub fn next() -> i64 {
        loop {
            let id = fastrand::i64(..);
            if id != Self::NULL {
                return id;
            }
        }
    }

    /// Generate a fresh span id distinct from `exclude`.
    pub fn next_excluding(exclude: i64) -> i64 {
        loop {
            let id = Self::next();
            if id != exclude {
                return id;
            }
        }
    }
}

/// Identity of one hop of a distributed trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TraceId {
    /// Transaction id shared by every hop of the trace.
    pub transaction_id: String,
    /// Span id of the caller, or [`SpanId::NULL`] at the root.
    pub parent_span_id: i64,
    /// Span id of this hop.
    pub span_id: i64,
    /// Trace flags.
    pub flags: i16,
}

impl TraceId {
    pub fn new(transaction_id: impl Into<String>, parent_span_id: i64, span_id: i64, flags: i16) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            parent_span_id,
            span_id,
            flags,
        }
    }

    /// Start a brand new trace rooted at this agent.
    ///
    /// Transaction ids have the form `{agent_id}^{agent_start_millis}^{sequence}`.
    pub fn new_root(agent_id: &str, agent_start_millis: u64, sequence: u64) -> Self {
        Self::new(
            format!("{}^{}^{}", agent_id, agent_start_millis, sequence),
            SpanId::NULL,
            SpanId::next(),
            0,
        )
    }

    /// Identity of a downstream hop called from this one.
    pub fn next_child(&self) -> Self {
        Self::new(
            self.transaction_id.clone(),
            self.span_id,
            SpanId::next_excluding(self.span_id),
            self.flags,
        )
    }

    /// True when no upstream span exists.
    pub fn is_root(&self) -> bool {
        self.parent_span_id == SpanId::NULL
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TraceId{{transactionId={}, parentSpanId={}, spanId={}, flags={}}}",
            self.transaction_id, self.parent_span_id, self.span_id, self.flags
        )
    }
}

/// Build a [`TraceId`] from inbound propagation headers.
///
/// Returns `None` when the transaction id header is absent, empty, or not
/// valid UTF-8. Numeric fields never fail: span ids fall back to
/// [`SpanId::NULL`] and flags fall back to `0`.
pub fn extract_trace_id(headers: &HeaderMap) -> Option<TraceId> {
    let transaction_id = header::get_lenient(headers, &header::TRACE_ID)?;
    if transaction_id.is_empty() {
        return None;
    }

    let parent_span_id = parse_or(headers, &header::PARENT_SPAN_ID, SpanId::NULL);
    let span_id = parse_or(headers, &header::SPAN_ID, SpanId::NULL);
    let flags = parse_or(headers, &header::FLAGS, 0i16);

    let id = TraceId::new(transaction_id, parent_span_id, span_id, flags);
    tracing::debug!(trace_id = %id, "TraceID exist. continue trace");
    Some(id)
}

fn parse_or<T: std::str::FromStr>(headers: &HeaderMap, name: &axum::http::HeaderName, default: T) -> T {
    header::get_lenient(headers, name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
