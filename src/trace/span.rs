//! Recorded span data.
//!
//! These are plain accumulators; the recorders in `trace.rs` decide what
//! lands here. A closed span is handed to a `SpanSink` as-is.

use serde::Serialize;

/// A key/value annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub key: i32,
    pub name: &'static str,
    pub value: String,
}

/// One trace block inside a span.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpanEvent {
    pub sequence: u32,
    pub depth: u32,
    /// Offset from span start, in milliseconds.
    pub start_elapsed_ms: u64,
    pub end_elapsed_ms: Option<u64>,
    pub service_type: Option<i16>,
    pub api_id: Option<i32>,
    pub api: Option<String>,
    pub annotations: Vec<Annotation>,
    pub exception: Option<String>,
}

/// The root span of one traced request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Span {
    pub agent_id: String,
    pub application_name: String,
    pub transaction_id: String,
    pub span_id: i64,
    pub parent_span_id: i64,
    pub flags: i16,
    /// Wall clock start, milliseconds since the epoch.
    pub start_time: u64,
    pub elapsed_ms: u64,
    pub service_type: Option<i16>,
    pub rpc: Option<String>,
    pub end_point: Option<String>,
    pub remote_addr: Option<String>,
    pub acceptor_host: Option<String>,
    pub parent_application_name: Option<String>,
    pub parent_application_type: Option<i16>,
    pub api_id: Option<i32>,
    pub api: Option<String>,
    pub annotations: Vec<Annotation>,
    pub span_events: Vec<SpanEvent>,
}

impl Span {
    /// Look up the first annotation with `key`.
    pub fn annotation(&self, key: i32) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}
