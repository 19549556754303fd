//! The per-request trace handle and its recorders.
//!
//! # States
//! ```text
//! NotSampled ──close──▶ Closed
//! Active     ──close──▶ Closed
//! ```
//! A NotSampled trace exists only so that "do not sample" can be
//! propagated downstream; it never records anything. An Active trace
//! records span content only when its own sampling check passed
//! (`can_sampled()`).

use std::sync::Arc;
use std::time::Instant;

use crate::observability::metrics;
use crate::propagation::TraceId;
use crate::trace::registry::{now_millis, ActiveTraceRegistry};
use crate::trace::service_type::{AnnotationKey, ApiDescriptor, ServiceType};
use crate::trace::sink::SpanSink;
use crate::trace::span::{Annotation, Span, SpanEvent};

/// Lifecycle state of a [`Trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceState {
    NotSampled,
    Active,
    Closed,
}

/// One in-flight trace, owned by the request that created it.
pub struct Trace {
    state: TraceState,
    sampled: bool,
    id: Option<TraceId>,
    span: Span,
    started: Instant,
    /// Indices into `span.span_events` of blocks not yet ended.
    open_blocks: Vec<usize>,
    sink: Option<Arc<dyn SpanSink>>,
    registry: Option<(ActiveTraceRegistry, u64)>,
}

impl Trace {
    /// A handle that only carries "do not sample".
    pub(crate) fn not_sampled() -> Self {
        Self {
            state: TraceState::NotSampled,
            sampled: false,
            id: None,
            span: Span::default(),
            started: Instant::now(),
            open_blocks: Vec::new(),
            sink: None,
            registry: None,
        }
    }

    /// An active trace. Span content is recorded only when `sampled`.
    pub(crate) fn active(
        id: TraceId,
        sampled: bool,
        agent_id: &str,
        application_name: &str,
        sink: Arc<dyn SpanSink>,
        registry: &ActiveTraceRegistry,
    ) -> Self {
        let span = Span {
            agent_id: agent_id.to_string(),
            application_name: application_name.to_string(),
            transaction_id: id.transaction_id.clone(),
            span_id: id.span_id,
            parent_span_id: id.parent_span_id,
            flags: id.flags,
            start_time: now_millis(),
            ..Span::default()
        };
        let registry = sampled.then(|| {
            let handle = registry.register(&id.transaction_id, id.span_id);
            (registry.clone(), handle)
        });

        Self {
            state: TraceState::Active,
            sampled,
            id: Some(id),
            span,
            started: Instant::now(),
            open_blocks: Vec::new(),
            sink: Some(sink),
            registry,
        }
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    /// Identity of this hop; `None` for a NotSampled trace.
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.id.as_ref()
    }

    /// True when span content should be recorded.
    pub fn can_sampled(&self) -> bool {
        self.state == TraceState::Active && self.sampled
    }

    /// Recorder for the root span, if this trace records content.
    pub fn span_recorder(&mut self) -> Option<SpanRecorder<'_>> {
        if !self.can_sampled() {
            return None;
        }
        Some(SpanRecorder { span: &mut self.span })
    }

    /// Open a new trace block and return its recorder.
    pub fn trace_block_begin(&mut self) -> Option<SpanEventRecorder<'_>> {
        if !self.can_sampled() {
            return None;
        }
        let index = self.span.span_events.len();
        let event = SpanEvent {
            sequence: index as u32,
            depth: self.open_blocks.len() as u32 + 1,
            start_elapsed_ms: self.elapsed_ms(),
            ..SpanEvent::default()
        };
        self.span.span_events.push(event);
        self.open_blocks.push(index);
        Some(SpanEventRecorder {
            event: &mut self.span.span_events[index],
        })
    }

    /// Recorder for the innermost open trace block.
    pub fn current_span_event_recorder(&mut self) -> Option<SpanEventRecorder<'_>> {
        if !self.can_sampled() {
            return None;
        }
        let index = *self.open_blocks.last()?;
        Some(SpanEventRecorder {
            event: &mut self.span.span_events[index],
        })
    }

    /// End the innermost open trace block. No-op when none is open.
    pub fn trace_block_end(&mut self) {
        if let Some(index) = self.open_blocks.pop() {
            let elapsed = self.elapsed_ms();
            self.span.span_events[index].end_elapsed_ms = Some(elapsed);
        }
    }

    /// Close the trace. Returns false if it was already closed.
    ///
    /// Sampled traces hand their span to the sink exactly once.
    pub fn close(&mut self) -> bool {
        match self.state {
            TraceState::Closed => return false,
            TraceState::NotSampled => {}
            TraceState::Active => {
                while !self.open_blocks.is_empty() {
                    self.trace_block_end();
                }
                if let Some((registry, handle)) = self.registry.take() {
                    registry.unregister(handle);
                }
                if self.sampled {
                    self.span.elapsed_ms = self.elapsed_ms();
                    let span = std::mem::take(&mut self.span);
                    if let Some(sink) = &self.sink {
                        sink.send(span);
                    }
                }
            }
        }
        self.state = TraceState::Closed;
        metrics::record_trace_closed();
        true
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Drop for Trace {
    fn drop(&mut self) {
        if self.state != TraceState::Closed {
            tracing::debug!(
                transaction_id = ?self.id.as_ref().map(|id| &id.transaction_id),
                "Trace dropped before close, closing"
            );
            self.close();
        }
    }
}

impl std::fmt::Debug for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trace")
            .field("state", &self.state)
            .field("sampled", &self.sampled)
            .field("id", &self.id)
            .finish()
    }
}

/// Writes root span fields.
pub struct SpanRecorder<'a> {
    span: &'a mut Span,
}

impl SpanRecorder<'_> {
    pub fn record_service_type(&mut self, service_type: ServiceType) {
        self.span.service_type = Some(service_type.code);
    }

    pub fn record_rpc_name(&mut self, rpc: &str) {
        self.span.rpc = Some(rpc.to_string());
    }

    pub fn record_end_point(&mut self, end_point: Option<&str>) {
        self.span.end_point = end_point.map(str::to_string);
    }

    pub fn record_remote_address(&mut self, remote_addr: Option<&str>) {
        self.span.remote_addr = remote_addr.map(str::to_string);
    }

    pub fn record_acceptor_host(&mut self, host: Option<&str>) {
        self.span.acceptor_host = host.map(str::to_string);
    }

    pub fn record_parent_application(&mut self, name: &str, service_type: i16) {
        self.span.parent_application_name = Some(name.to_string());
        self.span.parent_application_type = Some(service_type);
    }

    pub fn record_api(&mut self, api: &ApiDescriptor) {
        self.span.api_id = Some(api.api_id);
        self.span.api = Some(api.full_name.clone());
    }

    pub fn record_attribute(&mut self, key: AnnotationKey, value: impl Into<String>) {
        self.span.annotations.push(Annotation {
            key: key.code,
            name: key.name,
            value: value.into(),
        });
    }

    /// True when this span starts the distributed trace.
    pub fn is_root(&self) -> bool {
        self.span.parent_span_id == crate::propagation::SpanId::NULL
    }
}

/// Writes fields of one trace block.
pub struct SpanEventRecorder<'a> {
    event: &'a mut SpanEvent,
}

impl SpanEventRecorder<'_> {
    pub fn record_service_type(&mut self, service_type: ServiceType) {
        self.event.service_type = Some(service_type.code);
    }

    pub fn record_api(&mut self, api: &ApiDescriptor) {
        self.event.api_id = Some(api.api_id);
        self.event.api = Some(api.full_name.clone());
    }

    pub fn record_attribute(&mut self, key: AnnotationKey, value: impl Into<String>) {
        self.event.annotations.push(Annotation {
            key: key.code,
            name: key.name,
            value: value.into(),
        });
    }

    pub fn record_exception(&mut self, message: impl Into<String>) {
        self.event.exception = Some(message.into());
    }
}
