//! Destinations for closed spans.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::trace::span::Span;

/// Receives every span whose trace was sampled, once, at close.
pub trait SpanSink: Send + Sync {
    fn send(&self, span: Span);
}

/// Emits each closed span as one structured JSON log event.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl SpanSink for LoggingSink {
    fn send(&self, span: Span) {
        match serde_json::to_string(&span) {
            Ok(json) => tracing::info!(
                target: "dispatch_trace::span",
                transaction_id = %span.transaction_id,
                span = %json,
                "Span closed"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize span"),
        }
    }
}

/// Keeps closed spans in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    spans: Mutex<Vec<Span>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of spans received so far.
    pub fn spans(&self) -> Vec<Span> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Span>> {
        self.spans.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpanSink for CollectingSink {
    fn send(&self, span: Span) {
        self.lock().push(span);
    }
}
