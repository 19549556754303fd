//! Registry of in-flight sampled traces.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// What the registry knows about one in-flight trace.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTraceInfo {
    pub transaction_id: String,
    pub span_id: i64,
    /// Milliseconds since the epoch.
    pub start_time: u64,
}

/// Process-wide map of open traces, keyed by a local handle.
///
/// Introspection only. Requests never look up their own trace here.
#[derive(Debug, Clone, Default)]
pub struct ActiveTraceRegistry {
    inner: Arc<DashMap<u64, ActiveTraceInfo>>,
    next_id: Arc<AtomicU64>,
}

impl ActiveTraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, returning the handle needed to remove it.
    pub fn register(&self, transaction_id: &str, span_id: i64) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.insert(
            id,
            ActiveTraceInfo {
                transaction_id: transaction_id.to_string(),
                span_id,
                start_time: now_millis(),
            },
        );
        metrics::set_active_traces(self.inner.len());
        id
    }

    pub fn unregister(&self, id: u64) {
        self.inner.remove(&id);
        metrics::set_active_traces(self.inner.len());
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    /// Copy of all entries, oldest first.
    pub fn snapshot(&self) -> Vec<ActiveTraceInfo> {
        let mut entries: Vec<(u64, ActiveTraceInfo)> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, info)| info).collect()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
