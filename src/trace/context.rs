//! Trace factory shared by all requests handled by one interceptor.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::TraceConfig;
use crate::observability::metrics;
use crate::propagation::TraceId;
use crate::trace::registry::{now_millis, ActiveTraceRegistry};
use crate::trace::sampler::{self, Sampler};
use crate::trace::service_type::{ApiDescriptor, ServiceType};
use crate::trace::sink::SpanSink;
use crate::trace::trace::Trace;

/// Creates traces and owns agent-wide tracing state.
pub struct TraceContext {
    agent_id: String,
    application_name: String,
    agent_start_millis: u64,
    sequence: Arc<AtomicU64>,
    sampler: Box<dyn Sampler>,
    sink: Arc<dyn SpanSink>,
    registry: ActiveTraceRegistry,
    api_cache: Arc<DashMap<String, i32>>,
    next_api_id: Arc<AtomicI32>,
}

impl TraceContext {
    pub fn new(
        agent_id: impl Into<String>,
        application_name: impl Into<String>,
        sampler: Box<dyn Sampler>,
        sink: Arc<dyn SpanSink>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            application_name: application_name.into(),
            agent_start_millis: now_millis(),
            sequence: Arc::new(AtomicU64::new(0)),
            sampler,
            sink,
            registry: ActiveTraceRegistry::new(),
            api_cache: Arc::new(DashMap::new()),
            next_api_id: Arc::new(AtomicI32::new(1)),
        }
    }

    /// Build from configuration. A missing agent id gets a random one.
    pub fn from_config(config: &TraceConfig, sink: Arc<dyn SpanSink>) -> Self {
        let agent_id = config
            .agent_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string()[..16].to_string());
        Self::new(
            agent_id,
            config.application_name.clone(),
            sampler::from_rate(config.sampling_rate),
            sink,
        )
    }

    /// A context for reloaded configuration.
    ///
    /// Keeps the agent identity (unless the new config names one), the
    /// transaction sequence, the API ids, the sink and the registry, so ids
    /// stay unique and in-flight traces stay visible across a reload.
    pub fn reconfigure(&self, config: &TraceConfig) -> Self {
        Self {
            agent_id: config.agent_id.clone().unwrap_or_else(|| self.agent_id.clone()),
            application_name: config.application_name.clone(),
            agent_start_millis: self.agent_start_millis,
            sequence: self.sequence.clone(),
            sampler: sampler::from_rate(config.sampling_rate),
            sink: self.sink.clone(),
            registry: self.registry.clone(),
            api_cache: self.api_cache.clone(),
            next_api_id: self.next_api_id.clone(),
        }
    }

    /// Start a new trace rooted at this agent.
    pub fn new_trace(&self) -> Trace {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = TraceId::new_root(&self.agent_id, self.agent_start_millis, sequence);
        let sampled = self.sampler.is_sampling();
        metrics::record_trace_started("new", sampled);
        Trace::active(
            id,
            sampled,
            &self.agent_id,
            &self.application_name,
            self.sink.clone(),
            &self.registry,
        )
    }

    /// Continue a trace started upstream.
    pub fn continue_trace(&self, id: TraceId) -> Trace {
        let sampled = self.sampler.is_continue_sampling(&id);
        metrics::record_trace_started("continue", sampled);
        Trace::active(
            id,
            sampled,
            &self.agent_id,
            &self.application_name,
            self.sink.clone(),
            &self.registry,
        )
    }

    /// A trace that only propagates "do not sample".
    pub fn disable_sampling(&self) -> Trace {
        metrics::record_not_sampled();
        Trace::not_sampled()
    }

    /// Intern an API name, assigning it a stable id.
    pub fn cache_api(&self, full_name: &str) -> ApiDescriptor {
        let api_id = *self
            .api_cache
            .entry(full_name.to_string())
            .or_insert_with(|| self.next_api_id.fetch_add(1, Ordering::Relaxed));
        ApiDescriptor {
            api_id,
            full_name: full_name.to_string(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Service type this application reports to downstream callees.
    pub fn service_type(&self) -> ServiceType {
        ServiceType::HTTP_DISPATCHER
    }

    pub fn registry(&self) -> &ActiveTraceRegistry {
        &self.registry
    }
}
