//! The before/after state machine around one request dispatch.
//!
//! # Transitions
//! ```text
//! before(request):
//!     excluded path        → None (after is never called)
//!     Pinpoint-Sampled: s0 → NotSampled trace
//!     Pinpoint-TraceID set → continued Active trace
//!     otherwise            → new Active trace
//! after(scope, outcome):
//!     not can_sampled      → close
//!     Active               → params, api, status/exception, block end, close
//! ```

use std::sync::Arc;

use axum::http::{HeaderMap, Request, StatusCode};

use crate::config::TraceConfig;
use crate::interceptor::current::CurrentTrace;
use crate::interceptor::error::TraceError;
use crate::interceptor::filter::{self, UrlFilter};
use crate::interceptor::params;
use crate::interceptor::remote_address::RemoteAddressResolver;
use crate::observability::metrics;
use crate::propagation::{self, header};
use crate::trace::{AnnotationKey, ApiDescriptor, ServiceType, SpanRecorder, SpanSink, Trace, TraceContext};

/// API recorded on the root span of every traced dispatch.
pub const DISPATCH_API_NAME: &str = "Dispatcher Process";

/// API recorded on the handler block when none is configured.
pub const DEFAULT_HANDLER_API_NAME: &str = "RequestDispatcher.dispatch(Request)";

/// How the wrapped handler finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler produced a response.
    Completed(StatusCode),
    /// The handler failed; the message is recorded as the exception.
    Failed(String),
}

/// Per-request state carried from `before` to `after`.
#[derive(Debug)]
pub struct DispatchScope {
    trace: Trace,
    query: Option<String>,
}

impl DispatchScope {
    pub fn trace(&self) -> &Trace {
        &self.trace
    }
}

/// Decides, records and closes the trace of each dispatched request.
pub struct DispatchInterceptor {
    enabled: bool,
    context: Arc<TraceContext>,
    exclude_filter: Box<dyn UrlFilter>,
    remote_address_resolver: RemoteAddressResolver,
    dispatch_api: ApiDescriptor,
    handler_api: ApiDescriptor,
    param_each_limit: usize,
    param_total_limit: usize,
}

impl DispatchInterceptor {
    /// Build from configuration with a fresh trace context.
    pub fn from_config(config: &TraceConfig, sink: Arc<dyn SpanSink>) -> Result<Self, TraceError> {
        let context = Arc::new(TraceContext::from_config(config, sink));
        Self::new(context, config)
    }

    /// Build around an existing trace context.
    ///
    /// Fails when the configured real-ip header cannot be used.
    pub fn new(context: Arc<TraceContext>, config: &TraceConfig) -> Result<Self, TraceError> {
        let remote_address_resolver = RemoteAddressResolver::from_config(
            config.real_ip_header.as_deref(),
            config.real_ip_empty_value.as_deref(),
        )?;
        let dispatch_api = context.cache_api(DISPATCH_API_NAME);
        let handler_api = context.cache_api(&config.handler_api);

        Ok(Self {
            enabled: config.enabled,
            exclude_filter: filter::from_config(&config.exclude_url),
            remote_address_resolver,
            dispatch_api,
            handler_api,
            param_each_limit: config.param_each_limit,
            param_total_limit: config.param_total_limit,
            context,
        })
    }

    /// Rebuild for a reloaded configuration, keeping agent identity,
    /// sequence, sink and registry.
    pub fn reconfigure(&self, config: &TraceConfig) -> Result<Self, TraceError> {
        let context = Arc::new(self.context.reconfigure(config));
        Self::new(context, config)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn context(&self) -> &Arc<TraceContext> {
        &self.context
    }

    /// Begin tracing a request. `None` means "do nothing for this request".
    pub fn before<B>(&self, request: &Request<B>) -> Option<DispatchScope> {
        if !self.enabled {
            return None;
        }

        let path = request.uri().path();
        if self.exclude_filter.filter(path) {
            tracing::trace!(request_uri = %path, "filter requestURI");
            metrics::record_filtered();
            return None;
        }

        let mut trace = self.create_trace(request);
        if let Some(mut recorder) = trace.trace_block_begin() {
            recorder.record_service_type(ServiceType::HTTP_DISPATCHER_METHOD);
        }

        Some(DispatchScope {
            trace,
            query: request.uri().query().map(str::to_string),
        })
    }

    /// Request-extension view of a scope, for outbound propagation.
    pub fn current_trace(&self, scope: &DispatchScope) -> CurrentTrace {
        CurrentTrace::new(
            scope.trace.trace_id().cloned(),
            scope.trace.can_sampled(),
            self.context.application_name(),
            self.context.service_type().code,
        )
    }

    /// Finish tracing a request. Always closes the trace.
    pub fn after(&self, mut scope: DispatchScope, outcome: &DispatchOutcome) {
        let trace = &mut scope.trace;
        if !trace.can_sampled() {
            trace.close();
            return;
        }

        let parameters = params::request_parameters(
            scope.query.as_deref(),
            self.param_each_limit,
            self.param_total_limit,
        );

        if let DispatchOutcome::Completed(status) = outcome {
            if let Some(mut recorder) = trace.span_recorder() {
                recorder.record_attribute(AnnotationKey::HTTP_STATUS_CODE, status.as_u16().to_string());
            }
        }

        if let Some(mut recorder) = trace.current_span_event_recorder() {
            if !parameters.is_empty() {
                recorder.record_attribute(AnnotationKey::HTTP_PARAM, parameters);
            }
            recorder.record_api(&self.handler_api);
            if let DispatchOutcome::Failed(message) = outcome {
                recorder.record_exception(message.as_str());
            }
        }

        trace.trace_block_end();
        trace.close();
    }

    fn create_trace<B>(&self, request: &Request<B>) -> Trace {
        let headers = request.headers();
        let path = request.uri().path();

        // client asked us not to sample; keep a handle so the flag propagates
        if !propagation::should_sample(headers) {
            tracing::debug!(request_url = %path, "remotecall sampling flag found. skip trace");
            return self.context.disable_sampling();
        }

        let (mut trace, kind) = match propagation::extract_trace_id(headers) {
            Some(trace_id) => (self.context.continue_trace(trace_id), "continue"),
            None => (self.context.new_trace(), "new"),
        };

        let recorded = match trace.span_recorder() {
            Some(mut recorder) => {
                if let Err(e) = self.record_root_span(&mut recorder, request) {
                    tracing::warn!(error = %e, request_url = %path, "BEFORE. Caused");
                    metrics::record_trace_error("before");
                }
                true
            }
            None => false,
        };

        if recorded {
            tracing::debug!(kind, trace_id = ?trace.trace_id(), request_url = %path, "Trace started");
        } else {
            tracing::debug!(kind, request_url = %path, "canSampled is false. skip trace");
        }
        trace
    }

    fn record_root_span<B>(&self, recorder: &mut SpanRecorder<'_>, request: &Request<B>) -> Result<(), TraceError> {
        let headers = request.headers();
        recorder.record_service_type(ServiceType::HTTP_DISPATCHER);
        recorder.record_rpc_name(request.uri().path());
        recorder.record_end_point(header::host(headers)?);
        recorder.record_remote_address(self.remote_address_resolver.resolve(headers)?);

        if !recorder.is_root() {
            record_parent_info(recorder, headers)?;
        }
        recorder.record_api(&self.dispatch_api);
        Ok(())
    }
}

impl std::fmt::Debug for DispatchInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchInterceptor")
            .field("enabled", &self.enabled)
            .field("agent_id", &self.context.agent_id())
            .field("exclude_filter", &self.exclude_filter)
            .field("remote_address_resolver", &self.remote_address_resolver)
            .finish()
    }
}

fn record_parent_info(recorder: &mut SpanRecorder<'_>, headers: &HeaderMap) -> Result<(), TraceError> {
    let Some(parent_application_name) = header::get_strict(headers, &header::PARENT_APPLICATION_NAME)? else {
        return Ok(());
    };

    let acceptor_host = match header::get_strict(headers, &header::PARENT_HOST)? {
        Some(host) => Some(host),
        None => header::host(headers)?,
    };
    recorder.record_acceptor_host(acceptor_host);

    let parent_application_type = header::get_lenient(headers, &header::PARENT_APPLICATION_TYPE)
        .and_then(|v| v.parse::<i16>().ok())
        .unwrap_or(ServiceType::UNDEFINED.code);
    recorder.record_parent_application(parent_application_name, parent_application_type);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::{SpanId, TraceId};
    use crate::trace::{CollectingSink, FalseSampler, Sampler, TraceState, TrueSampler};
    use axum::http::HeaderValue;

    #[derive(Debug)]
    struct RejectContinued;

    impl Sampler for RejectContinued {
        fn is_sampling(&self) -> bool {
            true
        }

        fn is_continue_sampling(&self, _trace_id: &TraceId) -> bool {
            false
        }
    }

    fn interceptor_with(
        sampler: Box<dyn Sampler>,
        config: TraceConfig,
    ) -> (DispatchInterceptor, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let context = Arc::new(TraceContext::new("agent-1", "orders-api", sampler, sink.clone()));
        (DispatchInterceptor::new(context, &config).unwrap(), sink)
    }

    fn interceptor() -> (DispatchInterceptor, Arc<CollectingSink>) {
        interceptor_with(Box::new(TrueSampler), TraceConfig::default())
    }

    fn request(uri: &str, headers: &[(&'static str, &'static str)]) -> Request<()> {
        let mut builder = Request::builder().uri(uri).header("host", "api.example.com");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_new_trace_records_root_span() {
        let (interceptor, sink) = interceptor();
        let req = request("/orders?id=7", &[]);

        let scope = interceptor.before(&req).unwrap();
        assert_eq!(scope.trace().state(), TraceState::Active);
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        let span = &spans[0];
        assert_eq!(span.parent_span_id, SpanId::NULL);
        assert_eq!(span.service_type, Some(ServiceType::HTTP_DISPATCHER.code));
        assert_eq!(span.rpc.as_deref(), Some("/orders"));
        assert_eq!(span.end_point.as_deref(), Some("api.example.com"));
        assert_eq!(span.remote_addr.as_deref(), Some("api.example.com"));
        assert_eq!(span.api.as_deref(), Some(DISPATCH_API_NAME));
        assert_eq!(span.parent_application_name, None);
        assert_eq!(span.annotation(AnnotationKey::HTTP_STATUS_CODE.code), Some("200"));

        let event = &span.span_events[0];
        assert_eq!(event.service_type, Some(ServiceType::HTTP_DISPATCHER_METHOD.code));
        assert_eq!(event.api.as_deref(), Some(DEFAULT_HANDLER_API_NAME));
        assert_eq!(event.annotations[0].value, "id=7");
        assert!(event.end_elapsed_ms.is_some());
    }

    #[test]
    fn test_continued_trace_records_parent() {
        let (interceptor, sink) = interceptor();
        let req = request(
            "/orders",
            &[
                ("pinpoint-traceid", "T1"),
                ("pinpoint-pspanid", "5"),
                ("pinpoint-spanid", "9"),
                ("pinpoint-flags", "0"),
                ("pinpoint-pappname", "gateway"),
                ("pinpoint-papptype", "oops"),
            ],
        );

        let scope = interceptor.before(&req).unwrap();
        assert_eq!(scope.trace().trace_id(), Some(&TraceId::new("T1", 5, 9, 0)));
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));

        let spans = sink.spans();
        let span = &spans[0];
        assert_eq!(span.parent_application_name.as_deref(), Some("gateway"));
        assert_eq!(span.parent_application_type, Some(ServiceType::UNDEFINED.code));
        // no Pinpoint-Host, falls back to Host
        assert_eq!(span.acceptor_host.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_sampling_flag_disables_even_with_trace_id() {
        let (interceptor, sink) = interceptor();
        let req = request("/orders", &[("pinpoint-sampled", "s0"), ("pinpoint-traceid", "T1")]);

        let scope = interceptor.before(&req).unwrap();
        assert_eq!(scope.trace().state(), TraceState::NotSampled);
        assert!(!interceptor.current_trace(&scope).is_sampled());
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));

        assert!(sink.is_empty());
    }

    #[test]
    fn test_filtered_path_creates_nothing() {
        let config = TraceConfig {
            exclude_url: "/health".to_string(),
            ..TraceConfig::default()
        };
        let (interceptor, sink) = interceptor_with(Box::new(TrueSampler), config);

        let req = request("/health", &[("pinpoint-traceid", "T1")]);
        assert!(interceptor.before(&req).is_none());
        assert_eq!(interceptor.context().registry().count(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_disabled_interceptor() {
        let config = TraceConfig {
            enabled: false,
            ..TraceConfig::default()
        };
        let (interceptor, _sink) = interceptor_with(Box::new(TrueSampler), config);
        assert!(interceptor.before(&request("/orders", &[])).is_none());
    }

    #[test]
    fn test_continued_trace_rejected_by_sampler() {
        let (interceptor, sink) = interceptor_with(Box::new(RejectContinued), TraceConfig::default());
        let req = request("/orders", &[("pinpoint-traceid", "T1")]);

        let scope = interceptor.before(&req).unwrap();
        assert_eq!(scope.trace().state(), TraceState::Active);
        assert!(!scope.trace().can_sampled());
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));

        assert!(sink.is_empty());
    }

    #[test]
    fn test_new_trace_rejected_by_sampler() {
        let (interceptor, sink) = interceptor_with(Box::new(FalseSampler), TraceConfig::default());

        let scope = interceptor.before(&request("/orders", &[])).unwrap();
        assert!(!scope.trace().can_sampled());
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_handler_failure_is_recorded() {
        let (interceptor, sink) = interceptor();
        let scope = interceptor.before(&request("/orders", &[])).unwrap();
        interceptor.after(scope, &DispatchOutcome::Failed("database unavailable".into()));

        let spans = sink.spans();
        assert_eq!(spans[0].span_events[0].exception.as_deref(), Some("database unavailable"));
        assert_eq!(spans[0].annotation(AnnotationKey::HTTP_STATUS_CODE.code), None);
    }

    #[test]
    fn test_recording_error_still_closes() {
        let (interceptor, sink) = interceptor();
        let mut req = request("/orders", &[]);
        req.headers_mut()
            .insert("host", HeaderValue::from_bytes(&[0xff]).unwrap());

        let scope = interceptor.before(&req).unwrap();
        interceptor.after(scope, &DispatchOutcome::Completed(StatusCode::OK));

        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].rpc.as_deref(), Some("/orders"));
        assert_eq!(spans[0].end_point, None);
        assert_eq!(interceptor.context().registry().count(), 0);
    }

    #[test]
    fn test_real_ip_misconfiguration_rejected() {
        let sink = Arc::new(CollectingSink::new());
        let config = TraceConfig {
            real_ip_header: Some("not a header".to_string()),
            ..TraceConfig::default()
        };
        assert!(DispatchInterceptor::from_config(&config, sink).is_err());
    }
}
