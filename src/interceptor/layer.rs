//! Tower integration for the dispatch interceptor.
//!
//! `TraceDispatchLayer` wraps any service over `http::Request`. The
//! interceptor sits behind an `ArcSwap` so a configuration reload takes
//! effect for new requests while in-flight requests finish with the
//! interceptor they started with.

use std::fmt::Display;
use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::interceptor::dispatch::{DispatchInterceptor, DispatchOutcome};

/// Shared, swappable interceptor.
pub type InterceptorHandle = Arc<ArcSwap<DispatchInterceptor>>;

/// Layer that traces every request passing through it.
#[derive(Clone)]
pub struct TraceDispatchLayer {
    interceptor: InterceptorHandle,
}

impl TraceDispatchLayer {
    pub fn new(interceptor: DispatchInterceptor) -> Self {
        Self {
            interceptor: Arc::new(ArcSwap::from_pointee(interceptor)),
        }
    }

    /// Share an existing handle, e.g. one updated by a config watcher.
    pub fn from_handle(interceptor: InterceptorHandle) -> Self {
        Self { interceptor }
    }

    pub fn handle(&self) -> InterceptorHandle {
        self.interceptor.clone()
    }
}

impl<S> Layer<S> for TraceDispatchLayer {
    type Service = TraceDispatch<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceDispatch {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`TraceDispatchLayer`].
#[derive(Clone)]
pub struct TraceDispatch<S> {
    inner: S,
    interceptor: InterceptorHandle,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for TraceDispatch<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        // the clone is not ready; keep the one poll_ready was called on
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let interceptor = self.interceptor.load_full();

        let scope = interceptor.before(&request);
        if let Some(scope) = &scope {
            request.extensions_mut().insert(interceptor.current_trace(scope));
        }

        Box::pin(async move {
            // dropping this future before completion drops `scope`, which
            // closes its trace
            let result = inner.call(request).await;

            if let Some(scope) = scope {
                let outcome = match &result {
                    Ok(response) => DispatchOutcome::Completed(response.status()),
                    Err(e) => DispatchOutcome::Failed(e.to_string()),
                };
                interceptor.after(scope, &outcome);
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceConfig;
    use crate::interceptor::current::CurrentTrace;
    use crate::trace::{CollectingSink, TraceContext, TrueSampler};
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    fn layer() -> (TraceDispatchLayer, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        let context = Arc::new(TraceContext::new("agent-1", "app", Box::new(TrueSampler), sink.clone()));
        let interceptor = DispatchInterceptor::new(context, &TraceConfig::default()).unwrap();
        (TraceDispatchLayer::new(interceptor), sink)
    }

    #[tokio::test]
    async fn test_handler_error_is_recorded_and_returned() {
        let (layer, sink) = layer();
        let service = layer.layer(service_fn(|_req: Request<()>| async {
            Err::<Response<()>, _>("handler exploded".to_string())
        }));

        let request = Request::builder().uri("/fail").body(()).unwrap();
        let err = service.oneshot(request).await.unwrap_err();

        assert_eq!(err, "handler exploded");
        let spans = sink.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_events[0].exception.as_deref(), Some("handler exploded"));
    }

    #[tokio::test]
    async fn test_current_trace_is_attached() {
        let (layer, _sink) = layer();
        let service = layer.layer(service_fn(|req: Request<()>| async move {
            let sampled = req
                .extensions()
                .get::<CurrentTrace>()
                .map(|c| c.is_sampled())
                .unwrap_or(false);
            Ok::<_, Infallible>(Response::new(sampled))
        }));

        let request = Request::builder().uri("/ok").body(()).unwrap();
        let response = service.oneshot(request).await.unwrap();
        assert!(*response.body());
    }

    #[tokio::test]
    async fn test_cancelled_request_closes_trace() {
        let (layer, sink) = layer();
        let mut service = layer.layer(service_fn(|_req: Request<()>| async {
            futures_util::future::pending::<Result<Response<()>, Infallible>>().await
        }));

        let request = Request::builder().uri("/slow").body(()).unwrap();
        let future = service.ready().await.unwrap().call(request);
        let registry = layer.handle().load().context().registry().clone();
        assert_eq!(registry.count(), 1);

        drop(future);
        assert_eq!(registry.count(), 0);
        assert_eq!(sink.len(), 1);
    }
}
