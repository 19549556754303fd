//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatcher handlers
//! - Wire up middleware (dispatch tracing, timeout, HTTP trace logging)
//! - Bind server and admin API to their listeners
//! - Apply reloaded configuration to the dispatch interceptor
//! - Graceful shutdown on the broadcast signal

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::Path,
    http::{header::HOST, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::config::AgentConfig;
use crate::interceptor::{
    CurrentTrace, DispatchInterceptor, InterceptorHandle, TraceDispatchLayer, TraceError,
};
use crate::trace::{LoggingSink, SpanSink};

/// State shared by the admin API and the reload task.
#[derive(Clone)]
pub struct AppState {
    pub interceptor: InterceptorHandle,
    pub config: Arc<ArcSwap<AgentConfig>>,
}

impl AppState {
    /// Swap in a reloaded configuration.
    ///
    /// Requests already in flight keep the interceptor they started with.
    /// Listener and timeout changes need a restart.
    pub fn apply_config(&self, config: AgentConfig) {
        let current = self.interceptor.load();
        match current.reconfigure(&config.trace) {
            Ok(next) => {
                self.interceptor.store(Arc::new(next));
                tracing::info!(
                    enabled = config.trace.enabled,
                    sampling_rate = config.trace.sampling_rate,
                    exclude_url = %config.trace.exclude_url,
                    "Configuration reloaded"
                );
                self.config.store(Arc::new(config));
            }
            Err(e) => {
                tracing::error!(error = %e, "Rejected reloaded configuration. Keeping current configuration.");
            }
        }
    }
}

/// HTTP server hosting the traced dispatcher.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server that logs completed spans.
    pub fn new(config: AgentConfig) -> Result<Self, TraceError> {
        Self::with_sink(config, Arc::new(LoggingSink))
    }

    /// Create a new HTTP server reporting spans to `sink`.
    pub fn with_sink(config: AgentConfig, sink: Arc<dyn SpanSink>) -> Result<Self, TraceError> {
        let interceptor = DispatchInterceptor::from_config(&config.trace, sink)?;
        let layer = TraceDispatchLayer::new(interceptor);

        let state = AppState {
            interceptor: layer.handle(),
            config: Arc::new(ArcSwap::from_pointee(config.clone())),
        };

        let router = Self::build_router(&config, layer);
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AgentConfig, trace_layer: TraceDispatchLayer) -> Router {
        Router::new()
            .route("/status/{code}", any(status_handler))
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(trace_layer)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AgentConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let admin = self.state.config.load().admin.clone();
        if admin.enabled {
            let admin_listener = TcpListener::bind(&admin.bind_address).await?;
            let admin_router = setup_admin_router(self.state.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %admin.bind_address, "Admin API starting");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin API failed");
                }
            });
        }

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.apply_config(config);
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// What the dispatcher echoes back for a request.
#[derive(Debug, Serialize)]
pub struct DispatchEcho {
    pub method: String,
    pub path: String,
    pub traced: bool,
    pub sampled: bool,
    pub transaction_id: Option<String>,
    pub span_id: Option<i64>,
    /// Headers a downstream call made from this request would carry.
    pub downstream_headers: BTreeMap<String, String>,
}

async fn dispatch_handler(request: Request<Body>) -> Json<DispatchEcho> {
    let current = request.extensions().get::<CurrentTrace>();

    let mut downstream = HeaderMap::new();
    if let Some(current) = current {
        let host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        if let Err(e) = current.inject(&mut downstream, host) {
            tracing::warn!(error = %e, "Failed to build downstream trace headers");
        }
    }

    let trace_id = current.and_then(CurrentTrace::trace_id);
    Json(DispatchEcho {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        traced: current.is_some(),
        sampled: current.is_some_and(CurrentTrace::is_sampled),
        transaction_id: trace_id.map(|id| id.transaction_id.clone()),
        span_id: trace_id.map(|id| id.span_id),
        downstream_headers: downstream
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
    })
}

/// Respond with an arbitrary status code.
async fn status_handler(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => status.into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}
