//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dispatch_trace::config::AgentConfig;
use dispatch_trace::http::{AppState, HttpServer};
use dispatch_trace::lifecycle::Shutdown;
use dispatch_trace::trace::{CollectingSink, Span};

/// A running server plus the handles a test needs to drive it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub sink: Arc<CollectingSink>,
    pub state: AppState,
    pub config_updates: mpsc::UnboundedSender<AgentConfig>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build a server whose spans land in an in-memory sink.
pub fn traced_server(config: AgentConfig) -> (HttpServer, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let server = HttpServer::with_sink(config, sink.clone()).unwrap();
    (server, sink)
}

/// Start a server on an ephemeral port.
pub async fn start_server(config: AgentConfig) -> TestServer {
    let (server, sink) = traced_server(config);
    let state = server.state().clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (config_updates, config_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, config_rx, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        sink,
        state,
        config_updates,
        shutdown,
    }
}

/// Poll the sink until it holds `count` spans or a second passes.
pub async fn wait_for_spans(sink: &CollectingSink, count: usize) -> Vec<Span> {
    for _ in 0..100 {
        if sink.len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    sink.spans()
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
