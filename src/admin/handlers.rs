use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::trace::ActiveTraceInfo;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub agent_id: String,
    pub application_name: String,
    pub tracing_enabled: bool,
    pub active_traces: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let interceptor = state.interceptor.load();
    let context = interceptor.context();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        agent_id: context.agent_id().to_string(),
        application_name: context.application_name().to_string(),
        tracing_enabled: interceptor.is_enabled(),
        active_traces: context.registry().count(),
    })
}

/// Sampled traces currently open, oldest first.
pub async fn get_traces(State(state): State<AppState>) -> Json<Vec<ActiveTraceInfo>> {
    let interceptor = state.interceptor.load();
    let mut traces = interceptor.context().registry().snapshot();
    traces.sort_by_key(|t| t.start_time);
    Json(traces)
}
