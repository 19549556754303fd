//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::interceptor::dispatch::DEFAULT_HANDLER_API_NAME;
use crate::interceptor::params::{DEFAULT_EACH_LIMIT, DEFAULT_TOTAL_LIMIT};

/// Root configuration for the tracing agent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dispatch tracing settings.
    pub trace: TraceConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Dispatch tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Trace inbound requests at all.
    pub enabled: bool,

    /// Application name reported on spans and to downstream callees.
    pub application_name: String,

    /// Agent id used in new transaction ids. Random when unset.
    pub agent_id: Option<String>,

    /// Comma-separated paths never traced ("/health, /static/**").
    pub exclude_url: String,

    /// Header carrying the proxy-forwarded client address.
    /// Unset means the `Host` header is recorded as the remote address.
    pub real_ip_header: Option<String>,

    /// Value of the real-ip header meaning "no address" (e.g. "unknown").
    pub real_ip_empty_value: Option<String>,

    /// Sample one in N new traces (0 = none, 1 = all).
    pub sampling_rate: u32,

    /// API name recorded for the dispatched handler.
    pub handler_api: String,

    /// Per name/value character budget for captured query parameters.
    pub param_each_limit: usize,

    /// Total character budget for captured query parameters.
    pub param_total_limit: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            application_name: "dispatch-trace".to_string(),
            agent_id: None,
            exclude_url: String::new(),
            real_ip_header: None,
            real_ip_empty_value: None,
            sampling_rate: 1,
            handler_api: DEFAULT_HANDLER_API_NAME.to_string(),
            param_each_limit: DEFAULT_EACH_LIMIT,
            param_total_limit: DEFAULT_TOTAL_LIMIT,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert!(config.trace.enabled);
        assert!(config.trace.exclude_url.is_empty());
        assert!(config.trace.real_ip_header.is_none());
        assert_eq!(config.trace.param_each_limit, 64);
        assert_eq!(config.trace.param_total_limit, 512);
    }

    #[test]
    fn test_partial_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            [trace]
            exclude_url = "/health"
            real_ip_header = "X-Forwarded-For"
            real_ip_empty_value = "unknown"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.trace.exclude_url, "/health");
        assert_eq!(config.trace.real_ip_header.as_deref(), Some("X-Forwarded-For"));
        assert_eq!(config.trace.sampling_rate, 1);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
