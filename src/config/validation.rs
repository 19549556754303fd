//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Reject a real-ip header name that cannot be a header
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::AgentConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("trace.real_ip_header: invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("{0}: must not be empty and must be a valid header value")]
    InvalidIdentity(&'static str),

    #[error("{0}: must be greater than zero")]
    Zero(&'static str),

    #[error("trace.param_total_limit ({total}) is smaller than trace.param_each_limit ({each})")]
    LimitOrder { each: usize, total: usize },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    let trace = &config.trace;
    if let Some(name) = trace.real_ip_header.as_deref().filter(|n| !n.is_empty()) {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidHeaderName(name.to_string()));
        }
    }
    if !is_header_safe(&trace.application_name) {
        errors.push(ValidationError::InvalidIdentity("trace.application_name"));
    }
    if let Some(agent_id) = &trace.agent_id {
        if !is_header_safe(agent_id) {
            errors.push(ValidationError::InvalidIdentity("trace.agent_id"));
        }
    }
    if trace.param_each_limit == 0 {
        errors.push(ValidationError::Zero("trace.param_each_limit"));
    }
    if trace.param_total_limit == 0 {
        errors.push(ValidationError::Zero("trace.param_total_limit"));
    }
    if trace.param_total_limit < trace.param_each_limit {
        errors.push(ValidationError::LimitOrder {
            each: trace.param_each_limit,
            total: trace.param_total_limit,
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

// propagated downstream in headers, so must be encodable
fn is_header_safe(value: &str) -> bool {
    !value.is_empty() && HeaderValue::from_str(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(validate_config(&AgentConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AgentConfig::default();
        config.listener.bind_address = "nowhere".to_string();
        config.trace.real_ip_header = Some("bad header".to_string());
        config.trace.param_each_limit = 0;
        config.trace.application_name = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidHeaderName("bad header".to_string())));
        assert!(errors.contains(&ValidationError::Zero("trace.param_each_limit")));
    }

    #[test]
    fn test_limit_order() {
        let mut config = AgentConfig::default();
        config.trace.param_each_limit = 100;
        config.trace.param_total_limit = 50;

        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::LimitOrder { each: 100, total: 50 }])
        );
    }
}
