//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that would otherwise
//! fail later at request time. All errors are returned, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AgentConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported scheme {0:?}, expected \"https://\" or \"http://\"")]
    Scheme(String),

    #[error("{field} must not contain '/': {value:?}")]
    PathSegment { field: &'static str, value: String },

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(scheme) = &config.cluster.scheme {
        if scheme != "https://" && scheme != "http://" {
            errors.push(ValidationError::Scheme(scheme.clone()));
        }
    }

    // Both values end up as URL path segments.
    let segments = [
        ("namespace", &config.registration.namespace),
        ("pod_name", &config.registration.pod_name),
    ];
    for (field, value) in segments {
        if let Some(value) = value {
            if value.contains('/') {
                errors.push(ValidationError::PathSegment {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
