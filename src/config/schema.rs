//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::kubernetes::InClusterSettings;

/// Root configuration for the registration agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Which pod to label.
    pub registration: RegistrationConfig,

    /// Overrides for in-cluster credential discovery.
    pub cluster: ClusterSettingsConfig,

    /// State published at registration.
    pub state: InitialStateConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Pod identity as configured by the host. Unset or empty values fall back
/// to the defaults at registration time.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Namespace of the pod (default: "default").
    pub namespace: Option<String>,

    /// Name of the pod (default: "vault").
    pub pod_name: Option<String>,
}

/// Optional overrides of where credentials are read from.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ClusterSettingsConfig {
    pub host_env: Option<String>,
    pub port_env: Option<String>,
    pub token_file: Option<PathBuf>,
    pub ca_file: Option<PathBuf>,
    /// URL scheme including the separator, e.g. "https://".
    pub scheme: Option<String>,
}

impl ClusterSettingsConfig {
    /// Apply the overrides on top of the in-cluster defaults.
    pub fn to_settings(&self) -> InClusterSettings {
        let defaults = InClusterSettings::default();
        InClusterSettings {
            host_env: self.host_env.clone().unwrap_or(defaults.host_env),
            port_env: self.port_env.clone().unwrap_or(defaults.port_env),
            token_file: self.token_file.clone().unwrap_or(defaults.token_file),
            ca_file: self.ca_file.clone().unwrap_or(defaults.ca_file),
            scheme: self.scheme.clone().unwrap_or(defaults.scheme),
        }
    }
}

/// Initial host state for the standalone agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct InitialStateConfig {
    pub version: String,
    pub active: bool,
    pub sealed: bool,
    pub performance_standby: bool,
    pub initialized: bool,
}

impl Default for InitialStateConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            active: false,
            sealed: true,
            performance_standby: false,
            initialized: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter, overridden by RUST_LOG.
    pub log_filter: String,

    /// Emit logs as JSON.
    pub json_logs: bool,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "kube_service_registration=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9102".to_string(),
        }
    }
}
