//! Host state and the labels it is published under.
//!
//! # Labels
//! - `vault-version`: raw version string
//! - `vault-ha-active`, `vault-ha-sealed`, `vault-ha-perf-standby`,
//!   `vault-ha-initialized`: `"true"` or `"false"`

use crate::config::InitialStateConfig;
use crate::kubernetes::Tag;

pub const LABEL_VERSION: &str = "vault-version";
pub const LABEL_ACTIVE: &str = "vault-ha-active";
pub const LABEL_SEALED: &str = "vault-ha-sealed";
pub const LABEL_PERF_STANDBY: &str = "vault-ha-perf-standby";
pub const LABEL_INITIALIZED: &str = "vault-ha-initialized";

/// State reported by the host when it registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostState {
    pub version: String,
    pub is_active: bool,
    pub is_sealed: bool,
    pub is_performance_standby: bool,
    pub is_initialized: bool,
}

impl HostState {
    /// The full label set applied at registration.
    pub fn initial_tags(&self) -> Vec<Tag> {
        vec![
            Tag::new(LABEL_VERSION, self.version.as_str()),
            bool_tag(LABEL_ACTIVE, self.is_active),
            bool_tag(LABEL_SEALED, self.is_sealed),
            bool_tag(LABEL_PERF_STANDBY, self.is_performance_standby),
            bool_tag(LABEL_INITIALIZED, self.is_initialized),
        ]
    }
}

impl From<&InitialStateConfig> for HostState {
    fn from(config: &InitialStateConfig) -> Self {
        Self {
            version: config.version.clone(),
            is_active: config.active,
            is_sealed: config.sealed,
            is_performance_standby: config.performance_standby,
            is_initialized: config.initialized,
        }
    }
}

/// Labels left behind once the host has shut down.
pub fn final_tags() -> Vec<Tag> {
    vec![
        bool_tag(LABEL_ACTIVE, false),
        bool_tag(LABEL_SEALED, true),
        bool_tag(LABEL_PERF_STANDBY, false),
        bool_tag(LABEL_INITIALIZED, false),
    ]
}

pub(crate) fn bool_tag(key: &str, value: bool) -> Tag {
    Tag::new(key, value.to_string())
}
