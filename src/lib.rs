//! Kubernetes service registration.
//!
//! Publishes a clustered service's role and health (active, sealed,
//! performance standby, initialized, version) as labels on its own pod.

pub mod config;
pub mod kubernetes;
pub mod lifecycle;
pub mod observability;
pub mod registration;

pub use config::AgentConfig;
pub use kubernetes::{HttpPodClient, KubeError, PodClient};
pub use lifecycle::Shutdown;
pub use registration::{HostState, ServiceRegistration};
