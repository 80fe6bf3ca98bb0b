//! Keeps the pod's labels in line with the host's reported state.
//!
//! # States
//! ```text
//! Uninitialized → Registered → ShuttingDown → Terminated
//! ```
//!
//! Registration fails unless the pod exists and the initial labels were
//! applied. Per-field notifications return their error to the caller. The
//! final labeling on shutdown is logged and otherwise dropped, since nothing
//! is left to act on it.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;

use crate::config::RegistrationConfig;
use crate::kubernetes::{KubeResult, PodClient, PodIdentity};
use crate::observability::metrics;
use crate::registration::state::{
    bool_tag, final_tags, HostState, LABEL_ACTIVE, LABEL_INITIALIZED, LABEL_PERF_STANDBY,
    LABEL_SEALED,
};

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POD_NAME: &str = "vault";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Uninitialized,
    Registered,
    ShuttingDown,
    Terminated,
}

/// Resolve the configured pod, treating empty values as unset.
pub fn resolve_identity(config: &RegistrationConfig) -> PodIdentity {
    fn or_default(value: &Option<String>, default: &str) -> String {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    PodIdentity::new(
        or_default(&config.namespace, DEFAULT_NAMESPACE),
        or_default(&config.pod_name, DEFAULT_POD_NAME),
    )
}

/// Publishes host state as labels on a single pod.
pub struct ServiceRegistration {
    pod: PodIdentity,
    client: Arc<dyn PodClient>,
    state: Arc<watch::Sender<RegistrationState>>,
}

impl ServiceRegistration {
    /// Verify the pod, apply the initial labels and start the shutdown
    /// listener.
    ///
    /// When `shutdown` fires (or its sender is dropped) the listener applies
    /// the final labels once and exits.
    pub async fn register(
        client: Arc<dyn PodClient>,
        config: &RegistrationConfig,
        host_state: &HostState,
        shutdown: broadcast::Receiver<()>,
    ) -> KubeResult<Self> {
        let pod = resolve_identity(config);
        let (state, _) = watch::channel(RegistrationState::Uninitialized);

        client.pod_exists(&pod.namespace, &pod.pod_name).await?;
        client
            .update_pod_tags(&pod.namespace, &pod.pod_name, &host_state.initial_tags())
            .await?;

        state.send_replace(RegistrationState::Registered);
        tracing::info!(
            namespace = %pod.namespace,
            pod = %pod.pod_name,
            version = %host_state.version,
            active = host_state.is_active,
            sealed = host_state.is_sealed,
            "Pod registered"
        );

        let state = Arc::new(state);
        tokio::spawn(on_shutdown(
            Arc::clone(&client),
            pod.clone(),
            Arc::clone(&state),
            shutdown,
        ));

        Ok(Self { pod, client, state })
    }

    pub fn pod(&self) -> &PodIdentity {
        &self.pod
    }

    pub fn state(&self) -> RegistrationState {
        *self.state.borrow()
    }

    /// Wait until the final labels have been applied (or given up on).
    pub async fn terminated(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx
            .wait_for(|state| *state == RegistrationState::Terminated)
            .await;
    }

    pub async fn notify_active_state_change(&self, is_active: bool) -> KubeResult<()> {
        self.notify(LABEL_ACTIVE, is_active).await
    }

    pub async fn notify_sealed_state_change(&self, is_sealed: bool) -> KubeResult<()> {
        self.notify(LABEL_SEALED, is_sealed).await
    }

    pub async fn notify_performance_standby_state_change(
        &self,
        is_standby: bool,
    ) -> KubeResult<()> {
        self.notify(LABEL_PERF_STANDBY, is_standby).await
    }

    pub async fn notify_initialized_state_change(&self, is_initialized: bool) -> KubeResult<()> {
        self.notify(LABEL_INITIALIZED, is_initialized).await
    }

    async fn notify(&self, label: &'static str, value: bool) -> KubeResult<()> {
        let result = self
            .client
            .update_pod_tag(&self.pod.namespace, &self.pod.pod_name, bool_tag(label, value))
            .await;

        match &result {
            Ok(()) => {
                tracing::debug!(pod = %self.pod, label, value, "Published state change");
                metrics::record_notification(label, "success");
            }
            Err(e) => {
                tracing::debug!(
                    pod = %self.pod,
                    label,
                    value,
                    error = %e,
                    "State change not published"
                );
                metrics::record_notification(label, e.kind().as_str());
            }
        }
        result
    }
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("pod", &self.pod)
            .field("state", &self.state())
            .finish()
    }
}

async fn on_shutdown(
    client: Arc<dyn PodClient>,
    pod: PodIdentity,
    state: Arc<watch::Sender<RegistrationState>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    match shutdown.recv().await {
        Ok(()) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => tracing::debug!("Shutdown sender dropped"),
    }
    state.send_replace(RegistrationState::ShuttingDown);

    match client
        .update_pod_tags(&pod.namespace, &pod.pod_name, &final_tags())
        .await
    {
        Ok(()) => tracing::info!(
            namespace = %pod.namespace,
            pod = %pod.pod_name,
            "Final pod labels applied"
        ),
        Err(e) => tracing::warn!(
            namespace = %pod.namespace,
            pod = %pod.pod_name,
            error = %e,
            "Unable to set final status on pod on shutdown"
        ),
    }

    state.send_replace(RegistrationState::Terminated);
}
