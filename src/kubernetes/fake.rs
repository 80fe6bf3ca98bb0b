//! In-memory [`PodClient`] for tests and local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::kubernetes::client::PodClient;
use crate::kubernetes::types::{KubeError, KubeResult, Pod, PodIdentity, PodMetadata, Tag};

/// One patch call as received by [`InMemoryPodClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPatch {
    pub pod: PodIdentity,
    pub tags: Vec<Tag>,
}

/// Holds pods and their labels in memory and records every patch call,
/// including ones that failed.
#[derive(Debug, Default)]
pub struct InMemoryPodClient {
    pods: DashMap<PodIdentity, BTreeMap<String, String>>,
    patches: Mutex<Vec<RecordedPatch>>,
    reject_patches: AtomicBool,
}

impl InMemoryPodClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pod(self, namespace: &str, pod_name: &str) -> Self {
        self.insert_pod(namespace, pod_name);
        self
    }

    pub fn insert_pod(&self, namespace: &str, pod_name: &str) {
        self.pods
            .entry(PodIdentity::new(namespace, pod_name))
            .or_default();
    }

    /// Make every following patch fail with an unexpected status.
    pub fn reject_patches(&self, reject: bool) {
        self.reject_patches.store(reject, Ordering::SeqCst);
    }

    pub fn labels(&self, namespace: &str, pod_name: &str) -> Option<BTreeMap<String, String>> {
        self.pods
            .get(&PodIdentity::new(namespace, pod_name))
            .map(|r| r.value().clone())
    }

    pub fn patches(&self) -> Vec<RecordedPatch> {
        self.recorded().clone()
    }

    pub fn patch_count(&self) -> usize {
        self.recorded().len()
    }

    // A panic while holding the lock cannot leave the list half-written.
    fn recorded(&self) -> MutexGuard<'_, Vec<RecordedPatch>> {
        self.patches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PodClient for InMemoryPodClient {
    async fn pod_exists(&self, namespace: &str, pod_name: &str) -> KubeResult<()> {
        if self.pods.contains_key(&PodIdentity::new(namespace, pod_name)) {
            Ok(())
        } else {
            Err(KubeError::NotFound)
        }
    }

    async fn get_pod(&self, namespace: &str, pod_name: &str) -> KubeResult<Pod> {
        let labels = self.labels(namespace, pod_name).ok_or(KubeError::NotFound)?;
        Ok(Pod {
            metadata: PodMetadata {
                name: pod_name.to_string(),
                namespace: namespace.to_string(),
                labels,
            },
        })
    }

    async fn update_pod_tags(
        &self,
        namespace: &str,
        pod_name: &str,
        tags: &[Tag],
    ) -> KubeResult<()> {
        let pod = PodIdentity::new(namespace, pod_name);
        self.recorded().push(RecordedPatch {
            pod: pod.clone(),
            tags: tags.to_vec(),
        });

        if self.reject_patches.load(Ordering::SeqCst) {
            return Err(KubeError::UnexpectedStatus(format!(
                "method: PATCH, url: memory://{}, statuscode: 500, body: rejected",
                pod
            )));
        }

        let mut labels = self.pods.get_mut(&pod).ok_or(KubeError::NotFound)?;
        for tag in tags {
            labels.insert(tag.key.clone(), tag.value.clone());
        }
        Ok(())
    }
}
