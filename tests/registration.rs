//! Service registration end to end against a mock API server.

use std::sync::Arc;

use serde_json::{json, Value};

use kube_service_registration::config::RegistrationConfig;
use kube_service_registration::kubernetes::ErrorKind;
use kube_service_registration::lifecycle::Shutdown;
use kube_service_registration::registration::{HostState, RegistrationState, ServiceRegistration};

mod common;

use common::{MockApiServer, TEST_NAMESPACE, TEST_POD};

fn shell_demo() -> RegistrationConfig {
    RegistrationConfig {
        namespace: Some(TEST_NAMESPACE.to_string()),
        pod_name: Some(TEST_POD.to_string()),
    }
}

fn host_state() -> HostState {
    HostState {
        version: "1.4.0".to_string(),
        is_active: true,
        is_sealed: false,
        is_performance_standby: true,
        is_initialized: true,
    }
}

fn add(key: &str, value: &str) -> Value {
    json!({ "op": "add", "path": format!("/metadata/labels/{}", key), "value": value })
}

async fn register(
    server: &MockApiServer,
    env_prefix: &str,
    shutdown: &Shutdown,
) -> ServiceRegistration {
    let client = Arc::new(server.client(env_prefix));
    ServiceRegistration::register(client, &shell_demo(), &host_state(), shutdown.subscribe())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_labels_pod() {
    let server = MockApiServer::start().await;
    let shutdown = Shutdown::new();
    let registration = register(&server, "KSR_REG_INITIAL", &shutdown).await;

    assert_eq!(registration.state(), RegistrationState::Registered);
    assert_eq!(registration.pod().to_string(), "default/shell-demo");

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[1].method, "PATCH");
    assert_eq!(
        requests[1].patch_ops(),
        vec![
            add("vault-version", "1.4.0"),
            add("vault-ha-active", "true"),
            add("vault-ha-sealed", "false"),
            add("vault-ha-perf-standby", "true"),
            add("vault-ha-initialized", "true"),
        ]
    );
}

#[tokio::test]
async fn test_register_missing_pod() {
    let server = MockApiServer::start().await;
    let shutdown = Shutdown::new();
    let client = Arc::new(server.client("KSR_REG_MISSING"));
    let config = RegistrationConfig {
        namespace: None,
        pod_name: Some("no-exist".to_string()),
    };

    let err = ServiceRegistration::register(client, &config, &host_state(), shutdown.subscribe())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(server.patches().is_empty());
    assert_eq!(server.requests()[0].path, "/api/v1/namespaces/default/pods/no-exist");
}

#[tokio::test]
async fn test_shutdown_applies_final_labels_once() {
    let server = MockApiServer::start().await;
    let shutdown = Shutdown::new();
    let registration = register(&server, "KSR_REG_SHUTDOWN", &shutdown).await;

    shutdown.trigger();
    shutdown.trigger();
    registration.terminated().await;

    let patches = server.patches();
    assert_eq!(patches.len(), 2);
    assert_eq!(
        patches[1].patch_ops(),
        vec![
            add("vault-ha-active", "false"),
            add("vault-ha-sealed", "true"),
            add("vault-ha-perf-standby", "false"),
            add("vault-ha-initialized", "false"),
        ]
    );
    assert_eq!(registration.state(), RegistrationState::Terminated);
}

#[tokio::test]
async fn test_concurrent_notifications() {
    let server = MockApiServer::start().await;
    let shutdown = Shutdown::new();
    let registration = Arc::new(register(&server, "KSR_REG_CONCURRENT", &shutdown).await);

    let active = {
        let registration = Arc::clone(&registration);
        tokio::spawn(async move { registration.notify_active_state_change(false).await })
    };
    let sealed = {
        let registration = Arc::clone(&registration);
        tokio::spawn(async move { registration.notify_sealed_state_change(true).await })
    };
    active.await.unwrap().unwrap();
    sealed.await.unwrap().unwrap();

    let bodies: Vec<Vec<Value>> = server
        .patches()
        .iter()
        .skip(1)
        .map(|r| r.patch_ops())
        .collect();
    assert_eq!(bodies.len(), 2);
    let active_patches = bodies
        .iter()
        .filter(|ops| **ops == vec![add("vault-ha-active", "false")])
        .count();
    let sealed_patches = bodies
        .iter()
        .filter(|ops| **ops == vec![add("vault-ha-sealed", "true")])
        .count();
    assert_eq!(active_patches, 1);
    assert_eq!(sealed_patches, 1);
}

#[tokio::test]
async fn test_notification_touches_one_label() {
    let server = MockApiServer::start().await;
    let shutdown = Shutdown::new();
    let registration = register(&server, "KSR_REG_SINGLE_LABEL", &shutdown).await;

    registration.notify_initialized_state_change(false).await.unwrap();
    let last = server.patches().pop().unwrap();
    assert_eq!(last.patch_ops(), vec![add("vault-ha-initialized", "false")]);
}
