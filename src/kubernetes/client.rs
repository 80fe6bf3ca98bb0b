//! Lightweight pod client for the Kubernetes API server.
//!
//! # Responsibilities
//! - Authenticate every request with the service account token
//! - Trust only the service account CA bundle
//! - Map response status codes onto [`KubeError`]
//! - Keep headers out of every diagnostic
//!
//! There is no retry or backoff here, and no timeout beyond the transport
//! default.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::kubernetes::config::ClusterConnection;
use crate::kubernetes::patch::{label_patch_body, JSON_PATCH_CONTENT_TYPE};
use crate::kubernetes::types::{KubeError, KubeResult, Pod, Tag};
use crate::observability::metrics;

/// Operations this crate needs against a single pod.
#[async_trait]
pub trait PodClient: Send + Sync {
    /// Verify the pod exists. Returns [`KubeError::NotFound`] when it does not.
    async fn pod_exists(&self, namespace: &str, pod_name: &str) -> KubeResult<()>;

    /// Read the pod's metadata.
    async fn get_pod(&self, namespace: &str, pod_name: &str) -> KubeResult<Pod>;

    /// Set the given labels on the pod, overwriting previous values for
    /// those keys and leaving every other label in place.
    async fn update_pod_tags(
        &self,
        namespace: &str,
        pod_name: &str,
        tags: &[Tag],
    ) -> KubeResult<()>;

    async fn update_pod_tag(&self, namespace: &str, pod_name: &str, tag: Tag) -> KubeResult<()> {
        self.update_pod_tags(namespace, pod_name, std::slice::from_ref(&tag))
            .await
    }
}

/// [`PodClient`] backed by HTTP calls to the API server.
#[derive(Clone)]
pub struct HttpPodClient {
    connection: Arc<ClusterConnection>,
    http: reqwest::Client,
}

impl HttpPodClient {
    /// Build a client from the credentials mounted into the current pod.
    pub fn in_cluster() -> KubeResult<Self> {
        Self::new(ClusterConnection::in_cluster()?)
    }

    pub fn new(connection: ClusterConnection) -> KubeResult<Self> {
        // The API server is reached directly, never through an ambient proxy.
        let mut builder = reqwest::Client::builder()
            .no_proxy()
            .tls_built_in_root_certs(false);
        for cert in connection.ca_certificates() {
            builder = builder.add_root_certificate(cert.clone());
        }
        let http = builder.build().map_err(KubeError::Client)?;

        tracing::info!(host = %connection.host(), "Kubernetes client initialized");

        Ok(Self {
            connection: Arc::new(connection),
            http,
        })
    }

    pub fn connection(&self) -> &ClusterConnection {
        &self.connection
    }

    fn pod_url(&self, namespace: &str, pod_name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/pods/{}",
            self.connection.host(),
            namespace,
            pod_name
        )
    }

    /// Send one request and apply the status policy.
    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<(Vec<u8>, &'static str)>,
    ) -> KubeResult<Exchange> {
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.connection.bearer_token())
            .header(ACCEPT, "application/json");
        if let Some((body, content_type)) = body {
            request = request.header(CONTENT_TYPE, content_type).body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(
                    method = %method,
                    url = %url,
                    error = %e,
                    "Kubernetes request failed"
                );
                metrics::record_api_request(method.as_str(), "network");
                return Err(KubeError::Network(e));
            }
        };

        let status = response.status();
        // An unreadable body is reported as empty.
        let body = response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .unwrap_or_default();
        let exchange = Exchange {
            method,
            url,
            status,
            body,
        };

        tracing::debug!(
            method = %exchange.method,
            url = %exchange.url,
            status = exchange.status.as_u16(),
            "Kubernetes request completed"
        );

        match exchange.status.as_u16() {
            200 | 201 | 202 => {
                metrics::record_api_request(exchange.method.as_str(), "success");
                Ok(exchange)
            }
            404 => {
                metrics::record_api_request(exchange.method.as_str(), "not_found");
                Err(KubeError::NotFound)
            }
            _ => {
                metrics::record_api_request(exchange.method.as_str(), "unexpected_status");
                Err(KubeError::UnexpectedStatus(exchange.sanitized()))
            }
        }
    }

    /// Send one request and decode a successful body as `T`.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<(Vec<u8>, &'static str)>,
    ) -> KubeResult<T> {
        let exchange = self.execute(method, url, body).await?;
        serde_json::from_slice(&exchange.body).map_err(|source| KubeError::Decode {
            type_name: std::any::type_name::<T>(),
            diagnostic: exchange.sanitized(),
            source,
        })
    }
}

#[async_trait]
impl PodClient for HttpPodClient {
    async fn pod_exists(&self, namespace: &str, pod_name: &str) -> KubeResult<()> {
        self.execute(Method::GET, self.pod_url(namespace, pod_name), None)
            .await?;
        Ok(())
    }

    async fn get_pod(&self, namespace: &str, pod_name: &str) -> KubeResult<Pod> {
        self.execute_json(Method::GET, self.pod_url(namespace, pod_name), None)
            .await
    }

    async fn update_pod_tags(
        &self,
        namespace: &str,
        pod_name: &str,
        tags: &[Tag],
    ) -> KubeResult<()> {
        let body = label_patch_body(tags)?;
        self.execute(
            Method::PATCH,
            self.pod_url(namespace, pod_name),
            Some((body, JSON_PATCH_CONTENT_TYPE)),
        )
        .await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpPodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPodClient")
            .field("connection", &self.connection)
            .finish()
    }
}

/// A completed request/response pair, kept for diagnostics.
struct Exchange {
    method: Method,
    url: String,
    status: StatusCode,
    body: Vec<u8>,
}

impl Exchange {
    /// Describe the exchange without any headers, so the bearer token
    /// cannot leak into logs or error messages.
    fn sanitized(&self) -> String {
        sanitized_debugging_info(&self.method, &self.url, self.status, &self.body)
    }
}

fn sanitized_debugging_info(
    method: &Method,
    url: &str,
    status: StatusCode,
    body: &[u8],
) -> String {
    format!(
        "method: {}, url: {}, statuscode: {}, body: {}",
        method,
        url,
        status.as_u16(),
        String::from_utf8_lossy(body)
    )
}
