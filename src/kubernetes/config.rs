//! In-cluster connection parameters.
//!
//! # Security
//! - The bearer token is read once and never logged
//! - Only the CA bundle from the service account is trusted
//!
//! The token is not re-read when it rotates; a rotated token requires a new
//! client.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::kubernetes::types::{KubeError, KubeResult};

/// Environment variable holding the API server host.
pub const ENV_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";
/// Environment variable holding the API server port.
pub const ENV_SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

pub const DEFAULT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
pub const DEFAULT_SCHEME: &str = "https://";

/// Where to find in-cluster credentials.
///
/// Production code uses [`InClusterSettings::default`]; test harnesses point
/// the paths at fixtures and the scheme at plain HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClusterSettings {
    pub host_env: String,
    pub port_env: String,
    pub token_file: PathBuf,
    pub ca_file: PathBuf,
    pub scheme: String,
}

impl Default for InClusterSettings {
    fn default() -> Self {
        Self {
            host_env: ENV_SERVICE_HOST.to_string(),
            port_env: ENV_SERVICE_PORT.to_string(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            ca_file: PathBuf::from(DEFAULT_CA_FILE),
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }
}

/// Immutable connection parameters for the API server.
#[derive(Clone)]
pub struct ClusterConnection {
    host: String,
    bearer_token: String,
    bearer_token_file: PathBuf,
    ca_certificates: Vec<reqwest::Certificate>,
}

impl ClusterConnection {
    /// Load the service account credentials Kubernetes mounts into every pod.
    ///
    /// Returns [`KubeError::NotInCluster`] when called from a process that is
    /// not running in a Kubernetes environment.
    pub fn in_cluster() -> KubeResult<Self> {
        Self::load(&InClusterSettings::default())
    }

    pub fn load(settings: &InClusterSettings) -> KubeResult<Self> {
        let host = env_value(&settings.host_env);
        let port = env_value(&settings.port_env);
        let (Some(host), Some(port)) = (host, port) else {
            return Err(KubeError::NotInCluster {
                host_env: settings.host_env.clone(),
                port_env: settings.port_env.clone(),
            });
        };

        let token = fs::read_to_string(&settings.token_file).map_err(|source| {
            KubeError::Credentials {
                path: settings.token_file.clone(),
                source,
            }
        })?;
        let ca_certificates = load_ca_bundle(&settings.ca_file)?;

        let host = format!("{}{}", settings.scheme, join_host_port(&host, &port));
        tracing::debug!(
            host = %host,
            token_file = %settings.token_file.display(),
            ca_file = %settings.ca_file.display(),
            ca_certificates = ca_certificates.len(),
            "Loaded in-cluster configuration"
        );

        Ok(Self {
            host,
            bearer_token: token.trim_end().to_string(),
            bearer_token_file: settings.token_file.clone(),
            ca_certificates,
        })
    }

    /// Base URL of the API server, e.g. `https://10.0.0.1:443`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn bearer_token_file(&self) -> &Path {
        &self.bearer_token_file
    }

    pub fn ca_certificates(&self) -> &[reqwest::Certificate] {
        &self.ca_certificates
    }

    pub(crate) fn bearer_token(&self) -> &str {
        &self.bearer_token
    }
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("host", &self.host)
            .field("bearer_token", &"<redacted>")
            .field("bearer_token_file", &self.bearer_token_file)
            .field("ca_certificates", &self.ca_certificates.len())
            .finish()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Join host and port, bracketing IPv6 literals.
fn join_host_port(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

fn load_ca_bundle(path: &Path) -> KubeResult<Vec<reqwest::Certificate>> {
    let pem = fs::read(path).map_err(|source| KubeError::Credentials {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = BufReader::new(pem.as_slice());
    let mut certificates = Vec::new();
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| KubeError::Certificate {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let cert = reqwest::Certificate::from_der(cert.as_ref()).map_err(|e| {
            KubeError::Certificate {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        certificates.push(cert);
    }

    if certificates.is_empty() {
        return Err(KubeError::Certificate {
            path: path.to_path_buf(),
            reason: "no PEM certificates found".to_string(),
        });
    }
    Ok(certificates)
}
