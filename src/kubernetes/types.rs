//! Pod types and error definitions for the Kubernetes client.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single label to write onto a pod.
///
/// Keys are passed through as-is. They are not checked against the label key
/// syntax, nor escaped for JSON Pointer (`/` and `~` are embedded verbatim
/// into the patch path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse a comma separated list like `fizz:buzz,foo:bar`.
    pub fn parse_list(input: &str) -> Result<Vec<Tag>, TagParseError> {
        input.split(',').map(str::parse).collect()
    }
}

impl FromStr for Tag {
    type Err = TagParseError;

    fn from_str(pair: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = pair.split(':').collect();
        match fields.as_slice() {
            [key, value] if !key.is_empty() => Ok(Tag::new(*key, *value)),
            _ => Err(TagParseError(pair.to_string())),
        }
    }
}

/// A tag pair that was not of the form `key:value`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unable to split {0:?} into key:value")]
pub struct TagParseError(pub String);

/// The single pod a registration manages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodIdentity {
    pub namespace: String,
    pub pod_name: String,
}

impl PodIdentity {
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
        }
    }
}

impl std::fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.pod_name)
    }
}

/// The subset of a pod object this crate reads back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pod {
    #[serde(default)]
    pub metadata: PodMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Closed set of failure classes, for branching without matching on
/// variant payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotInCluster,
    Credentials,
    Certificate,
    NotFound,
    UnexpectedStatus,
    Decode,
    Encode,
    Network,
    Client,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotInCluster => "not_in_cluster",
            ErrorKind::Credentials => "credentials",
            ErrorKind::Certificate => "certificate",
            ErrorKind::NotFound => "not_found",
            ErrorKind::UnexpectedStatus => "unexpected_status",
            ErrorKind::Decode => "decode",
            ErrorKind::Encode => "encode",
            ErrorKind::Network => "network",
            ErrorKind::Client => "client",
        }
    }
}

/// Errors returned by the in-cluster client.
///
/// Diagnostics carried by `UnexpectedStatus` and `Decode` contain the
/// method, URL, status code and response body only. Request and response
/// headers are never included.
#[derive(Debug, Error)]
pub enum KubeError {
    /// The process is not running inside a Kubernetes pod.
    #[error("unable to load in-cluster configuration, {host_env} and {port_env} must be defined")]
    NotInCluster { host_env: String, port_env: String },

    /// The service account token or CA bundle could not be read.
    #[error("unable to read {}: {source}", path.display())]
    Credentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CA bundle could not be parsed.
    #[error("invalid CA bundle {}: {reason}", path.display())]
    Certificate { path: PathBuf, reason: String },

    /// The API server answered 404.
    #[error("not found")]
    NotFound,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(String),

    #[error("unable to read as {type_name}: {diagnostic}")]
    Decode {
        type_name: &'static str,
        diagnostic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Transport level failure (connection refused, TLS handshake, ...).
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unable to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl KubeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KubeError::NotInCluster { .. } => ErrorKind::NotInCluster,
            KubeError::Credentials { .. } => ErrorKind::Credentials,
            KubeError::Certificate { .. } => ErrorKind::Certificate,
            KubeError::NotFound => ErrorKind::NotFound,
            KubeError::UnexpectedStatus(_) => ErrorKind::UnexpectedStatus,
            KubeError::Decode { .. } => ErrorKind::Decode,
            KubeError::Encode(_) => ErrorKind::Encode,
            KubeError::Network(_) => ErrorKind::Network,
            KubeError::Client(_) => ErrorKind::Client,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result type for Kubernetes client operations.
pub type KubeResult<T> = Result<T, KubeError>;
