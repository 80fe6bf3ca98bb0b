//! Minimal in-cluster Kubernetes client.
//!
//! # Data Flow
//! ```text
//! Service account mount + environment
//!     → config.rs (host, bearer token, CA bundle)
//!     → client.rs (authenticated request, status policy)
//!     → patch.rs (JSON Patch body for label updates)
//! ```
//!
//! Only two endpoints are modeled:
//! `GET` and `PATCH` on `/api/v1/namespaces/{namespace}/pods/{pod}`.
//!
//! # Security Constraints
//! - The bearer token is never logged or put into an error message
//! - System trust roots are disabled; only the mounted CA is trusted

pub mod client;
pub mod config;
pub mod fake;
pub mod patch;
pub mod types;

pub use client::{HttpPodClient, PodClient};
pub use config::{ClusterConnection, InClusterSettings};
pub use fake::InMemoryPodClient;
pub use types::{ErrorKind, KubeError, KubeResult, Pod, PodIdentity, Tag};
