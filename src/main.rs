//! Kubernetes registration agent.
//!
//! Registers the current pod with the configured state, keeps running until
//! SIGTERM/SIGINT, then leaves the final labels behind.
//!
//! ```text
//! config (TOML) → logging/metrics → in-cluster credentials
//!     → ServiceRegistration::register
//!     → wait_for_termination → Shutdown::trigger → final labels → exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use kube_service_registration::config::{load_config, AgentConfig};
use kube_service_registration::kubernetes::{ClusterConnection, HttpPodClient};
use kube_service_registration::lifecycle::{signals, Shutdown};
use kube_service_registration::observability::{logging, metrics};
use kube_service_registration::registration::{HostState, ServiceRegistration};

#[derive(Parser)]
#[command(name = "kube-registration")]
#[command(about = "Publish service state as labels on the current pod", long_about = None)]
struct Cli {
    /// Path to the agent configuration (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace of the pod, overriding the configuration.
    #[arg(long)]
    namespace: Option<String>,

    /// Name of the pod, overriding the configuration.
    #[arg(long)]
    pod_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };
    if cli.namespace.is_some() {
        config.registration.namespace = cli.namespace;
    }
    if cli.pod_name.is_some() {
        config.registration.pod_name = cli.pod_name;
    }

    logging::init_logging(
        &config.observability.log_filter,
        config.observability.json_logs,
    )?;

    tracing::info!("kube-registration v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let connection = ClusterConnection::load(&config.cluster.to_settings())?;
    let client = Arc::new(HttpPodClient::new(connection)?);

    let shutdown = Shutdown::new();
    let host_state = HostState::from(&config.state);
    let registration = match ServiceRegistration::register(
        client,
        &config.registration,
        &host_state,
        shutdown.subscribe(),
    )
    .await
    {
        Ok(registration) => registration,
        Err(e) => {
            tracing::error!(error = %e, "Registration failed");
            return Err(e.into());
        }
    };

    signals::wait_for_termination().await?;

    shutdown.trigger();
    registration.terminated().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
