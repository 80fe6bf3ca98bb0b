//! Manual test harness for the lightweight pod client.
//!
//! Meant to be copied into a pod (for example a minikube `shell-demo`) and
//! run there:
//!
//! ```text
//! kubeclient --call get-pod --namespace default --pod-name shell-demo
//! kubeclient --call update-pod-tags --namespace default --pod-name shell-demo \
//!     --tags fizz:buzz,foo:bar
//! ```
//!
//! A 403 usually means the service account lacks `get`/`patch` on pods.

use clap::{Parser, ValueEnum};

use kube_service_registration::kubernetes::{HttpPodClient, PodClient, Tag};
use kube_service_registration::observability::logging;

#[derive(Parser)]
#[command(name = "kubeclient")]
#[command(about = "Exercise the in-cluster pod client", long_about = None)]
struct Cli {
    /// The call to make.
    #[arg(long, value_enum)]
    call: Call,

    /// The namespace to use.
    #[arg(long, default_value = "default")]
    namespace: String,

    /// The pod name to use.
    #[arg(long)]
    pod_name: String,

    /// Tags for update-pod-tags, like "fizz:buzz,foo:bar".
    #[arg(long, default_value = "")]
    tags: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Call {
    GetPod,
    UpdatePodTags,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging("kube_service_registration=debug", false)?;

    let client = HttpPodClient::in_cluster()?;

    match cli.call {
        Call::GetPod => {
            let pod = client.get_pod(&cli.namespace, &cli.pod_name).await?;
            println!("{}", serde_json::to_string_pretty(&pod)?);
        }
        Call::UpdatePodTags => {
            let tags = Tag::parse_list(&cli.tags)?;
            client
                .update_pod_tags(&cli.namespace, &cli.pod_name, &tags)
                .await?;
            println!("Updated {} tag(s) on {}/{}", tags.len(), cli.namespace, cli.pod_name);
        }
    }

    Ok(())
}
