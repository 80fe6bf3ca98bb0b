//! OS signal handling.
//!
//! SIGTERM (sent by the kubelet on pod deletion) and SIGINT both end the
//! agent. On non-unix targets only ctrl-c is observed.

/// Resolve once the process has been asked to terminate.
pub async fn wait_for_termination() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("Received SIGINT");
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received ctrl-c");
        Ok(())
    }
}
