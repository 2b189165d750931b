use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Wait for Ctrl+C or SIGTERM.
pub async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(%e, "Failed to listen for Ctrl+C");
                return Err(e.into());
            }
            tracing::info!("Received Ctrl+C signal");
        }
        result = terminate => {
            if let Err(e) = result {
                tracing::error!(%e, "Failed to install SIGTERM handler");
                return Err(e.into());
            }
            tracing::info!("Received SIGTERM signal");
        }
    }

    tracing::info!("Shutdown signal received, initiating graceful shutdown");
    Ok(())
}

/// Cancel `token` once a shutdown signal arrives.
pub fn cancel_on_shutdown(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            tracing::warn!(error = %e, "Signal handling failed; cancelling anyway");
        }
        token.cancel();
    })
}
