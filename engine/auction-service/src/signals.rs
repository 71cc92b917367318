//! Signal handling for graceful shutdown

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::service::ServiceState;

/// Setup signal handlers for graceful shutdown
///
/// Returns a receiver that yields once when SIGINT or SIGTERM arrives.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<()>> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    // Handle Ctrl+C (SIGINT)
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C signal: {}", e);
                return;
            }
            info!("Ctrl+C signal received");
            let _ = shutdown_tx.send(()).await;
        });
    }

    // Handle SIGTERM (Unix only)
    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use signal_hook::consts::SIGTERM;
            use std::sync::atomic::{AtomicBool, Ordering};

            let shutdown_flag = Arc::new(AtomicBool::new(false));
            if let Err(e) = signal_hook::flag::register(SIGTERM, shutdown_flag.clone()) {
                error!("failed to register SIGTERM handler: {}", e);
                return;
            }

            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    info!("SIGTERM signal received");
                    let _ = shutdown_tx.send(()).await;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
    }

    Ok(shutdown_rx)
}

/// Graceful shutdown handler
pub async fn graceful_shutdown(
    service_state: Arc<ServiceState>,
    gateway_handle: tokio::task::JoinHandle<()>,
) -> Result<()> {
    info!("starting graceful shutdown...");

    if let Err(e) = service_state.shutdown().await {
        error!("failed to shut down service components: {}", e);
    }

    // The gateway accept loop never returns on its own; give it a moment to
    // drain and then drop it.
    gateway_handle.abort();
    match timeout(Duration::from_secs(5), gateway_handle).await {
        Ok(Ok(())) => info!("gateway stopped gracefully"),
        Ok(Err(e)) if e.is_cancelled() => info!("gateway task cancelled"),
        Ok(Err(e)) => error!("gateway task failed: {}", e),
        Err(_) => warn!("gateway did not stop within timeout"),
    }

    info!("graceful shutdown complete");
    Ok(())
}
