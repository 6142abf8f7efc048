//! Media gallery service
//!
//! Wires the access gate, the health sampler and the diagnostics API into
//! one axum application. The binary in `main.rs` loads configuration and
//! hands over to [`run_service`].

pub mod api;
pub mod config;
pub mod gate;

use gallery_lib::{observability::StructuredLogger, SamplerLoop, Trigger};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::{self, ctrl_c};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Run the sampler loop and the API until `shutdown` resolves.
///
/// Afterwards the loop is stopped and one final corrective pass runs, even
/// if the server itself failed. Returns whether that pass reclaimed memory.
pub async fn run_service(
    state: Arc<api::AppState>,
    port: u16,
    drain_timeout: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
    logger: &StructuredLogger,
) -> anyhow::Result<bool> {
    let (shutdown_tx, _) = broadcast::channel(1);
    let sampler_handle =
        tokio::spawn(SamplerLoop::new(state.sampler.clone()).run(shutdown_tx.subscribe()));

    let served = api::serve(port, state.clone(), shutdown, drain_timeout).await;
    logger.log_shutdown("termination signal received");

    let _ = shutdown_tx.send(());
    if let Err(e) = sampler_handle.await {
        warn!(error = %e, "Health sampler task ended abnormally");
    }

    let reclaimed = state.sampler.corrective_action(Trigger::Shutdown).await;
    served?;
    Ok(reclaimed)
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
