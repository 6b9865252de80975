//! OS signal handling for graceful stop

use crate::supervisor::SupervisorHandle;
use tokio::signal;

/// Stops a supervisor when the process receives SIGINT or SIGTERM
#[derive(Debug)]
pub struct SignalHandler {
    handle: SupervisorHandle,
}

impl SignalHandler {
    /// Create a new signal handler
    pub fn new(handle: SupervisorHandle) -> Self {
        Self { handle }
    }

    /// Wait for a termination signal, then stop the supervisor
    pub async fn run(self) {
        #[cfg(unix)]
        {
            use signal::unix::{signal, SignalKind};

            match (
                signal(SignalKind::terminate()),
                signal(SignalKind::interrupt()),
            ) {
                (Ok(mut sigterm), Ok(mut sigint)) => {
                    tokio::select! {
                        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                        _ = sigint.recv() => tracing::info!("Received SIGINT"),
                    }
                    self.handle.stop();
                    return;
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::warn!(error = %err, "Failed to install Unix signal handlers, falling back to Ctrl+C");
                }
            }
        }

        match signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C");
                self.handle.stop();
            }
            Err(err) => {
                tracing::error!("Failed to listen for Ctrl+C: {}", err);
            }
        }
    }
}
