use super::{SdcamOrchestrator, ShutdownReason};
use crate::error::{Result, SdcamError};
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

impl SdcamOrchestrator {
    /// Run the capture loop until it finishes `iterations` passes, or
    /// forever when `None`. A SIGINT/SIGTERM ends the run early. The card is
    /// unmounted before returning.
    pub async fn run(&mut self, iterations: Option<u64>) -> Result<ShutdownReason> {
        self.run_until(iterations, wait_for_signal()).await
    }

    /// Like `run`, stopping when `shutdown` resolves. An iteration in
    /// progress is always finished so no temporary file is left behind.
    pub(crate) async fn run_until<F>(
        &mut self,
        iterations: Option<u64>,
        shutdown: F,
    ) -> Result<ShutdownReason>
    where
        F: Future<Output = String>,
    {
        let mut capture = self
            .capture
            .take()
            .ok_or_else(|| SdcamError::system("Capture loop not initialized"))?;

        info!("Sdcam system is running");

        tokio::pin!(shutdown);
        let period = capture.period();
        let mut completed: u64 = 0;

        let reason = loop {
            if iterations.is_some_and(|limit| completed >= limit) {
                break ShutdownReason::Completed;
            }

            if completed > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(period) => {}
                    name = &mut shutdown => break ShutdownReason::Signal(name),
                }
            }

            let iteration = capture.run_iteration();
            tokio::pin!(iteration);
            tokio::select! {
                _ = &mut iteration => {}
                name = &mut shutdown => {
                    info!("{} received, finishing the current capture", name);
                    iteration.await;
                    break ShutdownReason::Signal(name);
                }
            }
            completed += 1;
        };

        info!("Stopping capture: {:?}", reason);
        drop(capture);

        self.storage.write().await.unmount().await;
        Ok(reason)
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> String {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => tokio::select! {
            _ = ctrl_c() => "SIGINT".to_string(),
            _ = sigterm.recv() => "SIGTERM".to_string(),
        },
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            ctrl_c().await;
            "SIGINT".to_string()
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> String {
    ctrl_c().await;
    "SIGINT".to_string()
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
