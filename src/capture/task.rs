use super::health::{CaptureStats, HealthCheckResult, HealthStatus};
use crate::camera::CameraManager;
use crate::config::CaptureConfig;
use crate::storage::FrameWriter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Result of one acquire → write → release pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    Saved(String),
    WriteFailed,
    AcquireFailed,
}

/// Read-only view of a running loop's counters and health
#[derive(Clone)]
pub struct CaptureMonitor {
    stats: Arc<Mutex<CaptureStats>>,
    unhealthy_after: u32,
}

impl CaptureMonitor {
    pub fn stats(&self) -> CaptureStats {
        self.stats.lock().clone()
    }

    pub fn health(&self) -> HealthCheckResult {
        self.stats.lock().health(self.unhealthy_after)
    }
}

/// Periodic capture task: acquire a frame, write it, release it, sleep
pub struct CaptureLoop {
    camera: CameraManager,
    writer: FrameWriter,
    period: Duration,
    monitor: CaptureMonitor,
    last_status: HealthStatus,
}

impl CaptureLoop {
    pub fn new(camera: CameraManager, writer: FrameWriter, config: &CaptureConfig) -> Self {
        Self {
            camera,
            writer,
            period: Duration::from_millis(config.period_ms),
            monitor: CaptureMonitor {
                stats: Arc::new(Mutex::new(CaptureStats::default())),
                unhealthy_after: config.unhealthy_after,
            },
            last_status: HealthStatus::Healthy,
        }
    }

    pub fn monitor(&self) -> CaptureMonitor {
        self.monitor.clone()
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One loop body without the trailing delay. The buffer is released on
    /// every path once acquired; a failed acquire has nothing to release.
    pub async fn run_iteration(&mut self) -> IterationOutcome {
        info!("Taking picture...");

        let outcome = match self.camera.acquire().await {
            Err(e) => {
                error!("Failed to take picture: {}", e);
                IterationOutcome::AcquireFailed
            }
            Ok(frame) => {
                info!("Picture taken! Its size was: {} bytes", frame.len());

                let written = self.writer.write(&frame).await;

                if let Err(e) = self.camera.release(frame) {
                    error!("Failed to release frame buffer: {}", e);
                }

                match written {
                    Ok(filename) => IterationOutcome::Saved(filename),
                    Err(_) => IterationOutcome::WriteFailed,
                }
            }
        };

        self.record(&outcome);
        outcome
    }

    fn record(&mut self, outcome: &IterationOutcome) {
        let health = {
            let mut stats = self.monitor.stats.lock();
            stats.iterations += 1;

            match outcome {
                IterationOutcome::Saved(filename) => {
                    stats.frames_saved += 1;
                    stats.consecutive_acquire_failures = 0;
                    stats.last_write_failed = false;
                    stats.last_saved = Some(filename.clone());
                }
                IterationOutcome::WriteFailed => {
                    stats.write_failures += 1;
                    stats.consecutive_acquire_failures = 0;
                    stats.last_write_failed = true;
                }
                IterationOutcome::AcquireFailed => {
                    stats.acquire_failures += 1;
                    stats.consecutive_acquire_failures += 1;
                }
            }

            stats.health(self.monitor.unhealthy_after)
        };

        if health.status != self.last_status {
            match health.status {
                HealthStatus::Healthy => info!("Capture loop healthy again"),
                HealthStatus::Warning => warn!("Capture loop degraded: {:?}", health.warnings),
                HealthStatus::Unhealthy => error!("Capture loop unhealthy: {:?}", health.issues),
            }
            self.last_status = health.status;
        }
    }

    /// Run `iterations` passes with the period between them
    pub async fn run_for(&mut self, iterations: u64) {
        for i in 0..iterations {
            self.run_iteration().await;
            if i + 1 < iterations {
                tokio::time::sleep(self.period).await;
            }
        }
        debug!("Capture loop finished {} iterations", iterations);
    }

    /// Run forever
    pub async fn run(&mut self) {
        info!("Capture loop started, period {:?}", self.period);
        loop {
            self.run_iteration().await;
            tokio::time::sleep(self.period).await;
        }
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }
}
