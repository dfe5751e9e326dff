use super::driver::SensorDriver;
use super::pool::{CaptureBuffer, FrameInfo, FramePool, PoolStats};
use crate::config::CameraConfig;
use crate::error::{AcquireFailure, CameraError};
use crate::frame::expected_frame_len;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// Lifecycle of the capture peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Uninitialized,
    Ready,
    /// Initialization was rejected by the sensor; terminal
    Failed,
}

/// Owns the sensor driver and its frame buffer pool
pub struct CameraManager {
    driver: Box<dyn SensorDriver>,
    state: CameraState,
    config: Option<CameraConfig>,
    pool: Option<Arc<FramePool>>,
    sequence: u64,
}

impl CameraManager {
    pub fn new(driver: Box<dyn SensorDriver>) -> Self {
        Self {
            driver,
            state: CameraState::Uninitialized,
            config: None,
            pool: None,
            sequence: 0,
        }
    }

    /// Configure and power on the sensor, then apply the tuning table
    pub async fn initialize(&mut self, config: CameraConfig) -> Result<(), CameraError> {
        match self.state {
            CameraState::Ready => {
                return Err(CameraError::Init {
                    details: "camera is already initialized".to_string(),
                })
            }
            CameraState::Failed => {
                return Err(CameraError::Init {
                    details: "a previous initialization failed".to_string(),
                })
            }
            CameraState::Uninitialized => {}
        }

        config.tuning.validate()?;

        let model = match self.driver.configure(&config).await {
            Ok(model) => model,
            Err(fault) => {
                error!("Camera configured unsuccessful: {}", fault);
                self.state = CameraState::Failed;
                return Err(CameraError::Init {
                    details: fault.to_string(),
                });
            }
        };

        info!(
            "Camera configured successful: {} {:?} {:?}, quality {}, {} buffers in {:?}, grab {:?}",
            model,
            config.pixel_format,
            config.frame_size,
            config.jpeg_quality,
            config.fb_count,
            config.fb_location,
            config.grab_mode
        );

        for (setting, value) in config.tuning.settings() {
            if let Err(fault) = self.driver.set(setting, value).await {
                warn!("Sensor rejected {} = {}: {}", setting.name(), value, fault);
            }
        }
        debug!("Sensor tuning applied");

        let capacity_hint = expected_frame_len(config.pixel_format, config.frame_size).unwrap_or(0);
        self.pool = Some(FramePool::new(config.fb_count, capacity_hint));
        self.config = Some(config);
        self.state = CameraState::Ready;

        Ok(())
    }

    /// Wait for the next frame. On error nothing is checked out.
    pub async fn acquire(&mut self) -> Result<CaptureBuffer, CameraError> {
        let (config, pool) = match (self.state, &self.config, &self.pool) {
            (CameraState::Ready, Some(config), Some(pool)) => (config, Arc::clone(pool)),
            _ => return Err(AcquireFailure::Uninitialized.into()),
        };

        let (slot, mut buf) = pool.checkout().ok_or(AcquireFailure::Busy)?;

        let timeout_ms = config.acquire_timeout_ms;
        let (width, height) = config.frame_size.dimensions();
        let format = config.pixel_format;

        let outcome =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.driver.capture(&mut buf))
                .await;

        let failure = match outcome {
            Ok(Ok(())) if buf.is_empty() => AcquireFailure::Driver("empty frame".to_string()),
            Ok(Ok(())) => {
                let info = FrameInfo {
                    sequence: self.sequence,
                    width,
                    height,
                    format,
                    timestamp: SystemTime::now(),
                };
                self.sequence += 1;
                return Ok(pool.commit(slot, buf, info));
            }
            Ok(Err(fault)) => AcquireFailure::Driver(fault.to_string()),
            Err(_) => AcquireFailure::Timeout { timeout_ms },
        };

        pool.restore(slot, buf);
        Err(failure.into())
    }

    /// Return a frame's memory to the pool
    pub fn release(&self, mut buffer: CaptureBuffer) -> Result<(), CameraError> {
        buffer.give_back()
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn config(&self) -> Option<&CameraConfig> {
        self.config.as_ref()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.pool.as_ref().map(|pool| pool.stats())
    }
}
