use super::driver::SensorDriver;
use super::settings::SensorSetting;
use crate::config::CameraConfig;
use crate::error::DriverFault;
use crate::frame::{expected_frame_len, FrameSize, GrabMode, PixelFormat};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

const JPEG_HEADER: [u8; 20] = [
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01, 0x00, 0x48,
    0x00, 0x48, 0x00, 0x00,
];
const JPEG_TRAILER: [u8; 2] = [0xFF, 0xD9];

/// Host stand-in for the OV2640 sensor. Produces synthetic frames at the
/// sensor's nominal frame rate.
pub struct SimulatedSensor {
    config: Option<CameraConfig>,
    registers: HashMap<SensorSetting, i32>,
    started: Instant,
    next_frame: u64,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            config: None,
            registers: HashMap::new(),
            started: Instant::now(),
            next_frame: 0,
        }
    }

    /// Last value written to a tuning register
    pub fn register(&self, setting: SensorSetting) -> Option<i32> {
        self.registers.get(&setting).copied()
    }

    fn frame_interval(size: FrameSize) -> Duration {
        match size {
            FrameSize::Uxga | FrameSize::Sxga | FrameSize::Xga => Duration::from_millis(66),
            _ => Duration::from_millis(40),
        }
    }

    fn fill_frame(config: &CameraConfig, frame_id: u64, buf: &mut Vec<u8>) {
        let pattern_byte = (frame_id % 256) as u8;

        match config.pixel_format {
            PixelFormat::Jpeg => {
                let (width, height) = config.frame_size.dimensions();
                // Lower quality numbers compress less
                let body = (width as usize * height as usize) / (10 + config.jpeg_quality as usize)
                    + (frame_id % 500) as usize;
                buf.extend_from_slice(&JPEG_HEADER);
                buf.resize(buf.len() + body, pattern_byte);
                buf.extend_from_slice(&JPEG_TRAILER);
            }
            format => {
                let len = expected_frame_len(format, config.frame_size).unwrap_or(0);
                buf.resize(len, pattern_byte);
            }
        }
    }
}

/// Time from sensor start until `frame_id` has been fully exposed
fn exposure_offset(interval: Duration, frame_id: u64) -> Duration {
    let nanos = interval
        .as_nanos()
        .saturating_mul(u128::from(frame_id) + 1);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorDriver for SimulatedSensor {
    async fn configure(&mut self, config: &CameraConfig) -> Result<String, DriverFault> {
        let pins = &config.pins;
        if pins.sccb_sda < 0 || pins.sccb_scl < 0 || pins.xclk < 0 {
            return Err(DriverFault::new("sensor did not acknowledge on SCCB"));
        }
        if pins.data.iter().any(|pin| *pin < 0) || pins.pclk < 0 || pins.vsync < 0 || pins.href < 0
        {
            return Err(DriverFault::new("parallel data bus is not fully wired"));
        }

        debug!(
            "Simulated sensor configured: {:?} {:?}, xclk {} Hz",
            config.pixel_format, config.frame_size, config.xclk_freq_hz
        );

        self.config = Some(config.clone());
        self.registers.clear();
        self.started = Instant::now();
        self.next_frame = 0;

        Ok("OV2640 (simulated)".to_string())
    }

    async fn set(&mut self, setting: SensorSetting, value: i32) -> Result<(), DriverFault> {
        if self.config.is_none() {
            return Err(DriverFault::new("sensor not configured"));
        }
        self.registers.insert(setting, value);
        Ok(())
    }

    async fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), DriverFault> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| DriverFault::new("sensor not configured"))?;

        let interval = Self::frame_interval(config.frame_size);
        let elapsed_frames = (self.started.elapsed().as_millis() / interval.as_millis()) as u64;

        let frame_id = match config.grab_mode {
            GrabMode::Latest => self.next_frame.max(elapsed_frames),
            GrabMode::WhenEmpty => self.next_frame,
        };

        // Wait until the sensor has exposed this frame
        match self.started.checked_add(exposure_offset(interval, frame_id)) {
            Some(due) => tokio::time::sleep_until(due).await,
            None => tokio::time::sleep(interval).await,
        }

        Self::fill_frame(config, frame_id, buf);
        self.next_frame = frame_id + 1;

        trace!("Simulated frame {} ({} bytes)", frame_id, buf.len());
        Ok(())
    }
}
