use crate::camera::SensorTuning;
use crate::frame::{FrameLocation, FrameSize, GrabMode, PixelFormat};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SdcamConfig {
    pub camera: CameraConfig,
    pub storage: StorageConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CameraConfig {
    /// Sensor wiring
    #[serde(default)]
    pub pins: CameraPins,

    /// External clock frequency of the image sensor
    #[serde(default = "default_xclk_freq_hz")]
    pub xclk_freq_hz: u32,

    /// Pixel format produced by the sensor
    #[serde(default = "default_pixel_format")]
    pub pixel_format: PixelFormat,

    /// Sensor resolution class
    #[serde(default = "default_frame_size")]
    pub frame_size: FrameSize,

    /// JPEG quality, 0 (best) to 63
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Number of frame buffers in the driver pool
    #[serde(default = "default_fb_count")]
    pub fb_count: usize,

    /// Frame buffer memory location
    #[serde(default = "default_fb_location")]
    pub fb_location: FrameLocation,

    /// Buffering strategy
    #[serde(default = "default_grab_mode")]
    pub grab_mode: GrabMode,

    /// Upper bound on a single frame acquire
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    /// Tuning parameters applied once after initialization
    #[serde(default)]
    pub tuning: SensorTuning,
}

/// Camera GPIO assignment; -1 marks an unconnected pin
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CameraPins {
    pub pwdn: i32,
    pub reset: i32,
    pub xclk: i32,
    pub sccb_sda: i32,
    pub sccb_scl: i32,
    /// D0 through D7
    pub data: [i32; 8],
    pub vsync: i32,
    pub href: i32,
    pub pclk: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StorageConfig {
    /// Path the volume is mounted on; file names are derived from it
    #[serde(default = "default_mount_point")]
    pub mount_point: String,

    /// Host directory backing the card
    #[serde(default = "default_card_path")]
    pub card_path: String,

    /// Format the card and retry once when mounting fails
    #[serde(default = "default_format_if_mount_failed")]
    pub format_if_mount_failed: bool,

    /// Wipe the card right after every successful mount
    #[serde(default = "default_format_on_mount")]
    pub format_on_mount: bool,

    /// Cluster size used when formatting
    #[serde(default = "default_allocation_unit_size")]
    pub allocation_unit_size: u32,

    /// SPI clock ceiling (400 kHz to 20 MHz)
    #[serde(default = "default_max_freq_khz")]
    pub max_freq_khz: u32,

    /// SPI wiring
    #[serde(default)]
    pub pins: SpiPins,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SpiPins {
    pub mosi: i32,
    pub miso: i32,
    pub sclk: i32,
    pub cs: i32,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Delay between capture iterations
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,

    /// Consecutive acquire failures before the loop reports unhealthy
    #[serde(default = "default_unhealthy_after")]
    pub unhealthy_after: u32,
}

impl SdcamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.xclk_freq_hz", default_xclk_freq_hz())?
            .set_default("camera.pixel_format", "jpeg")?
            .set_default("camera.frame_size", "uxga")?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("camera.fb_count", default_fb_count() as i64)?
            .set_default("camera.fb_location", "psram")?
            .set_default("camera.grab_mode", "latest")?
            .set_default("camera.acquire_timeout_ms", default_acquire_timeout_ms())?
            .set_default("storage.mount_point", default_mount_point())?
            .set_default("storage.card_path", default_card_path())?
            .set_default(
                "storage.format_if_mount_failed",
                default_format_if_mount_failed(),
            )?
            .set_default("storage.format_on_mount", default_format_on_mount())?
            .set_default(
                "storage.allocation_unit_size",
                default_allocation_unit_size(),
            )?
            .set_default("storage.max_freq_khz", default_max_freq_khz())?
            .set_default("capture.period_ms", default_period_ms())?
            .set_default("capture.unhealthy_after", default_unhealthy_after())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. SDCAM_CAPTURE__PERIOD_MS=1000
            .add_source(
                Environment::with_prefix("SDCAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: SdcamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.jpeg_quality > 63 {
            return Err(ConfigError::Message(format!(
                "Camera jpeg_quality must be within 0..=63, got {}",
                self.camera.jpeg_quality
            )));
        }

        if self.camera.fb_count == 0 {
            return Err(ConfigError::Message(
                "Camera fb_count must be greater than 0".to_string(),
            ));
        }

        if self.camera.xclk_freq_hz == 0 {
            return Err(ConfigError::Message(
                "Camera xclk_freq_hz must be greater than 0".to_string(),
            ));
        }

        if self.camera.acquire_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Camera acquire_timeout_ms must be greater than 0".to_string(),
            ));
        }

        self.camera
            .tuning
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        let mount_point = &self.storage.mount_point;
        if !mount_point.starts_with('/') || mount_point.len() < 2 || mount_point.ends_with('/') {
            return Err(ConfigError::Message(format!(
                "Storage mount_point must be an absolute path like /sd, got {:?}",
                mount_point
            )));
        }

        if !(400..=20_000).contains(&self.storage.max_freq_khz) {
            return Err(ConfigError::Message(format!(
                "Storage max_freq_khz must be within 400..=20000, got {}",
                self.storage.max_freq_khz
            )));
        }

        if self.storage.allocation_unit_size == 0
            || !self.storage.allocation_unit_size.is_power_of_two()
        {
            return Err(ConfigError::Message(
                "Storage allocation_unit_size must be a power of two".to_string(),
            ));
        }

        if self.capture.period_ms == 0 {
            return Err(ConfigError::Message(
                "Capture period_ms must be greater than 0".to_string(),
            ));
        }

        if self.capture.unhealthy_after == 0 {
            return Err(ConfigError::Message(
                "Capture unhealthy_after must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SdcamConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            storage: StorageConfig::default(),
            capture: CaptureConfig {
                period_ms: default_period_ms(),
                unhealthy_after: default_unhealthy_after(),
            },
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            pins: CameraPins::default(),
            xclk_freq_hz: default_xclk_freq_hz(),
            pixel_format: default_pixel_format(),
            frame_size: default_frame_size(),
            jpeg_quality: default_jpeg_quality(),
            fb_count: default_fb_count(),
            fb_location: default_fb_location(),
            grab_mode: default_grab_mode(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            tuning: SensorTuning::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            card_path: default_card_path(),
            format_if_mount_failed: default_format_if_mount_failed(),
            format_on_mount: default_format_on_mount(),
            allocation_unit_size: default_allocation_unit_size(),
            max_freq_khz: default_max_freq_khz(),
            pins: SpiPins::default(),
        }
    }
}

// AI-Thinker ESP32-CAM wiring
impl Default for CameraPins {
    fn default() -> Self {
        Self {
            pwdn: 32,
            reset: -1,
            xclk: 0,
            sccb_sda: 26,
            sccb_scl: 27,
            data: [5, 18, 19, 21, 36, 39, 34, 35],
            vsync: 25,
            href: 23,
            pclk: 22,
        }
    }
}

impl Default for SpiPins {
    fn default() -> Self {
        Self {
            mosi: 15,
            miso: 2,
            sclk: 14,
            cs: 13,
        }
    }
}

// Default value functions
fn default_xclk_freq_hz() -> u32 {
    20_000_000
}
fn default_pixel_format() -> PixelFormat {
    PixelFormat::Jpeg
}
fn default_frame_size() -> FrameSize {
    FrameSize::Uxga
}
fn default_jpeg_quality() -> u8 {
    15
}
fn default_fb_count() -> usize {
    2
}
fn default_fb_location() -> FrameLocation {
    FrameLocation::Psram
}
fn default_grab_mode() -> GrabMode {
    GrabMode::Latest
}
fn default_acquire_timeout_ms() -> u64 {
    4000
}

fn default_mount_point() -> String {
    "/sd".to_string()
}
fn default_card_path() -> String {
    "./sdcard".to_string()
}
fn default_format_if_mount_failed() -> bool {
    false
}
fn default_format_on_mount() -> bool {
    false
}
fn default_allocation_unit_size() -> u32 {
    32 * 1024
}
fn default_max_freq_khz() -> u32 {
    20_000
}

fn default_period_ms() -> u64 {
    5000
}
fn default_unhealthy_after() -> u32 {
    3
}
