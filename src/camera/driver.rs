use super::settings::SensorSetting;
use crate::config::CameraConfig;
use crate::error::DriverFault;
use async_trait::async_trait;

/// Capability interface of a camera sensor driver
#[async_trait]
pub trait SensorDriver: Send {
    /// Configure and power on the sensor, returning its model name.
    /// An error means the sensor did not acknowledge the configuration.
    async fn configure(&mut self, config: &CameraConfig) -> Result<String, DriverFault>;

    /// Write one tuning register
    async fn set(&mut self, setting: SensorSetting, value: i32) -> Result<(), DriverFault>;

    /// Fill `buf` with the next frame. May wait for the sensor; the caller
    /// bounds the wait.
    async fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), DriverFault>;
}
