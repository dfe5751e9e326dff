mod driver;
mod manager;
pub mod mock;
mod pool;
mod settings;
mod simulated;
#[cfg(test)]
mod tests;

pub use driver::SensorDriver;
pub use manager::{CameraManager, CameraState};
pub use mock::{MockFrame, MockSensor};
pub use pool::{CaptureBuffer, FrameInfo, FramePool, PoolStats};
pub use settings::{SensorSetting, SensorTuning};
pub use simulated::SimulatedSensor;
