use super::driver::SensorDriver;
use super::settings::SensorSetting;
use crate::config::CameraConfig;
use crate::error::DriverFault;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// What the mock sensor does on the next capture
#[derive(Debug, Clone)]
pub enum MockFrame {
    Data(Vec<u8>),
    Fault(String),
    /// Never produce a frame
    Hang,
}

#[derive(Debug, Default)]
struct MockSensorState {
    frames: VecDeque<MockFrame>,
    non_acknowledging: bool,
    rejected: Vec<SensorSetting>,
    configure_calls: usize,
    capture_calls: usize,
    applied: Vec<(SensorSetting, i32)>,
}

/// Scriptable sensor for testing without real hardware. Clones share state,
/// so a test can keep one handle while the manager owns another.
#[derive(Debug, Clone, Default)]
pub struct MockSensor {
    state: Arc<Mutex<MockSensorState>>,
}

impl MockSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor that returns the given payloads in order
    pub fn with_frames<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let sensor = Self::new();
        for frame in frames {
            sensor.push_frame(frame);
        }
        sensor
    }

    /// Sensor that never acknowledges configuration
    pub fn non_acknowledging() -> Self {
        let sensor = Self::new();
        sensor.state.lock().non_acknowledging = true;
        sensor
    }

    pub fn push_frame(&self, data: Vec<u8>) {
        self.state.lock().frames.push_back(MockFrame::Data(data));
    }

    pub fn push_fault<S: Into<String>>(&self, message: S) {
        self.state
            .lock()
            .frames
            .push_back(MockFrame::Fault(message.into()));
    }

    pub fn push_hang(&self) {
        self.state.lock().frames.push_back(MockFrame::Hang);
    }

    /// Make writes to `setting` fail
    pub fn reject_setting(&self, setting: SensorSetting) {
        self.state.lock().rejected.push(setting);
    }

    pub fn configure_calls(&self) -> usize {
        self.state.lock().configure_calls
    }

    pub fn capture_calls(&self) -> usize {
        self.state.lock().capture_calls
    }

    pub fn applied(&self) -> Vec<(SensorSetting, i32)> {
        self.state.lock().applied.clone()
    }
}

#[async_trait]
impl SensorDriver for MockSensor {
    async fn configure(&mut self, _config: &CameraConfig) -> Result<String, DriverFault> {
        let mut state = self.state.lock();
        state.configure_calls += 1;
        if state.non_acknowledging {
            Err(DriverFault::new("no acknowledge from sensor"))
        } else {
            Ok("mock".to_string())
        }
    }

    async fn set(&mut self, setting: SensorSetting, value: i32) -> Result<(), DriverFault> {
        let mut state = self.state.lock();
        if state.rejected.contains(&setting) {
            return Err(DriverFault::new(format!("{} rejected", setting.name())));
        }
        state.applied.push((setting, value));
        Ok(())
    }

    async fn capture(&mut self, buf: &mut Vec<u8>) -> Result<(), DriverFault> {
        let next = {
            let mut state = self.state.lock();
            state.capture_calls += 1;
            state.frames.pop_front()
        };

        match next {
            Some(MockFrame::Data(data)) => {
                buf.extend_from_slice(&data);
                Ok(())
            }
            Some(MockFrame::Fault(message)) => Err(DriverFault(message)),
            Some(MockFrame::Hang) => std::future::pending().await,
            None => Err(DriverFault::new("no frame scripted")),
        }
    }
}
