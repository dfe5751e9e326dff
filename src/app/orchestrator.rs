use crate::camera::{SensorDriver, SimulatedSensor};
use crate::capture::{CaptureLoop, CaptureMonitor};
use crate::config::SdcamConfig;
use crate::storage::{BlockStorage, DirectoryCard, StorageMountManager};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Top-level assembly: owns every component's state and wires them together
pub struct SdcamOrchestrator {
    pub(super) config: SdcamConfig,
    pub(super) storage: Arc<RwLock<StorageMountManager>>,
    pub(super) sensor: Option<Box<dyn SensorDriver>>,
    pub(super) capture: Option<CaptureLoop>,
    pub(super) monitor: Option<CaptureMonitor>,
}

impl SdcamOrchestrator {
    pub fn new(
        config: SdcamConfig,
        storage_driver: Box<dyn BlockStorage>,
        sensor: Box<dyn SensorDriver>,
    ) -> Self {
        let storage = StorageMountManager::new(storage_driver, &config.storage);

        Self {
            config,
            storage: Arc::new(RwLock::new(storage)),
            sensor: Some(sensor),
            capture: None,
            monitor: None,
        }
    }

    /// Host drivers: directory-backed card and simulated sensor
    pub fn from_config(config: SdcamConfig) -> Self {
        let card = DirectoryCard::from_config(&config.storage);
        Self::new(config, Box::new(card), Box::new(SimulatedSensor::new()))
    }

    pub fn config(&self) -> &SdcamConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<RwLock<StorageMountManager>> {
        Arc::clone(&self.storage)
    }

    /// Counters and health of the capture loop, once initialized
    pub fn monitor(&self) -> Option<CaptureMonitor> {
        self.monitor.clone()
    }
}
