use super::SdcamOrchestrator;
use crate::camera::CameraManager;
use crate::capture::CaptureLoop;
use crate::error::{Result, SdcamError};
use crate::storage::{FilenameSequencer, FrameWriter};
use std::sync::Arc;
use tracing::{error, info, warn};

impl SdcamOrchestrator {
    /// Mount storage, bring up the camera and build the capture loop.
    /// A mount failure stops here, before the camera is touched.
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing sdcam components");

        self.storage.write().await.mount().await.map_err(|e| {
            error!("Storage unavailable, not starting capture: {}", e);
            e
        })?;

        let sensor = self
            .sensor
            .take()
            .ok_or_else(|| SdcamError::component("camera", "sensor driver already taken"))?;

        let mut camera = CameraManager::new(sensor);
        if let Err(e) = camera.initialize(self.config.camera.clone()).await {
            warn!(
                "Camera initialization failed ({}); every capture will fail until restart",
                e
            );
        }

        let sequencer = FilenameSequencer::new(
            self.config.storage.mount_point.clone(),
            self.config.camera.pixel_format,
        );
        let writer = FrameWriter::new(Arc::clone(&self.storage), sequencer);
        let capture = CaptureLoop::new(camera, writer, &self.config.capture);

        self.monitor = Some(capture.monitor());
        self.capture = Some(capture);

        info!("All components initialized successfully");
        Ok(())
    }
}
