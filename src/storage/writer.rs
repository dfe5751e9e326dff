use super::driver::BlockStorage;
use super::mount::StorageMountManager;
use super::sequencer::FilenameSequencer;
use crate::camera::CaptureBuffer;
use crate::error::StorageError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Persists captured frames as individual files on the mounted volume
pub struct FrameWriter {
    storage: Arc<RwLock<StorageMountManager>>,
    sequencer: FilenameSequencer,
}

impl FrameWriter {
    pub fn new(storage: Arc<RwLock<StorageMountManager>>, sequencer: FilenameSequencer) -> Self {
        Self { storage, sequencer }
    }

    /// Write the frame to the next file name and return that name. The
    /// payload goes to `<name>.tmp` first and is renamed into place, so a
    /// failed write never leaves a partial file under the final name.
    pub async fn write(&mut self, buffer: &CaptureBuffer) -> Result<String, StorageError> {
        let storage = self.storage.read().await;
        let volume = storage.volume().map_err(|e| {
            error!("Dropping frame {}: {}", buffer.sequence(), e);
            e
        })?;

        let filename = self.sequencer.next();
        let temp_name = format!("{}.tmp", filename);

        if let Err(e) = volume.write_file(&temp_name, buffer.data()).await {
            error!("Failed to create file: {} ({})", filename, e);
            discard(volume, &temp_name).await;
            return Err(StorageError::io(filename, e));
        }

        if let Err(e) = volume.rename(&temp_name, &filename).await {
            error!("Failed to move {} into place: {}", filename, e);
            discard(volume, &temp_name).await;
            return Err(StorageError::io(filename, e));
        }

        info!("{} saved as {}", buffer.format().label(), filename);
        Ok(filename)
    }

    /// Counter value the next successful mount check will consume
    pub fn next_index(&self) -> u64 {
        self.sequencer.peek()
    }
}

async fn discard(volume: &dyn BlockStorage, temp_name: &str) {
    match volume.remove_file(temp_name).await {
        Ok(()) => debug!("Removed partial file {}", temp_name),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Partial file {} left on card: {}", temp_name, e),
    }
}
