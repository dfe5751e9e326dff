use super::driver::{BlockStorage, MountFault, VolumeInfo};
use crate::config::StorageConfig;
use crate::error::StorageError;
use tracing::{debug, error, info, warn};

/// Whether a volume is attached at the mount point
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountState {
    Unmounted,
    Mounted(VolumeInfo),
}

/// Owns the card driver and the single mount of its volume
pub struct StorageMountManager {
    driver: Box<dyn BlockStorage>,
    mount_point: String,
    format_if_mount_failed: bool,
    format_on_mount: bool,
    state: MountState,
}

impl StorageMountManager {
    pub fn new(driver: Box<dyn BlockStorage>, config: &StorageConfig) -> Self {
        Self {
            driver,
            mount_point: config.mount_point.clone(),
            format_if_mount_failed: config.format_if_mount_failed,
            format_on_mount: config.format_on_mount,
            state: MountState::Unmounted,
        }
    }

    /// Bring up the bus and mount the filesystem. With auto-format enabled a
    /// failed mount formats the media and retries once.
    pub async fn mount(&mut self) -> Result<(), StorageError> {
        if self.is_mounted() {
            warn!("Storage already mounted at {}", self.mount_point);
            return Ok(());
        }

        info!("Initializing SD card");

        if let Err(fault) = self.driver.init_bus().await {
            error!("Failed to initialize bus: {}", fault);
            return Err(StorageError::BusInit {
                details: fault.to_string(),
            });
        }

        info!("Mounting filesystem at {}", self.mount_point);

        let volume = match self.driver.mount(&self.mount_point).await {
            Ok(volume) => volume,
            Err(fault) => match self.recover_mount(fault).await {
                Ok(volume) => volume,
                Err(e) => {
                    self.driver.free_bus().await;
                    return Err(e);
                }
            },
        };

        info!("Filesystem mounted");
        info!(
            "Card: name {}, {} files / {} bytes used, {} byte allocation units, {} kHz",
            volume.name,
            volume.file_count,
            volume.used_bytes,
            volume.allocation_unit_size,
            volume.bus_speed_khz
        );
        self.state = MountState::Mounted(volume);

        if self.format_on_mount {
            if let Err(e) = self.format().await {
                error!("Format on mount failed, releasing card: {}", e);
                self.unmount().await;
                return Err(e);
            }
        }

        Ok(())
    }

    async fn recover_mount(&mut self, fault: MountFault) -> Result<VolumeInfo, StorageError> {
        match &fault {
            MountFault::NoFilesystem(_) if !self.format_if_mount_failed => {
                error!(
                    "Failed to mount filesystem ({}). Enable storage.format_if_mount_failed to format the card",
                    fault
                );
                return Err(StorageError::Mount {
                    details: fault.to_string(),
                });
            }
            MountFault::Card(_) if !self.format_if_mount_failed => {
                error!(
                    "Failed to initialize the card ({}). Make sure SD card lines have pull-up resistors in place",
                    fault
                );
                return Err(StorageError::Mount {
                    details: fault.to_string(),
                });
            }
            _ => {}
        }

        warn!("Mount failed ({}); formatting card and retrying", fault);

        self.driver.format().await.map_err(|e| {
            error!("Failed to format card: {}", e);
            StorageError::Mount {
                details: format!("format failed: {}", e),
            }
        })?;

        self.driver
            .mount(&self.mount_point)
            .await
            .map_err(|retry_fault| {
                error!("Mount failed after format: {}", retry_fault);
                StorageError::Mount {
                    details: retry_fault.to_string(),
                }
            })
    }

    /// Wipe the mounted volume and check nothing survived
    pub async fn format(&mut self) -> Result<(), StorageError> {
        if !self.is_mounted() {
            return Err(StorageError::NotMounted);
        }

        self.driver.format().await.map_err(|e| {
            error!("Failed to format FATFS ({})", e);
            StorageError::Mount {
                details: format!("format failed: {}", e),
            }
        })?;

        let remaining = self
            .driver
            .list_files()
            .await
            .map_err(|e| StorageError::io(self.mount_point.clone(), e))?;

        if remaining.is_empty() {
            info!("Card formatted, volume is empty");
            if let MountState::Mounted(volume) = &mut self.state {
                volume.file_count = 0;
                volume.used_bytes = 0;
            }
            Ok(())
        } else {
            error!("Files still exist after format: {:?}", remaining);
            Err(StorageError::Mount {
                details: format!("{} files survived format", remaining.len()),
            })
        }
    }

    /// Unmount and release the bus. Does nothing when already unmounted.
    pub async fn unmount(&mut self) {
        if !self.is_mounted() {
            debug!("Unmount requested while unmounted; ignoring");
            return;
        }

        if let Err(fault) = self.driver.unmount().await {
            warn!("Card unmount reported: {}", fault);
        }
        self.state = MountState::Unmounted;
        info!("Card unmounted");

        self.driver.free_bus().await;
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.state, MountState::Mounted(_))
    }

    pub fn state(&self) -> &MountState {
        &self.state
    }

    pub fn volume_info(&self) -> Option<&VolumeInfo> {
        match &self.state {
            MountState::Mounted(volume) => Some(volume),
            MountState::Unmounted => None,
        }
    }

    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// File operations on the mounted volume
    pub fn volume(&self) -> Result<&dyn BlockStorage, StorageError> {
        if self.is_mounted() {
            Ok(self.driver.as_ref())
        } else {
            Err(StorageError::NotMounted)
        }
    }
}
