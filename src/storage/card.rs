use super::driver::{BlockStorage, MountFault, VolumeInfo};
use crate::config::{SpiPins, StorageConfig};
use crate::error::DriverFault;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File marking a directory as a formatted volume
pub const VOLUME_LABEL_FILE: &str = ".sdcam-volume";

#[derive(Debug, Serialize, Deserialize)]
struct VolumeLabel {
    name: String,
    allocation_unit_size: u32,
    formatted_at: DateTime<Utc>,
}

/// Host card emulation: a directory stands in for the card, and the label
/// file stands in for the FAT boot sector.
pub struct DirectoryCard {
    root: PathBuf,
    pins: SpiPins,
    max_freq_khz: u32,
    allocation_unit_size: u32,
    bus_ready: bool,
    mount_point: Option<String>,
}

impl DirectoryCard {
    pub fn new<P: Into<PathBuf>>(root: P, config: &StorageConfig) -> Self {
        Self {
            root: root.into(),
            pins: config.pins.clone(),
            max_freq_khz: config.max_freq_khz,
            allocation_unit_size: config.allocation_unit_size,
            bus_ready: false,
            mount_point: None,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.card_path, config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pins_valid(&self) -> bool {
        let pins = [self.pins.mosi, self.pins.miso, self.pins.sclk, self.pins.cs];
        pins.iter().all(|pin| *pin >= 0)
            && pins
                .iter()
                .enumerate()
                .all(|(i, pin)| !pins[i + 1..].contains(pin))
    }

    /// Map `<mount_point>/<name>` onto the backing directory
    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let mount_point = self.mount_point.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "volume is not mounted")
        })?;

        let name = path
            .strip_prefix(mount_point)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is outside {}", path, mount_point),
                )
            })?;

        if name.is_empty() || name.contains('/') || name == ".." || name == VOLUME_LABEL_FILE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid file name {:?}", name),
            ));
        }

        Ok(self.root.join(name))
    }

    async fn read_label(&self) -> Result<VolumeLabel, MountFault> {
        let raw = fs::read_to_string(self.root.join(VOLUME_LABEL_FILE))
            .await
            .map_err(|e| MountFault::NoFilesystem(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| MountFault::NoFilesystem(e.to_string()))
    }

    async fn usage(&self) -> io::Result<(u64, usize)> {
        let mut used = 0;
        let mut count = 0;
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == VOLUME_LABEL_FILE {
                continue;
            }
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                used += metadata.len();
                count += 1;
            }
        }
        Ok((used, count))
    }
}

#[async_trait]
impl BlockStorage for DirectoryCard {
    async fn init_bus(&mut self) -> Result<(), DriverFault> {
        if !self.pins_valid() {
            return Err(DriverFault::new(format!(
                "invalid SPI pin assignment {:?}",
                self.pins
            )));
        }

        match fs::metadata(&self.root).await {
            Ok(metadata) if metadata.is_dir() => {}
            _ => {
                return Err(DriverFault::new(format!(
                    "no card present at {}",
                    self.root.display()
                )))
            }
        }

        debug!(
            "SPI bus up (mosi {}, miso {}, sclk {}, cs {}) at {} kHz",
            self.pins.mosi, self.pins.miso, self.pins.sclk, self.pins.cs, self.max_freq_khz
        );
        self.bus_ready = true;
        Ok(())
    }

    async fn free_bus(&mut self) {
        self.bus_ready = false;
        debug!("SPI bus released");
    }

    async fn mount(&mut self, mount_point: &str) -> Result<VolumeInfo, MountFault> {
        if !self.bus_ready {
            return Err(MountFault::Card("bus is not initialized".to_string()));
        }

        let label = self.read_label().await?;
        let (used_bytes, file_count) = self
            .usage()
            .await
            .map_err(|e| MountFault::Card(e.to_string()))?;

        self.mount_point = Some(mount_point.to_string());

        Ok(VolumeInfo {
            name: label.name,
            used_bytes,
            file_count,
            allocation_unit_size: label.allocation_unit_size,
            bus_speed_khz: self.max_freq_khz,
            mounted_at: Utc::now(),
        })
    }

    async fn unmount(&mut self) -> Result<(), DriverFault> {
        if self.mount_point.take().is_none() {
            return Err(DriverFault::new("volume is not mounted"));
        }
        Ok(())
    }

    async fn format(&mut self) -> Result<(), DriverFault> {
        if !self.bus_ready {
            return Err(DriverFault::new("bus is not initialized"));
        }

        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| DriverFault::new(e.to_string()))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DriverFault::new(e.to_string()))?
        {
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };
            removed.map_err(|e| DriverFault::new(format!("{}: {}", path.display(), e)))?;
        }

        let label = VolumeLabel {
            name: "SDCAM".to_string(),
            allocation_unit_size: self.allocation_unit_size,
            formatted_at: Utc::now(),
        };
        let rendered = toml::to_string(&label).map_err(|e| DriverFault::new(e.to_string()))?;
        fs::write(self.root.join(VOLUME_LABEL_FILE), rendered)
            .await
            .map_err(|e| DriverFault::new(e.to_string()))?;

        info!(
            "Formatted card at {} ({} byte allocation units)",
            self.root.display(),
            self.allocation_unit_size
        );
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> io::Result<()> {
        fs::write(self.resolve(path)?, data).await
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.resolve(from)?, self.resolve(to)?).await
    }

    async fn remove_file(&self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?).await
    }

    async fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?).await
    }

    async fn list_files(&self) -> io::Result<Vec<String>> {
        let mount_point = self.mount_point.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "volume is not mounted")
        })?;

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name != VOLUME_LABEL_FILE && entry.metadata().await?.is_file() {
                names.push(format!("{}/{}", mount_point, name));
            }
        }
        names.sort();
        Ok(names)
    }
}
