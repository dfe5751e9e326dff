use crate::error::DriverFault;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;

/// Properties of a mounted card, reported for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub name: String,
    pub used_bytes: u64,
    pub file_count: usize,
    pub allocation_unit_size: u32,
    pub bus_speed_khz: u32,
    pub mounted_at: DateTime<Utc>,
}

/// Why a mount attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountFault {
    /// The card answered but holds no usable filesystem
    NoFilesystem(String),
    /// The card did not initialize
    Card(String),
}

impl std::fmt::Display for MountFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MountFault::NoFilesystem(details) => write!(f, "no filesystem: {}", details),
            MountFault::Card(details) => write!(f, "card init failed: {}", details),
        }
    }
}

/// Capability interface of the bus, card and FAT driver stack.
/// Paths passed to file operations are absolute under the mount point.
#[async_trait]
pub trait BlockStorage: Send + Sync {
    async fn init_bus(&mut self) -> Result<(), DriverFault>;

    async fn free_bus(&mut self);

    async fn mount(&mut self, mount_point: &str) -> Result<VolumeInfo, MountFault>;

    async fn unmount(&mut self) -> Result<(), DriverFault>;

    /// Lay down a fresh, empty filesystem
    async fn format(&mut self) -> Result<(), DriverFault>;

    async fn write_file(&self, path: &str, data: &[u8]) -> io::Result<()>;

    async fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    async fn remove_file(&self, path: &str) -> io::Result<()>;

    async fn read_file(&self, path: &str) -> io::Result<Vec<u8>>;

    async fn list_files(&self) -> io::Result<Vec<String>>;
}
