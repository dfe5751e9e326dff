use super::driver::{BlockStorage, MountFault, VolumeInfo};
use crate::error::DriverFault;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MockStorageState {
    files: BTreeMap<String, Vec<u8>>,
    formatted: bool,
    bus_fault: bool,
    card_fault: bool,
    format_fault: bool,
    write_fault: bool,
    rename_fault: bool,
    bus_up: bool,
    mounted: bool,
    mount_calls: usize,
    format_calls: usize,
    free_bus_calls: usize,
    file_calls: usize,
}

/// In-memory card for testing without hardware. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockStorage {
    state: Arc<Mutex<MockStorageState>>,
}

impl MockStorage {
    /// A formatted, healthy card
    pub fn new() -> Self {
        let storage = Self::default();
        storage.state.lock().formatted = true;
        storage
    }

    /// A card without a filesystem
    pub fn unformatted() -> Self {
        Self::default()
    }

    pub fn fail_bus(&self) {
        self.state.lock().bus_fault = true;
    }

    /// Card never initializes, even after a format
    pub fn fail_card(&self) {
        self.state.lock().card_fault = true;
    }

    pub fn fail_format(&self) {
        self.state.lock().format_fault = true;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().write_fault = fail;
    }

    pub fn fail_renames(&self, fail: bool) {
        self.state.lock().rename_fault = fail;
    }

    pub fn insert_file(&self, path: &str, data: &[u8]) {
        self.state.lock().files.insert(path.to_string(), data.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.state.lock().files.keys().cloned().collect()
    }

    pub fn is_bus_up(&self) -> bool {
        self.state.lock().bus_up
    }

    pub fn mount_calls(&self) -> usize {
        self.state.lock().mount_calls
    }

    pub fn format_calls(&self) -> usize {
        self.state.lock().format_calls
    }

    pub fn free_bus_calls(&self) -> usize {
        self.state.lock().free_bus_calls
    }

    /// Number of file-level operations (write, rename, remove, read, list)
    pub fn file_calls(&self) -> usize {
        self.state.lock().file_calls
    }

    fn file_op(&self) -> io::Result<parking_lot::MutexGuard<'_, MockStorageState>> {
        let mut state = self.state.lock();
        state.file_calls += 1;
        if state.mounted {
            Ok(state)
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "volume is not mounted"))
        }
    }
}

#[async_trait]
impl BlockStorage for MockStorage {
    async fn init_bus(&mut self) -> Result<(), DriverFault> {
        let mut state = self.state.lock();
        if state.bus_fault {
            return Err(DriverFault::new("spi bus init failed"));
        }
        state.bus_up = true;
        Ok(())
    }

    async fn free_bus(&mut self) {
        let mut state = self.state.lock();
        state.bus_up = false;
        state.free_bus_calls += 1;
    }

    async fn mount(&mut self, mount_point: &str) -> Result<VolumeInfo, MountFault> {
        let mut state = self.state.lock();
        state.mount_calls += 1;
        if state.card_fault {
            return Err(MountFault::Card("card did not respond".to_string()));
        }
        if !state.formatted {
            return Err(MountFault::NoFilesystem("no FAT found".to_string()));
        }
        state.mounted = true;
        Ok(VolumeInfo {
            name: format!("MOCK{}", mount_point.replace('/', "_")),
            used_bytes: state.files.values().map(|data| data.len() as u64).sum(),
            file_count: state.files.len(),
            allocation_unit_size: 32 * 1024,
            bus_speed_khz: 20_000,
            mounted_at: Utc::now(),
        })
    }

    async fn unmount(&mut self) -> Result<(), DriverFault> {
        self.state.lock().mounted = false;
        Ok(())
    }

    async fn format(&mut self) -> Result<(), DriverFault> {
        let mut state = self.state.lock();
        state.format_calls += 1;
        if state.format_fault {
            return Err(DriverFault::new("format failed"));
        }
        state.files.clear();
        state.formatted = true;
        Ok(())
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> io::Result<()> {
        let mut state = self.file_op()?;
        if state.write_fault {
            // Leave a truncated file behind, like a card pulled mid-write
            state
                .files
                .insert(path.to_string(), data[..data.len() / 2].to_vec());
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        state.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut state = self.file_op()?;
        if state.rename_fault {
            return Err(io::Error::new(io::ErrorKind::Other, "rename failed"));
        }
        let data = state
            .files
            .remove(from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, from.to_string()))?;
        state.files.insert(to.to_string(), data);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> io::Result<()> {
        let mut state = self.file_op()?;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    async fn read_file(&self, path: &str) -> io::Result<Vec<u8>> {
        let state = self.file_op()?;
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }

    async fn list_files(&self) -> io::Result<Vec<String>> {
        let state = self.file_op()?;
        Ok(state.files.keys().cloned().collect())
    }
}
