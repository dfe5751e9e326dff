use super::*;
use crate::camera::{CaptureBuffer, FrameInfo, FramePool};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::frame::PixelFormat;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

fn create_test_storage_config() -> StorageConfig {
    StorageConfig {
        mount_point: "/sd".to_string(),
        ..StorageConfig::default()
    }
}

fn create_test_frame(data: &[u8]) -> CaptureBuffer {
    let pool = FramePool::new(1, data.len());
    let (slot, mut buf) = pool.checkout().unwrap();
    buf.extend_from_slice(data);
    pool.commit(
        slot,
        buf,
        FrameInfo {
            sequence: 0,
            width: 1600,
            height: 1200,
            format: PixelFormat::Jpeg,
            timestamp: SystemTime::now(),
        },
    )
}

fn manager_with(storage: &MockStorage, config: &StorageConfig) -> StorageMountManager {
    StorageMountManager::new(Box::new(storage.clone()), config)
}

fn writer_for(manager: StorageMountManager) -> (Arc<RwLock<StorageMountManager>>, FrameWriter) {
    let shared = Arc::new(RwLock::new(manager));
    let writer = FrameWriter::new(
        Arc::clone(&shared),
        FilenameSequencer::new("/sd", PixelFormat::Jpeg),
    );
    (shared, writer)
}

#[tokio::test]
async fn test_mount_and_unmount() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    assert!(!manager.is_mounted());
    manager.mount().await.unwrap();
    assert!(manager.is_mounted());
    assert!(storage.is_bus_up());
    assert_eq!(manager.volume_info().unwrap().bus_speed_khz, 20_000);

    manager.unmount().await;
    assert!(!manager.is_mounted());
    assert!(!storage.is_bus_up());
    assert_eq!(manager.state(), &MountState::Unmounted);
}

#[tokio::test]
async fn test_unmount_while_unmounted_is_noop() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    manager.unmount().await;
    manager.unmount().await;
    assert_eq!(storage.free_bus_calls(), 0);
}

#[tokio::test]
async fn test_second_mount_is_noop() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    manager.mount().await.unwrap();
    manager.mount().await.unwrap();
    assert_eq!(storage.mount_calls(), 1);
}

#[tokio::test]
async fn test_bus_init_failure() {
    let storage = MockStorage::new();
    storage.fail_bus();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    let result = manager.mount().await;
    assert!(matches!(result, Err(StorageError::BusInit { .. })));
    assert_eq!(storage.mount_calls(), 0);
    assert!(!manager.is_mounted());
}

#[tokio::test]
async fn test_unformatted_card_without_auto_format() {
    let storage = MockStorage::unformatted();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    let result = manager.mount().await;
    assert!(matches!(result, Err(StorageError::Mount { .. })));
    assert_eq!(storage.format_calls(), 0);
    assert_eq!(storage.mount_calls(), 1);
    assert!(!storage.is_bus_up());
    assert!(!manager.is_mounted());
}

#[tokio::test]
async fn test_auto_format_retries_mount_once() {
    let storage = MockStorage::unformatted();
    let mut config = create_test_storage_config();
    config.format_if_mount_failed = true;
    let mut manager = manager_with(&storage, &config);

    manager.mount().await.unwrap();
    assert!(manager.is_mounted());
    assert_eq!(storage.format_calls(), 1);
    assert_eq!(storage.mount_calls(), 2);
}

#[tokio::test]
async fn test_auto_format_gives_up_after_retry() {
    let storage = MockStorage::new();
    storage.fail_card();
    let mut config = create_test_storage_config();
    config.format_if_mount_failed = true;
    let mut manager = manager_with(&storage, &config);

    let result = manager.mount().await;
    assert!(matches!(result, Err(StorageError::Mount { .. })));
    assert_eq!(storage.mount_calls(), 2);
    assert!(!manager.is_mounted());
}

#[tokio::test]
async fn test_format_failure_propagates_mount_error() {
    let storage = MockStorage::unformatted();
    storage.fail_format();
    let mut config = create_test_storage_config();
    config.format_if_mount_failed = true;
    let mut manager = manager_with(&storage, &config);

    assert!(matches!(
        manager.mount().await,
        Err(StorageError::Mount { .. })
    ));
    assert_eq!(storage.mount_calls(), 1);
}

#[tokio::test]
async fn test_format_on_mount_wipes_card() {
    let storage = MockStorage::new();
    storage.insert_file("/sd/0_img.jpg", &[1, 2, 3]);
    let mut config = create_test_storage_config();
    config.format_on_mount = true;
    let mut manager = manager_with(&storage, &config);

    manager.mount().await.unwrap();
    assert!(storage.file_names().is_empty());
    assert_eq!(manager.volume_info().unwrap().file_count, 0);
}

#[tokio::test]
async fn test_failed_format_on_mount_leaves_card_unmounted() {
    let storage = MockStorage::new();
    storage.fail_format();
    let mut config = create_test_storage_config();
    config.format_on_mount = true;
    let mut manager = manager_with(&storage, &config);

    assert!(matches!(
        manager.mount().await,
        Err(StorageError::Mount { .. })
    ));
    assert!(!manager.is_mounted());
    assert!(manager.volume_info().is_none());
    assert!(matches!(manager.volume(), Err(StorageError::NotMounted)));
    assert!(!storage.is_bus_up());
    assert_eq!(storage.free_bus_calls(), 1);
}

#[tokio::test]
async fn test_format_requires_mount() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());

    assert!(matches!(
        manager.format().await,
        Err(StorageError::NotMounted)
    ));
    assert_eq!(storage.format_calls(), 0);
}

#[tokio::test]
async fn test_write_while_unmounted_touches_nothing() {
    let storage = MockStorage::new();
    let (_shared, mut writer) = writer_for(manager_with(&storage, &create_test_storage_config()));
    let frame = create_test_frame(&[0xAA; 10]);

    let result = writer.write(&frame).await;
    assert!(matches!(result, Err(StorageError::NotMounted)));
    assert_eq!(storage.file_calls(), 0);
    assert_eq!(writer.next_index(), 0);
}

#[tokio::test]
async fn test_write_round_trip() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());
    manager.mount().await.unwrap();
    let (shared, mut writer) = writer_for(manager);

    let payload: Vec<u8> = (0..=255u8).collect();
    let frame = create_test_frame(&payload);

    let name = writer.write(&frame).await.unwrap();
    assert_eq!(name, "/sd/0_img.jpg");

    let guard = shared.read().await;
    let read_back = guard.volume().unwrap().read_file(&name).await.unwrap();
    assert_eq!(read_back, payload);
    assert_eq!(storage.file_names(), vec!["/sd/0_img.jpg".to_string()]);
}

#[tokio::test]
async fn test_failed_write_leaves_no_partial_file() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());
    manager.mount().await.unwrap();
    let (_shared, mut writer) = writer_for(manager);

    storage.fail_writes(true);
    let result = writer.write(&create_test_frame(&[0xBB; 10])).await;
    match result {
        Err(StorageError::Io { path, .. }) => assert_eq!(path, "/sd/0_img.jpg"),
        other => panic!("Expected Io error, got {:?}", other),
    }
    assert!(storage.file_names().is_empty());

    // The attempt still consumed its name
    storage.fail_writes(false);
    let name = writer.write(&create_test_frame(&[0xCC; 10])).await.unwrap();
    assert_eq!(name, "/sd/1_img.jpg");
}

#[tokio::test]
async fn test_failed_rename_cleans_up() {
    let storage = MockStorage::new();
    let mut manager = manager_with(&storage, &create_test_storage_config());
    manager.mount().await.unwrap();
    let (_shared, mut writer) = writer_for(manager);

    storage.fail_renames(true);
    assert!(writer.write(&create_test_frame(&[1; 4])).await.is_err());
    assert!(storage.file_names().is_empty());
}

#[tokio::test]
async fn test_directory_card_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_storage_config();
    config.card_path = dir.path().to_string_lossy().to_string();

    // A fresh directory holds no filesystem
    let mut manager =
        StorageMountManager::new(Box::new(DirectoryCard::from_config(&config)), &config);
    assert!(matches!(
        manager.mount().await,
        Err(StorageError::Mount { .. })
    ));

    config.format_if_mount_failed = true;
    let mut manager =
        StorageMountManager::new(Box::new(DirectoryCard::from_config(&config)), &config);
    manager.mount().await.unwrap();
    assert!(dir.path().join(VOLUME_LABEL_FILE).exists());

    let (shared, mut writer) = writer_for(manager);
    let name = writer.write(&create_test_frame(&[0xAA; 10])).await.unwrap();
    assert_eq!(name, "/sd/0_img.jpg");
    assert_eq!(
        std::fs::read(dir.path().join("0_img.jpg")).unwrap(),
        vec![0xAA; 10]
    );
    assert!(!dir.path().join("0_img.jpg.tmp").exists());

    {
        let guard = shared.read().await;
        let files = guard.volume().unwrap().list_files().await.unwrap();
        assert_eq!(files, vec!["/sd/0_img.jpg".to_string()]);
    }

    shared.write().await.unmount().await;
    assert!(matches!(
        writer.write(&create_test_frame(&[1])).await,
        Err(StorageError::NotMounted)
    ));

    // Remount sees the existing volume and its file
    shared.write().await.mount().await.unwrap();
    assert_eq!(shared.read().await.volume_info().unwrap().file_count, 1);
}

#[tokio::test]
async fn test_directory_card_missing_is_bus_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_storage_config();
    config.card_path = dir.path().join("absent").to_string_lossy().to_string();

    let mut manager =
        StorageMountManager::new(Box::new(DirectoryCard::from_config(&config)), &config);
    assert!(matches!(
        manager.mount().await,
        Err(StorageError::BusInit { .. })
    ));
}

#[tokio::test]
async fn test_directory_card_rejects_paths_outside_mount() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_storage_config();
    config.card_path = dir.path().to_string_lossy().to_string();
    config.format_if_mount_failed = true;

    let mut card = DirectoryCard::from_config(&config);
    card.init_bus().await.unwrap();
    card.format().await.unwrap();
    card.mount("/sd").await.unwrap();

    assert!(card.write_file("/other/0_img.jpg", &[1]).await.is_err());
    assert!(card.write_file("/sd/../escape", &[1]).await.is_err());
    assert!(card
        .write_file(&format!("/sd/{}", VOLUME_LABEL_FILE), &[1])
        .await
        .is_err());
    assert!(card.write_file("/sd/ok.jpg", &[1]).await.is_ok());
}

#[tokio::test]
async fn test_directory_card_invalid_pins() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_storage_config();
    config.pins.cs = config.pins.mosi;

    let mut card = DirectoryCard::new(dir.path(), &config);
    assert_eq!(card.root(), dir.path());
    assert!(card.init_bus().await.is_err());
}
