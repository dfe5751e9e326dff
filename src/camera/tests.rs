use super::*;
use crate::config::CameraConfig;
use crate::error::{AcquireFailure, CameraError};

fn create_test_camera_config() -> CameraConfig {
    CameraConfig {
        fb_count: 2,
        acquire_timeout_ms: 100,
        ..CameraConfig::default()
    }
}

async fn ready_manager(sensor: &MockSensor) -> CameraManager {
    let mut camera = CameraManager::new(Box::new(sensor.clone()));
    camera
        .initialize(create_test_camera_config())
        .await
        .unwrap();
    camera
}

#[tokio::test]
async fn test_initialize_applies_tuning_in_order() {
    let sensor = MockSensor::new();
    let camera = ready_manager(&sensor).await;

    assert_eq!(camera.state(), CameraState::Ready);
    assert_eq!(sensor.configure_calls(), 1);

    let applied = sensor.applied();
    assert_eq!(applied.len(), SensorSetting::ALL.len());
    assert_eq!(applied[0], (SensorSetting::Brightness, 0));
    assert_eq!(applied[10], (SensorSetting::AecValue, 300));
    assert_eq!(applied[21], (SensorSetting::Colorbar, 0));
}

#[tokio::test]
async fn test_non_acknowledging_sensor_is_terminal() {
    let sensor = MockSensor::non_acknowledging();
    let mut camera = CameraManager::new(Box::new(sensor.clone()));

    let result = camera.initialize(create_test_camera_config()).await;
    assert!(matches!(result, Err(CameraError::Init { .. })));
    assert_eq!(camera.state(), CameraState::Failed);
    assert!(sensor.applied().is_empty());

    for _ in 0..3 {
        let acquired = camera.acquire().await;
        assert!(matches!(
            acquired,
            Err(CameraError::Acquire(AcquireFailure::Uninitialized))
        ));
    }
    assert_eq!(sensor.capture_calls(), 0);

    // No way back without a new manager
    let retry = camera.initialize(create_test_camera_config()).await;
    assert!(matches!(retry, Err(CameraError::Init { .. })));
    assert_eq!(sensor.configure_calls(), 1);
}

#[tokio::test]
async fn test_acquire_before_initialize_fails_fast() {
    let sensor = MockSensor::with_frames(vec![vec![1, 2, 3]]);
    let mut camera = CameraManager::new(Box::new(sensor.clone()));

    assert!(matches!(
        camera.acquire().await,
        Err(CameraError::Acquire(AcquireFailure::Uninitialized))
    ));
    assert_eq!(sensor.capture_calls(), 0);
    assert!(camera.pool_stats().is_none());
}

#[tokio::test]
async fn test_invalid_tuning_is_rejected_before_hardware() {
    let sensor = MockSensor::new();
    let mut camera = CameraManager::new(Box::new(sensor.clone()));

    let mut config = create_test_camera_config();
    config.tuning.brightness = 3;

    let result = camera.initialize(config).await;
    assert!(matches!(
        result,
        Err(CameraError::InvalidSetting {
            setting: "brightness",
            value: 3,
            ..
        })
    ));
    assert_eq!(sensor.configure_calls(), 0);
    assert_eq!(camera.state(), CameraState::Uninitialized);
}

#[tokio::test]
async fn test_rejected_setting_does_not_abort_initialize() {
    let sensor = MockSensor::new();
    sensor.reject_setting(SensorSetting::Aec2);
    let camera = ready_manager(&sensor).await;

    assert_eq!(camera.state(), CameraState::Ready);
    assert_eq!(sensor.applied().len(), SensorSetting::ALL.len() - 1);
}

#[tokio::test]
async fn test_acquire_release_accounting() {
    let sensor = MockSensor::with_frames(vec![vec![0x11; 4], vec![0x22; 6]]);
    let mut camera = ready_manager(&sensor).await;

    let first = camera.acquire().await.unwrap();
    assert_eq!(first.data(), &[0x11; 4]);
    assert_eq!(first.sequence(), 0);
    assert_eq!(camera.pool_stats().unwrap().outstanding, 1);
    camera.release(first).unwrap();

    let second = camera.acquire().await.unwrap();
    assert_eq!(second.len(), 6);
    assert_eq!(second.sequence(), 1);
    camera.release(second).unwrap();

    let stats = camera.pool_stats().unwrap();
    assert_eq!(stats.acquired, 2);
    assert_eq!(stats.released, 2);
    assert_eq!(stats.outstanding, 0);
}

#[tokio::test]
async fn test_exhausted_pool_reports_busy() {
    let sensor = MockSensor::with_frames(vec![vec![1], vec![2], vec![3]]);
    let mut camera = ready_manager(&sensor).await;

    let a = camera.acquire().await.unwrap();
    let b = camera.acquire().await.unwrap();
    assert!(matches!(
        camera.acquire().await,
        Err(CameraError::Acquire(AcquireFailure::Busy))
    ));
    assert_eq!(sensor.capture_calls(), 2);

    camera.release(a).unwrap();
    let c = camera.acquire().await.unwrap();
    assert_eq!(c.data(), &[3]);

    camera.release(b).unwrap();
    camera.release(c).unwrap();
}

#[tokio::test]
async fn test_failed_acquire_leaves_nothing_checked_out() {
    let sensor = MockSensor::new();
    sensor.push_fault("sensor stalled");
    sensor.push_frame(Vec::new());
    let mut camera = ready_manager(&sensor).await;

    assert!(matches!(
        camera.acquire().await,
        Err(CameraError::Acquire(AcquireFailure::Driver(_)))
    ));
    assert!(matches!(
        camera.acquire().await,
        Err(CameraError::Acquire(AcquireFailure::Driver(_)))
    ));

    let stats = camera.pool_stats().unwrap();
    assert_eq!(stats.outstanding, 0);
    assert_eq!(stats.acquired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_times_out() {
    let sensor = MockSensor::new();
    sensor.push_hang();
    let mut camera = ready_manager(&sensor).await;

    let result = camera.acquire().await;
    assert!(matches!(
        result,
        Err(CameraError::Acquire(AcquireFailure::Timeout { timeout_ms: 100 }))
    ));
    assert_eq!(camera.pool_stats().unwrap().outstanding, 0);
}

#[tokio::test]
async fn test_second_initialize_is_rejected() {
    let sensor = MockSensor::new();
    let mut camera = ready_manager(&sensor).await;

    let result = camera.initialize(create_test_camera_config()).await;
    assert!(matches!(result, Err(CameraError::Init { .. })));
    assert_eq!(camera.state(), CameraState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_simulated_sensor_through_manager() {
    let mut camera = CameraManager::new(Box::new(SimulatedSensor::new()));
    let mut config = create_test_camera_config();
    config.frame_size = crate::frame::FrameSize::Qvga;
    camera.initialize(config).await.unwrap();

    let frame = camera.acquire().await.unwrap();
    assert_eq!(&frame.data()[..2], &[0xFF, 0xD8]);
    assert_eq!(frame.info().width, 320);
    camera.release(frame).unwrap();
}
