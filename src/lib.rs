pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod frame;
pub mod storage;

pub use app::{SdcamOrchestrator, ShutdownReason};
pub use camera::{CameraManager, CameraState, CaptureBuffer, SensorDriver, SimulatedSensor};
pub use capture::{CaptureLoop, CaptureMonitor, CaptureStats, HealthStatus, IterationOutcome};
pub use config::SdcamConfig;
pub use error::{CameraError, Result, SdcamError, StorageError};
pub use frame::{FrameSize, PixelFormat};
pub use storage::{BlockStorage, DirectoryCard, FilenameSequencer, FrameWriter, StorageMountManager};
