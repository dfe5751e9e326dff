use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdcamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures of the removable storage volume and file writes
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to initialize bus: {details}")]
    BusInit { details: String },

    #[error("Failed to mount filesystem: {details}")]
    Mount { details: String },

    #[error("Storage volume is not mounted")]
    NotMounted,

    #[error("I/O failure on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the capture peripheral
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera configured unsuccessful: {details}")]
    Init { details: String },

    #[error("Frame acquire failed: {0}")]
    Acquire(AcquireFailure),

    #[error("Frame buffer slot {slot} released twice")]
    DoubleRelease { slot: usize },

    #[error("Sensor setting {setting} = {value} outside {min}..={max}")]
    InvalidSetting {
        setting: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquireFailure {
    #[error("camera is not initialized")]
    Uninitialized,

    #[error("all frame buffers are in use")]
    Busy,

    #[error("no frame within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("driver fault: {0}")]
    Driver(String),
}

/// Raw failure reported by a peripheral driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DriverFault(pub String);

impl DriverFault {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

impl SdcamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

impl StorageError {
    pub fn io<P: Into<String>>(path: P, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<AcquireFailure> for CameraError {
    fn from(failure: AcquireFailure) -> Self {
        CameraError::Acquire(failure)
    }
}

pub type Result<T> = std::result::Result<T, SdcamError>;
