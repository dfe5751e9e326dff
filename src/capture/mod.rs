mod health;
mod task;

pub use health::{CaptureStats, HealthCheckResult, HealthStatus};
pub use task::{CaptureLoop, CaptureMonitor, IterationOutcome};
