/// Counters kept by the capture loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub iterations: u64,
    pub frames_saved: u64,
    pub write_failures: u64,
    pub acquire_failures: u64,
    pub consecutive_acquire_failures: u32,
    pub last_write_failed: bool,
    pub last_saved: Option<String>,
}

/// Health check result
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Health status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Warning,
    Unhealthy,
}

impl CaptureStats {
    /// Judge loop health. `unhealthy_after` consecutive acquire failures
    /// mark the peripheral as lost.
    pub fn health(&self, unhealthy_after: u32) -> HealthCheckResult {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if self.consecutive_acquire_failures >= unhealthy_after {
            issues.push(format!(
                "camera failed to deliver {} frames in a row",
                self.consecutive_acquire_failures
            ));
        } else if self.consecutive_acquire_failures > 0 {
            warnings.push(format!(
                "last {} frame acquisitions failed",
                self.consecutive_acquire_failures
            ));
        }

        if self.last_write_failed {
            warnings.push("last frame could not be written to storage".to_string());
        }

        let status = if !issues.is_empty() {
            HealthStatus::Unhealthy
        } else if !warnings.is_empty() {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResult {
            status,
            issues,
            warnings,
        }
    }
}
