//! Validated service and synchronization settings.

#![allow(missing_docs)]

use std::time::Duration;

use smol_str::SmolStr;

use crate::error::SwordfishError;

/// Shortest allowed polling interval, in seconds.
pub const MIN_POLL_INTERVAL_SECS: u64 = 60;
/// Lowest coverage threshold accepted for balancing.
pub const MIN_THRESHOLD: u32 = 20;
pub const DEFAULT_THRESHOLD: u32 = 50;
pub const DEFAULT_MIN_DIFF: f64 = 0.5;
pub const DEFAULT_PLOIDY: u32 = 2;
pub const DEFAULT_READS_PER_BIN: u32 = 100;

/// Where minoTour lives and how to authenticate.
#[derive(Clone)]
pub struct ServiceSettings {
    pub host: SmolStr,
    pub port: u16,
    pub token: SmolStr,
}

impl std::fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl ServiceSettings {
    pub fn new(host: &str, port: u16, token: &str) -> Result<Self, SwordfishError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(SwordfishError::InvalidConfig("minoTour host is empty".into()));
        }
        let token = token.trim();
        if token.is_empty() {
            return Err(SwordfishError::InvalidConfig(
                "minoTour access token is required".into(),
            ));
        }
        Ok(Self {
            host: host.into(),
            port,
            token: token.into(),
        })
    }

    /// Port 443 means HTTPS without an explicit port.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.port == 443 {
            format!("https://{}/api/v1", self.host)
        } else {
            format!("http://{}:{}/api/v1", self.host, self.port)
        }
    }
}

/// Experiment mode, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExperimentMode {
    /// Coverage balancing: unblock a barcode's amplicons past `threshold`x.
    Balance { threshold: u32 },
    /// Breakpoint detection on a CNV job.
    Breakpoints {
        min_diff: f64,
        ploidy: u32,
        reads_per_bin: u32,
    },
}

impl ExperimentMode {
    pub fn balance(threshold: u32) -> Result<Self, SwordfishError> {
        if threshold < MIN_THRESHOLD {
            return Err(SwordfishError::InvalidConfig(
                format!("threshold {threshold} is below the minimum of {MIN_THRESHOLD}").into(),
            ));
        }
        Ok(Self::Balance { threshold })
    }

    pub fn breakpoints(
        min_diff: f64,
        ploidy: u32,
        reads_per_bin: u32,
    ) -> Result<Self, SwordfishError> {
        if !min_diff.is_finite() || min_diff <= 0.0 {
            return Err(SwordfishError::InvalidConfig(
                format!("min_diff must be a positive number, got {min_diff}").into(),
            ));
        }
        if ploidy == 0 {
            return Err(SwordfishError::InvalidConfig("ploidy must be at least 1".into()));
        }
        if reads_per_bin == 0 {
            return Err(SwordfishError::InvalidConfig(
                "reads_per_bin must be at least 1".into(),
            ));
        }
        Ok(Self::Breakpoints {
            min_diff,
            ploidy,
            reads_per_bin,
        })
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Balance { .. } => "balance",
            Self::Breakpoints { .. } => "breakpoints",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub interval: Duration,
    pub mode: ExperimentMode,
}

impl SyncSettings {
    pub fn new(interval_secs: u64, mode: ExperimentMode) -> Result<Self, SwordfishError> {
        if interval_secs < MIN_POLL_INTERVAL_SECS {
            return Err(SwordfishError::InvalidConfig(
                format!(
                    "polling interval {interval_secs}s is below the minimum of {MIN_POLL_INTERVAL_SECS}s"
                )
                .into(),
            ));
        }
        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            mode,
        })
    }
}
