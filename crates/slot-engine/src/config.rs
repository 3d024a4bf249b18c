//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! [grid]
//! window_days = 14
//!
//! [dispatch]
//! cadence_secs = 60
//! tolerance_secs = 60
//! publish_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Every section and field is optional; missing values take the defaults above.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::grid::DEFAULT_WINDOW_DAYS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScheduleError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| ScheduleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.window_days == 0 {
            return Err(ScheduleError::Config(
                "grid.window_days must be > 0".to_string(),
            ));
        }
        if self.dispatch.cadence_secs == 0 {
            return Err(ScheduleError::Config(
                "dispatch.cadence_secs must be > 0".to_string(),
            ));
        }
        if self.dispatch.publish_timeout_secs == 0 {
            return Err(ScheduleError::Config(
                "dispatch.publish_timeout_secs must be > 0".to_string(),
            ));
        }
        // Keeps the due window within half a day of local now.
        if self.dispatch.tolerance_secs >= 43_200 {
            return Err(ScheduleError::Config(
                "dispatch.tolerance_secs must be below 43200".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ScheduleError::Config(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Slot grid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of days shown, starting today.
    pub window_days: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Automated dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Seconds between dispatch cycles.
    pub cadence_secs: u64,
    /// Half-width of the due window around local now.
    pub tolerance_secs: u64,
    /// Deadline for a single publish call.
    pub publish_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cadence_secs: 60,
            tolerance_secs: 60,
            publish_timeout_secs: 30,
        }
    }
}

impl DispatchConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }

    pub fn tolerance(&self) -> chrono::Duration {
        i64::try_from(self.tolerance_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    /// How long a dispatch claim holds a post before another attempt may take it over.
    pub fn claim_lease(&self) -> chrono::Duration {
        let secs = self.publish_timeout_secs.saturating_add(self.cadence_secs);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Logging configuration, consumed by binaries when installing a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"slot_engine=debug"`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
