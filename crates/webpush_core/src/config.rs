//! Store and sweep configuration.
//!
//! # Invariants
//! - A validated `SweepConfig` has `0 < warning_after < expire_after`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const DEFAULT_WARNING_AFTER_SECS: u64 = 55 * SECS_PER_DAY;
const DEFAULT_EXPIRE_AFTER_SECS: u64 = 60 * SECS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    ZeroDuration(&'static str),
    WarningNotBeforeExpiry {
        warning_after_secs: u64,
        expire_after_secs: u64,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::ZeroDuration(field) => write!(f, "{field} must be greater than zero"),
            Self::WarningNotBeforeExpiry {
                warning_after_secs,
                expire_after_secs,
            } => write!(
                f,
                "warning_after_secs ({warning_after_secs}) must be less than expire_after_secs ({expire_after_secs})"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Ages at which subscriptions are warned and expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub warning_after_secs: u64,
    pub expire_after_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            warning_after_secs: DEFAULT_WARNING_AFTER_SECS,
            expire_after_secs: DEFAULT_EXPIRE_AFTER_SECS,
        }
    }
}

impl SweepConfig {
    pub fn warning_duration(&self) -> Duration {
        Duration::from_secs(self.warning_after_secs)
    }

    pub fn expiry_duration(&self) -> Duration {
        Duration::from_secs(self.expire_after_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warning_after_secs == 0 {
            return Err(ConfigError::ZeroDuration("warning_after_secs"));
        }
        if self.expire_after_secs == 0 {
            return Err(ConfigError::ZeroDuration("expire_after_secs"));
        }
        if self.warning_after_secs >= self.expire_after_secs {
            return Err(ConfigError::WarningNotBeforeExpiry {
                warning_after_secs: self.warning_after_secs,
                expire_after_secs: self.expire_after_secs,
            });
        }
        Ok(())
    }
}

/// Location of the store plus its sweep policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            sweep: SweepConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        self.sweep.validate()
    }
}
