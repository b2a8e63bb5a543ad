//! Store configuration consumed by the connection manager.
//!
//! # Responsibility
//! - Describe where the SQLite store lives and how long to wait on locks.
//! - Load overrides from process environment for callers that want it.
//!
//! # Invariants
//! - Defaults target local development only.
//! - Invalid environment values are reported, never silently replaced.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DB_PATH_ENV: &str = "GRATITUDE_DB_PATH";
pub const DB_BUSY_TIMEOUT_ENV: &str = "GRATITUDE_DB_BUSY_TIMEOUT_MS";

const DEFAULT_DB_FILE_NAME: &str = "gratitude.sqlite3";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const MEMORY_MARKER: &str = ":memory:";

/// Physical location of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

impl Display for DbLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str(MEMORY_MARKER),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database: DbLocation,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database: DbLocation::File(PathBuf::from(DEFAULT_DB_FILE_NAME)),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Empty { key: &'static str },
    InvalidNumber { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty { key } => write!(f, "`{key}` is set but empty"),
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be a non-negative integer, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

impl DbConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DbLocation::File(path.into()),
            ..Self::default()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database: DbLocation::Memory,
            ..Self::default()
        }
    }

    /// Builds a config from `GRATITUDE_DB_PATH` and
    /// `GRATITUDE_DB_BUSY_TIMEOUT_MS`, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(DB_PATH_ENV) {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Empty { key: DB_PATH_ENV });
            }
            config.database = if trimmed == MEMORY_MARKER {
                DbLocation::Memory
            } else {
                DbLocation::File(PathBuf::from(trimmed))
            };
        }

        if let Some(raw) = lookup(DB_BUSY_TIMEOUT_ENV) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    key: DB_BUSY_TIMEOUT_ENV,
                    value: raw.clone(),
                })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}
