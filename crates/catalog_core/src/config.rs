//! Host-supplied core configuration.
//!
//! Hosts either deserialize `CoreConfig` from their own settings or build it
//! from `CATALOG_*` environment variables.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DATABASE_PATH: &str = "CATALOG_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CATALOG_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CATALOG_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads unset-means-default values from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();
        Self {
            database_path: non_empty(ENV_DATABASE_PATH).map(PathBuf::from),
            log_level: non_empty(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: non_empty(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Starts file logging when a log directory is configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        match &self.log_dir {
            Some(dir) => init_logging(&self.log_level, dir).map(|()| true),
            None => Ok(false),
        }
    }

    /// Opens and migrates the configured database.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.database_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }
}
