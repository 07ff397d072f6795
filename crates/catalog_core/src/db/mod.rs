//! SQLite storage bootstrap for the catalog user tables.
//!
//! # Responsibility
//! - Open and configure SQLite connections handed to repositories.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Repositories must not read catalog tables before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage-layer failure, passed through to callers unmodified.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A catalog migration script failed; nothing from the batch was kept.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "catalog migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
