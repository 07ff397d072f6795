//! Catalog schema migrations.
//!
//! # Invariants
//! - `version` values are strictly increasing and never renumbered.
//! - `PRAGMA user_version` holds the last applied version.
//! - Pending migrations run in one transaction; a failing script leaves the
//!   schema at the version it started from.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, Transaction};

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users_groups_metadata",
        sql: include_str!("0001_users_groups_metadata.sql"),
    },
    Migration {
        version: 2,
        name: "lookup_indexes",
        sql: include_str!("0002_lookup_indexes.sql"),
    },
];

/// Returns the latest catalog schema version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the catalog schema on `conn` up to [`latest_version`].
///
/// Fails with `UnsupportedSchemaVersion` for databases written by a newer
/// binary, and with `Migration` naming the first script that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from_version)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in pending {
        if let Err(source) = run_migration(&tx, migration) {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={}",
                migration.version, migration.name, source
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

fn run_migration(tx: &Transaction<'_>, migration: &Migration) -> rusqlite::Result<()> {
    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", migration.version)
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
