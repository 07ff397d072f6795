//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `catalog_core` linkage with deterministic output.
//! - Open the database configured through `CATALOG_*` variables and report
//!   its schema version.

use catalog_core::db::migrations::latest_version;
use catalog_core::{CoreConfig, SqliteUserRepository};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("catalog_core ping={}", catalog_core::ping());
    println!("catalog_core version={}", catalog_core::core_version());

    let config = CoreConfig::from_env();
    if let Err(err) = config.init_logging() {
        eprintln!("catalog_core logging=error error={err}");
        return ExitCode::FAILURE;
    }

    let conn = match config.open_db() {
        Ok(conn) => conn,
        Err(err) => {
            log::error!("event=cli_probe module=cli status=error error={err}");
            eprintln!("catalog_core db=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = SqliteUserRepository::try_new(&conn) {
        eprintln!("catalog_core repo=error error={err}");
        return ExitCode::FAILURE;
    }

    println!("catalog_core schema_version={}", latest_version());
    ExitCode::SUCCESS
}
