//! Core user lookups for the metadata catalog.
//! Resolves users by id, by email and through metadata group ownership.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::metadata::{MetadataId, MetadataUser};
pub use model::user::{Profile, User, UserId};
pub use model::user_group::{GroupId, UserGroup, UserGroupId};
pub use query::{
    Column, MetadataColumn, QueryError, Sort, SortDirection, SortOrder, UserColumn,
    UserGroupColumn,
};
pub use repo::user_repo::{RepoError, RepoResult, SqliteUserRepository, UserRepository};
pub use service::user_service::UserService;

/// Minimal health-check API for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
