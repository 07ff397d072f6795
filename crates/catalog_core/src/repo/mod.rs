//! Repository layer for catalog user lookups.
//!
//! # Responsibility
//! - Define use-case oriented lookup contracts.
//! - Isolate SQLite execution and row decoding from services.
//!
//! # Invariants
//! - Repository APIs never write.
//! - Untyped rows are converted to models before leaving this module.

pub(crate) mod row;
pub mod user_repo;
