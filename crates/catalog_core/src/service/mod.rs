//! Use-case services over repository contracts.
//!
//! # Invariants
//! - Services depend on repository traits, not on SQLite.

pub mod user_service;
