//! Read models for catalog users, group memberships and metadata ownership.
//!
//! # Invariants
//! - Identifiers are the integer primary keys assigned by storage.
//! - Models are read-only projections; this crate never writes them back.

pub mod metadata;
pub mod user;
pub mod user_group;
