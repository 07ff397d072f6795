//! Catalog user model.
//!
//! # Invariants
//! - `id` is the storage primary key and never reused.
//! - `email_addresses` is a set: duplicates collapse, order is not meaningful.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Primary key of a `users` row.
pub type UserId = i32;

/// Access level attached to a user, either globally or per group membership.
///
/// Variant names are the persisted names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Profile {
    Administrator,
    UserAdmin,
    Reviewer,
    Editor,
    RegisteredUser,
    Guest,
    Monitor,
}

impl Profile {
    /// Every profile, most privileged first.
    pub const ALL: [Profile; 7] = [
        Profile::Administrator,
        Profile::UserAdmin,
        Profile::Reviewer,
        Profile::Editor,
        Profile::RegisteredUser,
        Profile::Guest,
        Profile::Monitor,
    ];

    /// Name stored in `users.profile` and `user_groups.profile`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::UserAdmin => "UserAdmin",
            Self::Reviewer => "Reviewer",
            Self::Editor => "Editor",
            Self::RegisteredUser => "RegisteredUser",
            Self::Guest => "Guest",
            Self::Monitor => "Monitor",
        }
    }

    /// Inverse of [`Profile::as_str`]. Matching is exact.
    pub fn from_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str() == value)
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog user account as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Login name, unique across users.
    pub username: String,
    pub name: String,
    pub surname: String,
    pub organisation: Option<String>,
    /// Global profile, independent of per-group roles.
    pub profile: Profile,
    pub enabled: bool,
    /// Every address registered for this user, compared case-sensitively.
    pub email_addresses: BTreeSet<String>,
}

impl User {
    /// Returns whether `email` is one of this user's addresses (exact match).
    pub fn has_email(&self, email: &str) -> bool {
        self.email_addresses.contains(email)
    }
}
