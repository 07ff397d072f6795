//! Metadata ownership projections.

use crate::model::user::User;
use serde::{Deserialize, Serialize};

/// Primary key of a `metadata` row.
pub type MetadataId = i32;

/// One row of the ownership lookup: a metadata record and a user reached
/// through the record's owning group.
///
/// The same user appears once per qualifying metadata id and group path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUser {
    pub metadata_id: MetadataId,
    pub user: User,
}

impl MetadataUser {
    pub fn new(metadata_id: MetadataId, user: User) -> Self {
        Self { metadata_id, user }
    }

    /// Splits the pair into its parts.
    pub fn into_parts(self) -> (MetadataId, User) {
        (self.metadata_id, self.user)
    }
}
