//! Group membership ("group ownership") records.

use crate::model::user::{Profile, UserId};
use serde::{Deserialize, Serialize};

/// Primary key of a group row.
pub type GroupId = i32;

/// Composite key of a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserGroupId {
    pub user_id: UserId,
    pub group_id: GroupId,
}

/// Links a user to a group with the role the user holds in that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: UserGroupId,
    pub profile: Profile,
}
