//! User lookup use-case service.
//!
//! # Responsibility
//! - Provide stable lookup entry points for core callers.
//! - Delegate storage access to a `UserRepository`.
//!
//! # Invariants
//! - Service APIs never bypass repository contracts.
//! - Service layer remains storage-agnostic.

use crate::model::metadata::{MetadataId, MetadataUser};
use crate::model::user::{Profile, User};
use crate::query::Sort;
use crate::repo::user_repo::{RepoResult, UserRepository};
use std::collections::BTreeMap;

/// Use-case service wrapper for user lookups.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn find_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        self.repo.find_one(user_id)
    }

    pub fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.repo.find_one_by_username(username)
    }

    pub fn find_users_by_email(&self, email: &str) -> RepoResult<Vec<User>> {
        self.repo.find_all_by_email(email)
    }

    /// Lists `(metadata id, user)` ownership pairs unchanged.
    pub fn find_metadata_owners(
        &self,
        metadata_ids: &[MetadataId],
        profile: Option<Profile>,
        sort: Option<&Sort>,
    ) -> RepoResult<Vec<MetadataUser>> {
        self.repo
            .find_all_by_group_owner_and_profile(metadata_ids, profile, sort)
    }

    /// Groups ownership pairs by metadata id.
    ///
    /// # Contract
    /// - Metadata ids without any qualifying user are absent from the map.
    /// - A user reachable through several groups is listed once per id,
    ///   in first-seen order.
    pub fn owners_by_metadata(
        &self,
        metadata_ids: &[MetadataId],
        profile: Option<Profile>,
    ) -> RepoResult<BTreeMap<MetadataId, Vec<User>>> {
        let pairs = self
            .repo
            .find_all_by_group_owner_and_profile(metadata_ids, profile, None)?;

        let mut grouped: BTreeMap<MetadataId, Vec<User>> = BTreeMap::new();
        for (metadata_id, user) in pairs.into_iter().map(MetadataUser::into_parts) {
            let users = grouped.entry(metadata_id).or_default();
            if users.iter().all(|existing| existing.id != user.id) {
                users.push(user);
            }
        }
        Ok(grouped)
    }
}
