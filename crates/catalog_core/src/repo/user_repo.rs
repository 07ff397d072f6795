//! User lookup contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the user lookups a generic repository cannot derive.
//! - Keep SQL execution and row decoding inside the persistence boundary.
//!
//! # Invariants
//! - Lookups are read-only.
//! - Not-found is `Ok(None)` or an empty list, never an error.
//! - Query construction errors surface before any SQL is executed.
//! - Storage failures are returned unchanged as `RepoError::Db`.

use crate::db::DbError;
use crate::model::metadata::{MetadataId, MetadataUser};
use crate::model::user::{Profile, User, UserId};
use crate::query::{Predicate, QueryBuilder, QueryError, Sort};
use crate::repo::row::{fetch_raw_rows, EmailAddresses, RawRow};
use log::{debug, error, warn};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::time::Instant;

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "users",
        &[
            "id",
            "username",
            "name",
            "surname",
            "organisation",
            "profile",
            "enabled",
        ],
    ),
    ("user_emails", &["user_id", "email"]),
    ("user_groups", &["user_id", "group_id", "profile"]),
    ("metadata", &["id", "uuid", "group_owner"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for user lookups.
#[derive(Debug)]
pub enum RepoError {
    /// The user identifier is not a valid integer.
    InvalidId {
        value: String,
        source: ParseIntError,
    },
    /// A required argument was not supplied.
    InvalidArgument(&'static str),
    /// The lookup could not be turned into a query.
    Query(QueryError),
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId { value, source } => {
                write!(f, "invalid user id `{value}`: {source}")
            }
            Self::InvalidArgument(name) => write!(f, "missing required argument `{name}`"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted user data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidId { source, .. } => Some(source),
            Self::Query(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidArgument(_)
            | Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::MissingArgument(name) => Self::InvalidArgument(name),
            other => Self::Query(other),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for user lookups.
pub trait UserRepository {
    /// Finds one user by its identifier in string form.
    ///
    /// Fails with `RepoError::InvalidId` when `user_id` is not an integer.
    fn find_one(&self, user_id: &str) -> RepoResult<Option<User>>;

    /// Finds one user by exact username.
    fn find_one_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Finds every user whose email set contains `email` exactly.
    fn find_all_by_email(&self, email: &str) -> RepoResult<Vec<User>>;

    /// Finds `(metadata id, user)` pairs where the user is a member of the
    /// group owning the metadata record.
    ///
    /// `profile` restricts the role of the joined membership row. `sort`
    /// orders the pairs; without it the order is unspecified.
    fn find_all_by_group_owner_and_profile(
        &self,
        metadata_ids: &[MetadataId],
        profile: Option<Profile>,
        sort: Option<&Sort>,
    ) -> RepoResult<Vec<MetadataUser>>;
}

/// SQLite-backed user repository borrowing a caller-owned connection.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository after checking the catalog tables exist.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn fetch(&self, query_name: &'static str, builder: QueryBuilder) -> RepoResult<Vec<RawRow>> {
        let started_at = Instant::now();
        let compiled = builder.compile().map_err(|err| {
            warn!(
                "event=user_query module=repo status=rejected query={query_name} error={err}"
            );
            RepoError::from(err)
        })?;

        match fetch_raw_rows(self.conn, &compiled) {
            Ok(rows) => {
                debug!(
                    "event=user_query module=repo status=ok query={query_name} rows={} duration_ms={}",
                    rows.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(err) => {
                error!(
                    "event=user_query module=repo status=error query={query_name} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn fetch_users(
        &self,
        query_name: &'static str,
        builder: QueryBuilder,
    ) -> RepoResult<Vec<User>> {
        let users = self
            .fetch(query_name, builder)?
            .iter()
            .map(|row| row.user(0))
            .collect::<RepoResult<Vec<_>>>()?;

        let user_ids: BTreeSet<UserId> = users.iter().map(|user| user.id).collect();
        let emails = EmailAddresses::load(self.conn, &user_ids)?;
        Ok(users.into_iter().map(|user| emails.fill(user)).collect())
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn find_one(&self, user_id: &str) -> RepoResult<Option<User>> {
        let id = parse_user_id(user_id)?;
        let builder = QueryBuilder::users().filter(Predicate::UserIdEquals(id));
        Ok(self.fetch_users("find_one", builder)?.into_iter().next())
    }

    fn find_one_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let builder =
            QueryBuilder::users().filter(Predicate::UsernameEquals(username.to_string()));
        Ok(self
            .fetch_users("find_one_by_username", builder)?
            .into_iter()
            .next())
    }

    fn find_all_by_email(&self, email: &str) -> RepoResult<Vec<User>> {
        let builder = QueryBuilder::users().filter(Predicate::HasEmail(email.to_string()));
        self.fetch_users("find_all_by_email", builder)
    }

    fn find_all_by_group_owner_and_profile(
        &self,
        metadata_ids: &[MetadataId],
        profile: Option<Profile>,
        sort: Option<&Sort>,
    ) -> RepoResult<Vec<MetadataUser>> {
        let builder = QueryBuilder::metadata_users()
            .metadata_ids(metadata_ids.iter().copied())
            .profile(profile)
            .sort(sort);

        let pairs = self
            .fetch("find_all_by_group_owner_and_profile", builder)?
            .iter()
            .map(|row| Ok((row.metadata_id()?, row.user(1)?)))
            .collect::<RepoResult<Vec<_>>>()?;

        let user_ids: BTreeSet<UserId> = pairs.iter().map(|(_, user)| user.id).collect();
        let emails = EmailAddresses::load(self.conn, &user_ids)?;
        Ok(pairs
            .into_iter()
            .map(|(metadata_id, user)| MetadataUser::new(metadata_id, emails.fill(user)))
            .collect())
    }
}

/// Parses a user identifier the way callers pass it around: a plain decimal
/// integer with no surrounding whitespace.
pub fn parse_user_id(value: &str) -> RepoResult<UserId> {
    value.parse::<UserId>().map_err(|source| RepoError::InvalidId {
        value: value.to_string(),
        source,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{parse_user_id, RepoError};
    use crate::query::QueryError;

    #[test]
    fn parse_user_id_accepts_plain_integers() {
        assert_eq!(parse_user_id("42").unwrap(), 42);
        assert_eq!(parse_user_id("-7").unwrap(), -7);
    }

    #[test]
    fn parse_user_id_rejects_malformed_values() {
        for value in ["", "abc", "4 2", " 42", "42.0", "99999999999"] {
            let err = parse_user_id(value).unwrap_err();
            assert!(
                matches!(&err, RepoError::InvalidId { value: v, .. } if v == value),
                "unexpected error for `{value}`: {err}"
            );
        }
    }

    #[test]
    fn missing_argument_maps_to_invalid_argument() {
        let err = RepoError::from(QueryError::MissingArgument("metadata_ids"));
        assert!(matches!(err, RepoError::InvalidArgument("metadata_ids")));

        let err = RepoError::from(QueryError::EmptySortField);
        assert!(matches!(err, RepoError::Query(QueryError::EmptySortField)));
    }
}
