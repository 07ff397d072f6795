//! Raw row boundary for compiled queries.
//!
//! Rows come back as fixed-arity value sequences and are turned into typed
//! models here; nothing outside `repo` sees a `RawRow`.

use crate::model::metadata::MetadataId;
use crate::model::user::{Profile, User, UserId};
use crate::query::CompiledQuery;
use crate::repo::user_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::{BTreeMap, BTreeSet};

/// One result row with exactly `Projection::arity()` values.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawRow(Vec<Value>);

impl RawRow {
    /// Reads the leading metadata id of a `MetadataUser` row.
    pub(crate) fn metadata_id(&self) -> RepoResult<MetadataId> {
        let value = self.integer(0, "metadata.id")?;
        to_i32(value, "metadata.id")
    }

    /// Reads user columns starting at `offset`. Email addresses are left
    /// empty; see [`EmailAddresses`].
    pub(crate) fn user(&self, offset: usize) -> RepoResult<User> {
        let column = |index: usize| offset + index;

        let id = to_i32(self.integer(column(0), "users.id")?, "users.id")?;
        let profile_text = self.text(column(5), "users.profile")?;
        let profile = Profile::from_name(&profile_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid profile `{profile_text}` in users.profile"))
        })?;
        let enabled = match self.integer(column(6), "users.enabled")? {
            0 => false,
            1 => true,
            other => {
                return Err(RepoError::InvalidData(format!(
                    "invalid enabled value `{other}` in users.enabled"
                )));
            }
        };

        Ok(User {
            id,
            username: self.text(column(1), "users.username")?,
            name: self.text(column(2), "users.name")?,
            surname: self.text(column(3), "users.surname")?,
            organisation: self.optional_text(column(4), "users.organisation")?,
            profile,
            enabled,
            email_addresses: BTreeSet::new(),
        })
    }

    fn value(&self, index: usize, column: &str) -> RepoResult<&Value> {
        self.0.get(index).ok_or_else(|| {
            RepoError::InvalidData(format!("row has no value at {index} for {column}"))
        })
    }

    fn integer(&self, index: usize, column: &str) -> RepoResult<i64> {
        match self.value(index, column)? {
            Value::Integer(value) => Ok(*value),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    fn text(&self, index: usize, column: &str) -> RepoResult<String> {
        match self.value(index, column)? {
            Value::Text(value) => Ok(value.clone()),
            other => Err(unexpected(column, "text", other)),
        }
    }

    fn optional_text(&self, index: usize, column: &str) -> RepoResult<Option<String>> {
        match self.value(index, column)? {
            Value::Null => Ok(None),
            Value::Text(value) => Ok(Some(value.clone())),
            other => Err(unexpected(column, "text or null", other)),
        }
    }
}

/// Executes `query` and collects every row as a `RawRow`.
pub(crate) fn fetch_raw_rows(conn: &Connection, query: &CompiledQuery) -> RepoResult<Vec<RawRow>> {
    let arity = query.projection.arity();
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
    let mut raw_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..arity)
            .map(|index| row.get::<_, Value>(index))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw_rows.push(RawRow(values));
    }
    Ok(raw_rows)
}

/// Email sets for every user of one lookup result, keyed by user id.
#[derive(Debug, Default)]
pub(crate) struct EmailAddresses(BTreeMap<UserId, BTreeSet<String>>);

impl EmailAddresses {
    /// Loads the sets of all `user_ids` with a single statement.
    pub(crate) fn load(conn: &Connection, user_ids: &BTreeSet<UserId>) -> RepoResult<Self> {
        if user_ids.is_empty() {
            return Ok(Self::default());
        }

        let ids = serde_json::Value::from(user_ids.iter().copied().collect::<Vec<_>>());
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, email
             FROM user_emails
             WHERE user_id IN (SELECT value FROM json_each(?1));",
        )?;
        let mut rows = stmt.query([ids.to_string()])?;
        let mut loaded: BTreeMap<UserId, BTreeSet<String>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            loaded
                .entry(row.get::<_, UserId>(0)?)
                .or_default()
                .insert(row.get::<_, String>(1)?);
        }
        Ok(Self(loaded))
    }

    /// Fills `user.email_addresses`; users without addresses keep an empty set.
    pub(crate) fn fill(&self, mut user: User) -> User {
        if let Some(addresses) = self.0.get(&user.id) {
            user.email_addresses = addresses.clone();
        }
        user
    }
}

fn to_i32(value: i64, column: &str) -> RepoResult<i32> {
    i32::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("value `{value}` in {column} is out of range"))
    })
}

fn unexpected(column: &str, expected: &str, actual: &Value) -> RepoError {
    RepoError::InvalidData(format!(
        "expected {expected} in {column}, found {:?}",
        actual.data_type()
    ))
}
