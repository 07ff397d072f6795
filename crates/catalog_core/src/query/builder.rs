//! Fragment accumulator that compiles to SQL.
//!
//! Callers add predicates and sort entries in any order; `compile()` checks
//! them against the projection and renders one statement.

use crate::model::metadata::MetadataId;
use crate::model::user::{Profile, UserId};
use crate::query::sort::{RecordSet, Sort, SortOrder};
use crate::query::{QueryError, QueryResult};
use rusqlite::types::Value;

/// User columns in the order row projection reads them.
const USER_COLUMNS: [&str; 7] = [
    "id",
    "username",
    "name",
    "surname",
    "organisation",
    "profile",
    "enabled",
];

/// Shape of the rows a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// User columns only, read from `users`.
    User,
    /// Metadata id followed by user columns, read from the cross product of
    /// users, metadata and memberships.
    MetadataUser,
}

impl Projection {
    fn record_sets(self) -> &'static [RecordSet] {
        match self {
            Self::User => &[RecordSet::User],
            Self::MetadataUser => &[RecordSet::User, RecordSet::Metadata, RecordSet::UserGroup],
        }
    }

    /// Index of the first user column in each row.
    pub fn user_offset(self) -> usize {
        match self {
            Self::User => 0,
            Self::MetadataUser => 1,
        }
    }

    /// Number of columns in each row.
    pub fn arity(self) -> usize {
        self.user_offset() + USER_COLUMNS.len()
    }

    fn select_list(self) -> String {
        let user_alias = RecordSet::User.alias();
        let mut columns = Vec::with_capacity(self.arity());
        if self == Self::MetadataUser {
            columns.push(format!("{}.id", RecordSet::Metadata.alias()));
        }
        columns.extend(
            USER_COLUMNS
                .iter()
                .map(|column| format!("{user_alias}.{column}")),
        );
        columns.join(", ")
    }

    fn from_clause(self) -> String {
        self.record_sets()
            .iter()
            .map(|record| format!("{} {}", record.table(), record.alias()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A filter condition over the joined record sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    UserIdEquals(UserId),
    UsernameEquals(String),
    /// Exact, case-sensitive membership in the user's email set.
    HasEmail(String),
    /// Metadata id within the given set. An empty set matches nothing.
    MetadataIdIn(Vec<MetadataId>),
    /// `metadata.group_owner = user_groups.group_id`
    MetadataOwnedByMembershipGroup,
    /// `user_groups.user_id = users.id`
    MembershipOfUser,
    /// Role held through the joined membership row.
    MembershipProfile(Profile),
}

impl Predicate {
    fn record_sets(&self) -> &'static [RecordSet] {
        match self {
            Self::UserIdEquals(_) | Self::UsernameEquals(_) | Self::HasEmail(_) => {
                &[RecordSet::User]
            }
            Self::MetadataIdIn(_) => &[RecordSet::Metadata],
            Self::MetadataOwnedByMembershipGroup => &[RecordSet::Metadata, RecordSet::UserGroup],
            Self::MembershipOfUser => &[RecordSet::UserGroup, RecordSet::User],
            Self::MembershipProfile(_) => &[RecordSet::UserGroup],
        }
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        let u = RecordSet::User.alias();
        let ug = RecordSet::UserGroup.alias();
        let m = RecordSet::Metadata.alias();

        match self {
            Self::UserIdEquals(id) => {
                params.push(Value::Integer(i64::from(*id)));
                format!("{u}.id = ?")
            }
            Self::UsernameEquals(username) => {
                params.push(Value::Text(username.clone()));
                format!("{u}.username = ?")
            }
            Self::HasEmail(email) => {
                params.push(Value::Text(email.clone()));
                format!(
                    "EXISTS (
                    SELECT 1
                    FROM user_emails ue
                    WHERE ue.user_id = {u}.id
                      AND ue.email = ?
                )"
                )
            }
            Self::MetadataIdIn(ids) if ids.is_empty() => "0 = 1".to_string(),
            Self::MetadataIdIn(ids) => {
                // One JSON array bind keeps large id sets under SQLite's variable limit.
                params.push(Value::Text(serde_json::Value::from(ids.clone()).to_string()));
                format!("{m}.id IN (SELECT value FROM json_each(?))")
            }
            Self::MetadataOwnedByMembershipGroup => format!("{m}.group_owner = {ug}.group_id"),
            Self::MembershipOfUser => format!("{ug}.user_id = {u}.id"),
            Self::MembershipProfile(profile) => {
                params.push(Value::Text(profile.as_str().to_string()));
                format!("{ug}.profile = ?")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Fragment {
    Where(Predicate),
    OrderBy(SortOrder),
}

impl Fragment {
    fn record_sets(&self) -> &'static [RecordSet] {
        match self {
            Self::Where(predicate) => predicate.record_sets(),
            Self::OrderBy(order) => match order.column.record_set() {
                RecordSet::User => &[RecordSet::User],
                RecordSet::UserGroup => &[RecordSet::UserGroup],
                RecordSet::Metadata => &[RecordSet::Metadata],
            },
        }
    }
}

/// SQL text and bind values ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
    pub projection: Projection,
}

/// Accumulates fragments for one lookup.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    projection: Projection,
    fragments: Vec<Fragment>,
}

impl QueryBuilder {
    /// Starts a query returning users.
    pub fn users() -> Self {
        Self {
            projection: Projection::User,
            fragments: Vec::new(),
        }
    }

    /// Starts a `(metadata id, user)` query with the ownership join
    /// predicates already in place.
    ///
    /// A metadata id scope must be added with [`QueryBuilder::metadata_ids`]
    /// before compiling.
    pub fn metadata_users() -> Self {
        Self {
            projection: Projection::MetadataUser,
            fragments: vec![
                Fragment::Where(Predicate::MetadataOwnedByMembershipGroup),
                Fragment::Where(Predicate::MembershipOfUser),
            ],
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.fragments.push(Fragment::Where(predicate));
        self
    }

    pub fn metadata_ids(self, ids: impl IntoIterator<Item = MetadataId>) -> Self {
        self.filter(Predicate::MetadataIdIn(ids.into_iter().collect()))
    }

    /// Restricts the membership role when `profile` is set; no-op otherwise.
    pub fn profile(self, profile: Option<Profile>) -> Self {
        match profile {
            Some(profile) => self.filter(Predicate::MembershipProfile(profile)),
            None => self,
        }
    }

    pub fn order_by(mut self, order: SortOrder) -> Self {
        self.fragments.push(Fragment::OrderBy(order));
        self
    }

    /// Appends every entry of `sort`, keeping its priority order.
    pub fn sort(self, sort: Option<&Sort>) -> Self {
        match sort {
            Some(sort) => sort
                .orders()
                .iter()
                .fold(self, |builder, order| builder.order_by(*order)),
            None => self,
        }
    }

    /// Validates the fragments and renders the statement.
    pub fn compile(&self) -> QueryResult<CompiledQuery> {
        let available = self.projection.record_sets();
        for fragment in &self.fragments {
            if let Some(missing) = fragment
                .record_sets()
                .iter()
                .find(|record| !available.contains(record))
            {
                return Err(QueryError::RecordSetNotJoined(*missing));
            }
        }

        if self.projection == Projection::MetadataUser
            && !self
                .fragments
                .iter()
                .any(|fragment| matches!(fragment, Fragment::Where(Predicate::MetadataIdIn(_))))
        {
            return Err(QueryError::MissingArgument("metadata_ids"));
        }

        let mut params = Vec::new();
        let mut conditions = Vec::new();
        let mut orders = Vec::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Where(predicate) => conditions.push(predicate.render(&mut params)),
                Fragment::OrderBy(order) => orders.push(order.to_sql()),
            }
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            self.projection.select_list(),
            self.projection.from_clause()
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        if !orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        Ok(CompiledQuery {
            sql,
            params,
            projection: self.projection,
        })
    }
}
