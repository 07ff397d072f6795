//! Sort specifications over the joined user, membership and metadata rows.
//!
//! Sort params use the `<record>.<field>[,asc|desc]` form, for example
//! `user.surname,desc` or `metadata.id`. Direction defaults to ascending.

use crate::query::{QueryError, QueryResult};
use once_cell::sync::Lazy;
use regex::Regex;

static SORT_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]+)\.([A-Za-z_]+)$").expect("valid sort path regex")
});

/// Logical record sets a lookup can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordSet {
    User,
    UserGroup,
    Metadata,
}

impl RecordSet {
    /// SQL alias used for this record set in compiled queries.
    pub fn alias(self) -> &'static str {
        match self {
            Self::User => "u",
            Self::UserGroup => "ug",
            Self::Metadata => "m",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::UserGroup => "user_groups",
            Self::Metadata => "metadata",
        }
    }

    /// Record name accepted in sort params.
    pub fn param_name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::UserGroup => "userGroup",
            Self::Metadata => "metadata",
        }
    }

    fn from_param(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "userGroup" | "user_group" => Some(Self::UserGroup),
            "metadata" => Some(Self::Metadata),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserColumn {
    Id,
    Username,
    Name,
    Surname,
    Organisation,
    /// Sorted by stored profile name, not privilege.
    Profile,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserGroupColumn {
    UserId,
    GroupId,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataColumn {
    Id,
    Uuid,
    GroupOwner,
}

/// A sortable column on one of the joined record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    User(UserColumn),
    UserGroup(UserGroupColumn),
    Metadata(MetadataColumn),
}

impl Column {
    pub fn record_set(self) -> RecordSet {
        match self {
            Self::User(_) => RecordSet::User,
            Self::UserGroup(_) => RecordSet::UserGroup,
            Self::Metadata(_) => RecordSet::Metadata,
        }
    }

    fn sql_name(self) -> &'static str {
        match self {
            Self::User(column) => match column {
                UserColumn::Id => "id",
                UserColumn::Username => "username",
                UserColumn::Name => "name",
                UserColumn::Surname => "surname",
                UserColumn::Organisation => "organisation",
                UserColumn::Profile => "profile",
                UserColumn::Enabled => "enabled",
            },
            Self::UserGroup(column) => match column {
                UserGroupColumn::UserId => "user_id",
                UserGroupColumn::GroupId => "group_id",
                UserGroupColumn::Profile => "profile",
            },
            Self::Metadata(column) => match column {
                MetadataColumn::Id => "id",
                MetadataColumn::Uuid => "uuid",
                MetadataColumn::GroupOwner => "group_owner",
            },
        }
    }

    /// Alias-qualified column reference, e.g. `u.surname`.
    pub fn qualified(self) -> String {
        format!("{}.{}", self.record_set().alias(), self.sql_name())
    }

    /// Resolves a `<record>.<field>` path.
    ///
    /// Field names are accepted in camelCase and snake_case.
    pub fn from_path(path: &str) -> QueryResult<Self> {
        let unknown = || QueryError::UnknownSortField(path.to_string());
        let captures = SORT_PATH_RE.captures(path).ok_or_else(unknown)?;
        let record = RecordSet::from_param(&captures[1]).ok_or_else(unknown)?;

        let column = match (record, &captures[2]) {
            (RecordSet::User, "id") => Self::User(UserColumn::Id),
            (RecordSet::User, "username") => Self::User(UserColumn::Username),
            (RecordSet::User, "name") => Self::User(UserColumn::Name),
            (RecordSet::User, "surname") => Self::User(UserColumn::Surname),
            (RecordSet::User, "organisation") => Self::User(UserColumn::Organisation),
            (RecordSet::User, "profile") => Self::User(UserColumn::Profile),
            (RecordSet::User, "enabled") => Self::User(UserColumn::Enabled),
            (RecordSet::UserGroup, "userId" | "user_id") => {
                Self::UserGroup(UserGroupColumn::UserId)
            }
            (RecordSet::UserGroup, "groupId" | "group_id") => {
                Self::UserGroup(UserGroupColumn::GroupId)
            }
            (RecordSet::UserGroup, "profile") => Self::UserGroup(UserGroupColumn::Profile),
            (RecordSet::Metadata, "id") => Self::Metadata(MetadataColumn::Id),
            (RecordSet::Metadata, "uuid") => Self::Metadata(MetadataColumn::Uuid),
            (RecordSet::Metadata, "groupOwner" | "group_owner") => {
                Self::Metadata(MetadataColumn::GroupOwner)
            }
            _ => return Err(unknown()),
        };
        Ok(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn parse(value: &str) -> QueryResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidSortDirection(value.to_string())),
        }
    }
}

/// One `ORDER BY` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortOrder {
    pub column: Column,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn asc(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: Column) -> Self {
        Self {
            column,
            direction: SortDirection::Desc,
        }
    }

    /// Parses one `<record>.<field>[,asc|desc]` sort param.
    pub fn parse(param: &str) -> QueryResult<Self> {
        let (path, direction) = match param.split_once(',') {
            Some((path, direction)) => (path.trim(), SortDirection::parse(direction.trim())?),
            None => (param.trim(), SortDirection::default()),
        };
        if path.is_empty() {
            return Err(QueryError::EmptySortField);
        }

        Ok(Self {
            column: Column::from_path(path)?,
            direction,
        })
    }

    pub(crate) fn to_sql(self) -> String {
        format!("{} {}", self.column.qualified(), self.direction.as_sql())
    }
}

/// Ordered sort specification; the first entry is the primary key and each
/// later entry only breaks ties of the ones before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<SortOrder>,
}

impl Sort {
    pub fn by(column: Column, direction: SortDirection) -> Self {
        Self {
            orders: vec![SortOrder { column, direction }],
        }
    }

    /// Appends a lower-priority entry.
    pub fn then(mut self, column: Column, direction: SortDirection) -> Self {
        self.orders.push(SortOrder { column, direction });
        self
    }

    /// Parses sort params in priority order. Fails on the first bad entry.
    pub fn parse_params<'a>(params: impl IntoIterator<Item = &'a str>) -> QueryResult<Self> {
        let orders = params
            .into_iter()
            .map(SortOrder::parse)
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Self { orders })
    }

    pub fn orders(&self) -> &[SortOrder] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl From<Vec<SortOrder>> for Sort {
    fn from(orders: Vec<SortOrder>) -> Self {
        Self { orders }
    }
}
