//! Query construction for user lookups.
//!
//! # Responsibility
//! - Accumulate predicate and order fragments for one lookup.
//! - Compile fragments once into SQL text plus positional bind values.
//!
//! # Invariants
//! - Every construction error is reported by `compile()` or sort parsing,
//!   before any SQL reaches storage.
//! - Fragments may only reference record sets the projection selects from.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod builder;
pub mod sort;

pub use builder::{CompiledQuery, Predicate, Projection, QueryBuilder};
pub use sort::{
    Column, MetadataColumn, RecordSet, Sort, SortDirection, SortOrder, UserColumn,
    UserGroupColumn,
};

pub type QueryResult<T> = Result<T, QueryError>;

/// Failure to build a query from caller input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A required argument was never supplied to the builder.
    MissingArgument(&'static str),
    /// A sort entry has no field reference.
    EmptySortField,
    /// A sort entry names a record or field that does not exist.
    UnknownSortField(String),
    /// A sort entry direction is neither `asc` nor `desc`.
    InvalidSortDirection(String),
    /// A fragment references a record set absent from the projection.
    RecordSetNotJoined(RecordSet),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingArgument(name) => write!(f, "missing required argument `{name}`"),
            Self::EmptySortField => write!(f, "sort entry has an empty field reference"),
            Self::UnknownSortField(path) => write!(f, "unknown sort field `{path}`"),
            Self::InvalidSortDirection(value) => {
                write!(f, "invalid sort direction `{value}`; expected asc|desc")
            }
            Self::RecordSetNotJoined(record) => write!(
                f,
                "query references `{}` which is not part of the projection",
                record.param_name()
            ),
        }
    }
}

impl Error for QueryError {}
