//! Repository layer: per-entity data access over the connection manager.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQL details from callers.
//! - Translate store failures into the domain error taxonomy.
//!
//! # Invariants
//! - Write paths validate before touching the store.
//! - Lookups that find nothing return `None`, never an error.
//! - Repositories match on [`StoreErrorKind`](crate::db::StoreErrorKind), never on driver codes.

use crate::db::DbError;
use crate::model::validation::ValidationReport;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub(crate) mod filter;
pub mod quote_repo;
pub mod user_repo;

pub const DEFAULT_PAGE_LIMIT: u32 = 50;

pub type RepoResult<T> = Result<T, RepoError>;

/// Domain error for entity persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// One or more field rules failed; nothing was sent to the store.
    Validation(ValidationReport),
    /// A unique field (user email, category name) is already taken.
    Duplicate {
        entity: &'static str,
        field: &'static str,
    },
    /// A referenced creator or category does not exist.
    Reference { entity: &'static str },
    /// The row is still referenced by dependent quotes.
    Dependency {
        entity: &'static str,
        id: i64,
        dependents: i64,
    },
    /// The operation needs a persisted entity but the instance has no id.
    MissingId { entity: &'static str },
    /// `create` was called on an instance that already has an id.
    AlreadyPersisted { entity: &'static str, id: i64 },
    InvalidData(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(report) => write!(f, "{report}"),
            Self::Duplicate { entity, field } => {
                write!(f, "a {entity} with this {field} already exists")
            }
            Self::Reference { entity } => write!(f, "referenced {entity} not found"),
            Self::Dependency {
                entity,
                id,
                dependents,
            } => write!(
                f,
                "{entity} {id} cannot be deleted: {dependents} associated quote(s)"
            ),
            Self::MissingId { entity } => write!(f, "{entity} has no id; persist it first"),
            Self::AlreadyPersisted { entity, id } => {
                write!(f, "{entity} is already persisted with id {id}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(report) => Some(report),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationReport> for RepoError {
    fn from(value: ValidationReport) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Pagination window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// `None` returns every remaining row.
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_PAGE_LIMIT),
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }

    pub(crate) fn push_sql(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Aggregate quote counts by publication status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QuoteStats {
    pub total: i64,
    pub published: i64,
    pub draft: i64,
    pub scheduled: i64,
}

pub(crate) const QUOTE_STATS_COLUMNS: &str = "COUNT(*) AS total,
    COALESCE(SUM(CASE WHEN f.status = 'published' THEN 1 ELSE 0 END), 0) AS published,
    COALESCE(SUM(CASE WHEN f.status = 'draft' THEN 1 ELSE 0 END), 0) AS draft,
    COALESCE(SUM(CASE WHEN f.status = 'scheduled' THEN 1 ELSE 0 END), 0) AS scheduled";

impl QuoteStats {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            total: row.get("total")?,
            published: row.get("published")?,
            draft: row.get("draft")?,
            scheduled: row.get("scheduled")?,
        })
    }
}

pub(crate) fn bind_text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub(crate) fn bind_opt_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, bind_text)
}

pub(crate) fn bind_opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}
