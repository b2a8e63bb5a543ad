//! SQLite storage bootstrap, connection management and error classification.
//!
//! # Responsibility
//! - Own the single store connection behind [`ConnectionManager`].
//! - Apply schema migrations in deterministic order.
//! - Classify driver failures into [`StoreErrorKind`] so repositories never
//!   inspect raw SQLite codes.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Query parameter values never appear in `Display`/`Debug` output.

use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

mod manager;
pub mod migrations;
mod open;

pub use manager::{
    open_db, open_db_in_memory, ConnectionManager, TransactionScope, WriteOutcome,
};
pub(crate) use open::UNICODE_LOWER_FN;

pub type DbResult<T> = Result<T, DbError>;

/// Store-level failure category used by repositories to pick a domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A `UNIQUE` or primary-key constraint rejected the write.
    UniqueViolation,
    /// A foreign-key constraint rejected the write or delete.
    ForeignKeyViolation,
    Other,
}

/// Bound parameters captured for diagnostics.
///
/// Values stay reachable through [`QueryParams::values`] but formatting only
/// ever renders the parameter count.
#[derive(Clone, Default)]
pub struct QueryParams(Vec<Value>);

impl QueryParams {
    pub fn new(values: &[Value]) -> Self {
        Self(values.to_vec())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for QueryParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueryParams([{} redacted])", self.0.len())
    }
}

impl Display for QueryParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bound params", self.0.len())
    }
}

#[derive(Debug)]
pub enum DbError {
    /// The connection could not be established or bootstrapped.
    Connection { target: String, message: String },
    /// A statement failed to prepare, execute or decode.
    Query {
        sql: String,
        params: QueryParams,
        source: rusqlite::Error,
    },
    /// An operation required state that does not exist (e.g. no connection).
    State(&'static str),
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Classifies the underlying driver failure.
    pub fn store_kind(&self) -> StoreErrorKind {
        match self {
            Self::Query { source, .. } | Self::Sqlite(source) => classify_sqlite_error(source),
            _ => StoreErrorKind::Other,
        }
    }

    pub(crate) fn query(sql: &str, params: &[Value], source: rusqlite::Error) -> Self {
        Self::Query {
            sql: compact_sql(sql),
            params: QueryParams::new(params),
            source,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { target, message } => {
                write!(f, "failed to connect to `{target}`: {message}")
            }
            Self::Query {
                sql,
                params,
                source,
            } => write!(f, "query failed ({params}): {source}; sql: {sql}"),
            Self::State(details) => write!(f, "invalid connection state: {details}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::Connection { .. } | Self::State(_) | Self::UnsupportedSchemaVersion { .. } => {
                None
            }
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

fn classify_sqlite_error(err: &rusqlite::Error) -> StoreErrorKind {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return StoreErrorKind::Other;
    };

    match failure.extended_code {
        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            StoreErrorKind::UniqueViolation
        }
        rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreErrorKind::ForeignKeyViolation,
        _ => StoreErrorKind::Other,
    }
}

fn compact_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
