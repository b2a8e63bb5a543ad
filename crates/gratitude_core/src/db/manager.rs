//! Single-connection manager shared by every repository.
//!
//! # Responsibility
//! - Own the one live SQLite connection for a process (or test).
//! - Execute parameterized statements and map rows through caller closures.
//! - Expose explicit transaction control and last-insert-id lookup.
//!
//! # Invariants
//! - At most one connection exists per manager.
//! - The connection lock is held for exactly one statement and released on
//!   every exit path, so statement submissions are serialized.
//! - Statements only ever receive caller values as bound parameters.
//! - `commit`/`rollback` are no-ops while disconnected.
//! - `transaction` keeps the lock for the whole unit of work, so statements
//!   from other callers run before or after it, never inside it. The
//!   explicit `begin_transaction`/`commit`/`rollback` calls do not isolate
//!   concurrent callers that share the manager.

use super::open::open_connection;
use super::{DbError, DbResult, StoreErrorKind};
use crate::config::DbConfig;
use log::{error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Result descriptor for write statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub affected_rows: usize,
    /// Row id generated by the most recent successful insert on the connection.
    pub last_insert_id: i64,
}

/// Owner of the process-wide store connection.
///
/// Repositories borrow the manager; they never hold a raw connection.
#[derive(Debug)]
pub struct ConnectionManager {
    config: DbConfig,
    slot: Mutex<Option<Connection>>,
}

impl ConnectionManager {
    /// Creates a disconnected manager. The first statement connects lazily.
    pub fn new(config: DbConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Establishes the connection; no-op when already connected.
    pub fn connect(&self) -> DbResult<()> {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(open_connection(&self.config)?);
        }
        Ok(())
    }

    /// Closes the connection if one is open; no-op otherwise.
    ///
    /// Internal state is cleared even when the driver reports a close error.
    pub fn disconnect(&self) -> DbResult<()> {
        let Some(conn) = self.lock().take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                info!("event=db_close module=db status=ok");
                Ok(())
            }
            Err((_, err)) => {
                error!("event=db_close module=db status=error error={err}");
                Err(DbError::Sqlite(err))
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs a read statement and maps every row through `map`.
    pub fn query<T, F>(&self, sql: &str, params: &[Value], map: F) -> DbResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| run_query(conn, sql, params, map))
    }

    /// Runs a read statement and maps the first row, if any.
    pub fn query_one<T, F>(&self, sql: &str, params: &[Value], map: F) -> DbResult<Option<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| run_query_one(conn, sql, params, map))
    }

    /// Runs a write statement and reports affected rows and the insert id.
    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<WriteOutcome> {
        self.with_connection(|conn| run_execute(conn, sql, params))
    }

    pub fn begin_transaction(&self) -> DbResult<()> {
        self.with_connection(|conn| {
            conn.execute_batch("BEGIN;")
                .map_err(|err| query_failed("BEGIN;", &[], err))
        })
    }

    pub fn commit(&self) -> DbResult<()> {
        self.if_connected("COMMIT;")
    }

    pub fn rollback(&self) -> DbResult<()> {
        self.if_connected("ROLLBACK;")
    }

    /// Runs `work` inside `BEGIN`/`COMMIT`, rolling back when it fails.
    ///
    /// The connection stays locked until the transaction ends; `work` issues
    /// its statements through the [`TransactionScope`] and must not call back
    /// into this manager. A rollback failure, if any, is logged and the
    /// original error returned.
    pub fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&TransactionScope<'_>) -> Result<T, E>,
    {
        let mut slot = self.lock();
        let conn = connected(&mut slot, &self.config)?;
        conn.execute_batch("BEGIN;")
            .map_err(|err| query_failed("BEGIN;", &[], err))?;

        match work(&TransactionScope { conn }) {
            Ok(value) => {
                conn.execute_batch("COMMIT;")
                    .map_err(|err| query_failed("COMMIT;", &[], err))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                    warn!("event=db_rollback module=db status=error error={rollback_err}");
                }
                Err(err)
            }
        }
    }

    /// Returns the row id generated by the last insert on this connection.
    pub fn last_insert_id(&self) -> DbResult<i64> {
        self.lock()
            .as_ref()
            .map(Connection::last_insert_rowid)
            .ok_or(DbError::State("no active connection"))
    }

    fn if_connected(&self, sql: &'static str) -> DbResult<()> {
        let slot = self.lock();
        let Some(conn) = slot.as_ref() else {
            return Ok(());
        };
        conn.execute_batch(sql)
            .map_err(|err| query_failed(sql, &[], err))
    }

    fn with_connection<T>(&self, work: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let mut slot = self.lock();
        work(connected(&mut slot, &self.config)?)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Statement access to a connection held for one [`ConnectionManager::transaction`].
pub struct TransactionScope<'conn> {
    conn: &'conn Connection,
}

impl TransactionScope<'_> {
    pub fn query<T, F>(&self, sql: &str, params: &[Value], map: F) -> DbResult<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        run_query(self.conn, sql, params, map)
    }

    pub fn query_one<T, F>(&self, sql: &str, params: &[Value], map: F) -> DbResult<Option<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        run_query_one(self.conn, sql, params, map)
    }

    pub fn execute(&self, sql: &str, params: &[Value]) -> DbResult<WriteOutcome> {
        run_execute(self.conn, sql, params)
    }
}

/// Opens a file-backed store and returns a connected manager.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<ConnectionManager> {
    let manager = ConnectionManager::new(DbConfig::file(path.as_ref()));
    manager.connect()?;
    Ok(manager)
}

/// Opens an in-memory store and returns a connected manager.
///
/// The data lives only as long as the connection; `disconnect` discards it.
pub fn open_db_in_memory() -> DbResult<ConnectionManager> {
    let manager = ConnectionManager::new(DbConfig::in_memory());
    manager.connect()?;
    Ok(manager)
}

/// Returns the open connection in `slot`, connecting first when empty.
fn connected<'slot>(
    slot: &'slot mut Option<Connection>,
    config: &DbConfig,
) -> DbResult<&'slot Connection> {
    if slot.is_none() {
        *slot = Some(open_connection(config)?);
    }
    slot.as_ref()
        .ok_or(DbError::State("connection unavailable after connect"))
}

fn run_query<T, F>(conn: &Connection, sql: &str, params: &[Value], mut map: F) -> DbResult<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    collect_rows(conn, sql, params, &mut map).map_err(|err| query_failed(sql, params, err))
}

fn run_query_one<T, F>(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    mut map: F,
) -> DbResult<Option<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    first_row(conn, sql, params, &mut map).map_err(|err| query_failed(sql, params, err))
}

fn run_execute(conn: &Connection, sql: &str, params: &[Value]) -> DbResult<WriteOutcome> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|err| query_failed(sql, params, err))?;
    let affected_rows = stmt
        .execute(params_from_iter(params.iter()))
        .map_err(|err| query_failed(sql, params, err))?;
    Ok(WriteOutcome {
        affected_rows,
        last_insert_id: conn.last_insert_rowid(),
    })
}

fn collect_rows<T, F>(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    map: &mut F,
) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(map(row)?);
    }
    Ok(items)
}

fn first_row<T, F>(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    map: &mut F,
) -> rusqlite::Result<Option<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    match rows.next()? {
        Some(row) => Ok(Some(map(row)?)),
        None => Ok(None),
    }
}

fn query_failed(sql: &str, params: &[Value], source: rusqlite::Error) -> DbError {
    let err = DbError::query(sql, params, source);
    if let DbError::Query { sql, params, source } = &err {
        match err.store_kind() {
            StoreErrorKind::UniqueViolation | StoreErrorKind::ForeignKeyViolation => warn!(
                "event=db_query module=db status=rejected error_code=constraint_violation param_count={} sql={} error={}",
                params.len(),
                sql,
                source
            ),
            StoreErrorKind::Other => error!(
                "event=db_query module=db status=error error_code=query_failed param_count={} sql={} error={}",
                params.len(),
                sql,
                source
            ),
        }
    }
    err
}
