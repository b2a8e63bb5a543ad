//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections from a [`DbConfig`].
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.
//! - Returned connections expose `unicode_lower(text)`, which folds case with
//!   Unicode rules (SQLite's built-in `LOWER` folds ASCII only).
//! - Every failure is reported as [`DbError::Connection`] with the cause text.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::config::{DbConfig, DbLocation};
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens and bootstraps the connection described by `config`.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub(crate) fn open_connection(config: &DbConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = mode_label(&config.database);
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match &config.database {
        DbLocation::File(path) => Connection::open(path),
        DbLocation::Memory => Connection::open_in_memory(),
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(connection_error(config, &err));
        }
    };

    match bootstrap_connection(&mut conn, config.busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            match err {
                DbError::UnsupportedSchemaVersion { .. } => Err(err),
                other => Err(connection_error(config, &other)),
            }
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA encoding = 'UTF-8';")?;
    conn.busy_timeout(busy_timeout)?;
    register_functions(conn)?;
    apply_migrations(conn)?;
    Ok(())
}

/// SQL name of the Unicode-aware lowercase function used by searches and
/// case-insensitive name lookups.
pub(crate) const UNICODE_LOWER_FN: &str = "unicode_lower";

fn register_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        UNICODE_LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )?;
    Ok(())
}

fn connection_error(config: &DbConfig, cause: &dyn std::fmt::Display) -> DbError {
    DbError::Connection {
        target: config.database.to_string(),
        message: cause.to_string(),
    }
}

fn mode_label(location: &DbLocation) -> &'static str {
    match location {
        DbLocation::File(_) => "file",
        DbLocation::Memory => "memory",
    }
}
