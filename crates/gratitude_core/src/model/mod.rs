//! Domain model for users, categories and quotes.
//!
//! # Responsibility
//! - Define the in-memory shape of every persisted entity.
//! - Own pure, side-effect-free field validation.
//! - Define the patch structures that enumerate updatable fields.
//!
//! # Invariants
//! - An entity id is `None` until the repository persists it and never
//!   changes afterwards; only the repository layer can assign it.
//! - Timestamps are Unix epoch milliseconds (UTC).

use std::time::{SystemTime, UNIX_EPOCH};

pub mod category;
pub mod quote;
pub mod user;
pub mod validation;

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}
