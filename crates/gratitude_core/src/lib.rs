//! Data-access core for the gratitude quote application.
//! This crate is the single source of truth for entity invariants.

pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DbConfig, DbLocation};
pub use credential::{hash_password, verify_password};
pub use db::{
    open_db, open_db_in_memory, ConnectionManager, DbError, DbResult, StoreErrorKind,
    TransactionScope, WriteOutcome,
};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::category::{Category, CategoryId, CategoryPatch};
pub use model::now_epoch_ms;
pub use model::quote::{Quote, QuoteId, QuotePatch, QuoteStatus};
pub use model::user::{User, UserId, UserPatch, UserRole};
pub use model::validation::ValidationReport;
pub use repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
pub use repo::quote_repo::{GlobalQuoteStats, QuoteFilter, QuoteRepository, SqliteQuoteRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{Page, QuoteStats, RepoError, RepoResult, DEFAULT_PAGE_LIMIT};
pub use service::publication_service::PublicationService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
