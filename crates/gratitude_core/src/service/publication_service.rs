//! Publication use-case service.
//!
//! # Responsibility
//! - Publish scheduled quotes that have come due, when a caller asks.
//!
//! # Invariants
//! - Runs only when invoked; there is no background timer in core.
//! - Quotes are published oldest-due first; the first failure stops the run
//!   and is returned, leaving later quotes scheduled.

use crate::model::quote::Quote;
use crate::repo::quote_repo::QuoteRepository;
use crate::repo::RepoResult;
use log::info;

/// Service that moves due scheduled quotes to `published`.
pub struct PublicationService<R: QuoteRepository> {
    repo: R,
}

impl<R: QuoteRepository> PublicationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Publishes every scheduled quote due at or before `now_ms`.
    ///
    /// Returns the quotes as persisted after publication.
    pub fn publish_due(&self, now_ms: i64) -> RepoResult<Vec<Quote>> {
        let due = self.repo.find_scheduled_due(now_ms)?;
        let mut published = Vec::with_capacity(due.len());
        for mut quote in due {
            self.repo.publish(&mut quote)?;
            published.push(quote);
        }

        info!(
            "event=publish_due module=service status=ok published={}",
            published.len()
        );
        Ok(published)
    }

    /// Quotes that `publish_due(now_ms)` would publish.
    pub fn pending(&self, now_ms: i64) -> RepoResult<Vec<Quote>> {
        self.repo.find_scheduled_due(now_ms)
    }
}
