//! Quote repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist quotes and drive the draft/scheduled/published lifecycle.
//! - Compose filtered list/count queries from [`QuoteFilter`].
//! - Compute per-user and global publication statistics.
//!
//! # Invariants
//! - Every write re-validates the merged quote before the store sees it.
//! - `find_all` and `count` share one predicate builder, so
//!   `count(f) == find_all(f, Page::unbounded()).len()`.
//! - Lists are ordered by `fecha_creacion DESC, id_quote DESC` unless a
//!   specialized finder says otherwise.
//! - Nothing here flips due scheduled quotes to published on its own.

use crate::db::{ConnectionManager, DbError, StoreErrorKind};
use crate::model::category::CategoryId;
use crate::model::now_epoch_ms;
use crate::model::quote::{Quote, QuoteId, QuotePatch, QuoteStatus};
use crate::model::user::UserId;
use crate::repo::filter::WhereClause;
use crate::repo::{
    bind_opt_int, bind_opt_text, bind_text, Page, QuoteStats, RepoError, RepoResult,
    QUOTE_STATS_COLUMNS,
};
use log::info;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::Serialize;

const ENTITY: &str = "quote";

const QUOTE_COLUMNS: &str = "f.id_quote,
    f.texto,
    f.autor,
    f.fecha_creacion,
    f.scheduled_at,
    f.status,
    f.creado_por,
    f.categoria_id";

/// Optional-field filter; present fields are combined with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
    pub category_id: Option<CategoryId>,
    pub created_by: Option<UserId>,
    /// Case-insensitive substring over text or author.
    pub search: Option<String>,
}

/// Global breakdown plus contributor and category coverage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalQuoteStats {
    #[serde(flatten)]
    pub quotes: QuoteStats,
    /// Distinct users that created at least one quote.
    pub contributors: i64,
    /// Distinct categories referenced by at least one quote.
    pub categories_in_use: i64,
}

/// Repository interface for quote operations.
pub trait QuoteRepository {
    fn create(&self, quote: &mut Quote) -> RepoResult<QuoteId>;
    /// Gets one quote; `include_details` joins creator and category names.
    fn find_by_id(&self, id: QuoteId, include_details: bool) -> RepoResult<Option<Quote>>;
    fn find_all(&self, filter: &QuoteFilter, page: Page) -> RepoResult<Vec<Quote>>;
    fn find_published(&self, filter: &QuoteFilter, page: Page) -> RepoResult<Vec<Quote>>;
    /// Scheduled quotes whose `scheduled_at` is at or before `now_ms`,
    /// oldest due first.
    fn find_scheduled_due(&self, now_ms: i64) -> RepoResult<Vec<Quote>>;
    /// Random sample of published quotes, optionally within one category.
    fn find_random(&self, count: u32, category_id: Option<CategoryId>) -> RepoResult<Vec<Quote>>;
    fn count(&self, filter: &QuoteFilter) -> RepoResult<i64>;
    fn update(&self, quote: &mut Quote, patch: QuotePatch) -> RepoResult<()>;
    fn publish(&self, quote: &mut Quote) -> RepoResult<()>;
    fn schedule(&self, quote: &mut Quote, at_epoch_ms: i64) -> RepoResult<()>;
    fn draft(&self, quote: &mut Quote) -> RepoResult<()>;
    /// Returns whether a row was removed.
    fn delete(&self, quote: &Quote) -> RepoResult<bool>;
    fn user_stats(&self, user_id: UserId) -> RepoResult<QuoteStats>;
    fn global_stats(&self) -> RepoResult<GlobalQuoteStats>;

    /// Scheduled quotes already due at the current instant.
    fn find_scheduled(&self) -> RepoResult<Vec<Quote>> {
        self.find_scheduled_due(now_epoch_ms())
    }
}

/// SQLite-backed quote repository.
pub struct SqliteQuoteRepository<'db> {
    db: &'db ConnectionManager,
}

impl<'db> SqliteQuoteRepository<'db> {
    pub fn new(db: &'db ConnectionManager) -> Self {
        Self { db }
    }

    fn list(
        &self,
        clause: WhereClause,
        order_by: &str,
        page: Page,
    ) -> RepoResult<Vec<Quote>> {
        let mut sql = format!("{}{} ORDER BY {order_by}", detail_select_sql(), clause.sql());
        let mut bind_values = clause.into_bind_values();
        page.push_sql(&mut sql, &mut bind_values);

        let quotes = self.db.query(&sql, &bind_values, parse_quote_row)?;
        Ok(quotes)
    }

    /// Validates `next` and writes every mutable column for `id`.
    fn persist(&self, id: QuoteId, next: &Quote) -> RepoResult<()> {
        next.validate().into_result()?;

        let outcome = self
            .db
            .execute(
                "UPDATE frase
                 SET texto = ?, autor = ?, scheduled_at = ?, status = ?, creado_por = ?, categoria_id = ?
                 WHERE id_quote = ?;",
                &[
                    bind_text(next.text.trim()),
                    bind_opt_text(next.author.as_deref()),
                    bind_opt_int(next.scheduled_at),
                    Value::from(next.status),
                    Value::Integer(next.created_by),
                    Value::Integer(next.category_id),
                    Value::Integer(id),
                ],
            )
            .map_err(|err| self.map_write_error(err, next))?;

        if outcome.affected_rows == 0 {
            return Err(RepoError::InvalidData(format!("quote {id} no longer exists")));
        }
        Ok(())
    }

    /// Applies `change` to a copy, persists it, then commits it to `quote`.
    fn transition(&self, quote: &mut Quote, change: impl FnOnce(&mut Quote)) -> RepoResult<()> {
        let id = quote.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        let mut next = quote.clone();
        change(&mut next);
        self.persist(id, &next)?;

        if next.created_by != quote.created_by {
            next.creator_name = None;
        }
        if next.category_id != quote.category_id {
            next.category_name = None;
        }
        next.text = next.text.trim().to_string();
        *quote = next;
        Ok(())
    }

    fn map_write_error(&self, err: DbError, quote: &Quote) -> RepoError {
        if err.store_kind() != StoreErrorKind::ForeignKeyViolation {
            return RepoError::Db(err);
        }

        let creator_exists = self.db.query_one(
            "SELECT 1 FROM usuario WHERE id_user = ?;",
            &[Value::Integer(quote.created_by)],
            |row| row.get::<_, i64>(0),
        );
        match creator_exists {
            Ok(Some(_)) => RepoError::Reference { entity: "category" },
            Ok(None) => RepoError::Reference { entity: "user" },
            Err(lookup_err) => RepoError::Db(lookup_err),
        }
    }
}

impl QuoteRepository for SqliteQuoteRepository<'_> {
    fn create(&self, quote: &mut Quote) -> RepoResult<QuoteId> {
        if let Some(id) = quote.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }
        quote.validate().into_result()?;

        let outcome = self
            .db
            .execute(
                "INSERT INTO frase (texto, autor, scheduled_at, status, creado_por, categoria_id)
                 VALUES (?, ?, ?, ?, ?, ?);",
                &[
                    bind_text(quote.text.trim()),
                    bind_opt_text(quote.author.as_deref()),
                    bind_opt_int(quote.scheduled_at),
                    Value::from(quote.status),
                    Value::Integer(quote.created_by),
                    Value::Integer(quote.category_id),
                ],
            )
            .map_err(|err| self.map_write_error(err, quote))?;

        let id = outcome.last_insert_id;
        let created_at = self
            .db
            .query_one(
                "SELECT fecha_creacion FROM frase WHERE id_quote = ?;",
                &[Value::Integer(id)],
                |row| row.get::<_, i64>(0),
            )?
            .ok_or_else(|| RepoError::InvalidData(format!("quote {id} missing after insert")))?;

        quote.text = quote.text.trim().to_string();
        quote.created_at = Some(created_at);
        quote.set_id(id);
        info!(
            "event=quote_create module=repo status=ok id={} quote_status={}",
            id, quote.status
        );
        Ok(id)
    }

    fn find_by_id(&self, id: QuoteId, include_details: bool) -> RepoResult<Option<Quote>> {
        let select = if include_details {
            detail_select_sql()
        } else {
            plain_select_sql()
        };
        let quote = self.db.query_one(
            &format!("{select} WHERE f.id_quote = ?;"),
            &[Value::Integer(id)],
            parse_quote_row,
        )?;
        Ok(quote)
    }

    fn find_all(&self, filter: &QuoteFilter, page: Page) -> RepoResult<Vec<Quote>> {
        self.list(
            filter_clause(filter),
            "f.fecha_creacion DESC, f.id_quote DESC",
            page,
        )
    }

    fn find_published(&self, filter: &QuoteFilter, page: Page) -> RepoResult<Vec<Quote>> {
        let published = QuoteFilter {
            status: Some(QuoteStatus::Published),
            ..filter.clone()
        };
        self.find_all(&published, page)
    }

    fn find_scheduled_due(&self, now_ms: i64) -> RepoResult<Vec<Quote>> {
        let mut clause = WhereClause::new();
        clause
            .and("f.status = ?", [Value::from(QuoteStatus::Scheduled)])
            .and("f.scheduled_at <= ?", [Value::Integer(now_ms)]);
        self.list(
            clause,
            "f.scheduled_at ASC, f.id_quote ASC",
            Page::unbounded(),
        )
    }

    fn find_random(&self, count: u32, category_id: Option<CategoryId>) -> RepoResult<Vec<Quote>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut clause = WhereClause::new();
        clause.and("f.status = ?", [Value::from(QuoteStatus::Published)]);
        if let Some(category_id) = category_id {
            clause.and("f.categoria_id = ?", [Value::Integer(category_id)]);
        }
        self.list(clause, "RANDOM()", Page::new(count, 0))
    }

    fn count(&self, filter: &QuoteFilter) -> RepoResult<i64> {
        let clause = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM frase f{};", clause.sql());
        let total = self
            .db
            .query_one(&sql, &clause.into_bind_values(), |row| row.get(0))?;
        Ok(total.unwrap_or(0))
    }

    fn update(&self, quote: &mut Quote, patch: QuotePatch) -> RepoResult<()> {
        self.transition(quote, |next| next.apply(patch))
    }

    fn publish(&self, quote: &mut Quote) -> RepoResult<()> {
        self.transition(quote, Quote::mark_published)
    }

    fn schedule(&self, quote: &mut Quote, at_epoch_ms: i64) -> RepoResult<()> {
        self.transition(quote, |next| next.mark_scheduled(at_epoch_ms))
    }

    fn draft(&self, quote: &mut Quote) -> RepoResult<()> {
        self.transition(quote, Quote::mark_draft)
    }

    fn delete(&self, quote: &Quote) -> RepoResult<bool> {
        let id = quote.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        let outcome = self.db.execute(
            "DELETE FROM frase WHERE id_quote = ?;",
            &[Value::Integer(id)],
        )?;
        Ok(outcome.affected_rows > 0)
    }

    fn user_stats(&self, user_id: UserId) -> RepoResult<QuoteStats> {
        let stats = self
            .db
            .query_one(
                &format!("SELECT {QUOTE_STATS_COLUMNS} FROM frase f WHERE f.creado_por = ?;"),
                &[Value::Integer(user_id)],
                QuoteStats::from_row,
            )?
            .unwrap_or_default();
        Ok(stats)
    }

    fn global_stats(&self) -> RepoResult<GlobalQuoteStats> {
        let stats = self
            .db
            .query_one(
                &format!(
                    "SELECT {QUOTE_STATS_COLUMNS},
                        COUNT(DISTINCT f.creado_por) AS contributors,
                        COUNT(DISTINCT f.categoria_id) AS categories_in_use
                     FROM frase f;"
                ),
                &[],
                |row| {
                    Ok(GlobalQuoteStats {
                        quotes: QuoteStats::from_row(row)?,
                        contributors: row.get("contributors")?,
                        categories_in_use: row.get("categories_in_use")?,
                    })
                },
            )?
            .unwrap_or_default();
        Ok(stats)
    }
}

fn filter_clause(filter: &QuoteFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    if let Some(status) = filter.status {
        clause.and("f.status = ?", [Value::from(status)]);
    }
    if let Some(category_id) = filter.category_id {
        clause.and("f.categoria_id = ?", [Value::Integer(category_id)]);
    }
    if let Some(created_by) = filter.created_by {
        clause.and("f.creado_por = ?", [Value::Integer(created_by)]);
    }
    if let Some(search) = filter.search.as_deref() {
        clause.and_contains_any(&["f.texto", "f.autor"], search);
    }
    clause
}

fn detail_select_sql() -> String {
    format!(
        "SELECT {QUOTE_COLUMNS},
            u.nombre AS creado_por_nombre,
            c.nombre AS categoria_nombre
         FROM frase f
         LEFT JOIN usuario u ON u.id_user = f.creado_por
         LEFT JOIN categoria c ON c.id_category = f.categoria_id"
    )
}

fn plain_select_sql() -> String {
    format!(
        "SELECT {QUOTE_COLUMNS},
            NULL AS creado_por_nombre,
            NULL AS categoria_nombre
         FROM frase f"
    )
}

fn parse_quote_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
    let mut quote = Quote::new(
        row.get::<_, String>("texto")?,
        row.get("creado_por")?,
        row.get("categoria_id")?,
    );
    quote.set_id(row.get("id_quote")?);
    quote.author = row.get("autor")?;
    quote.created_at = Some(row.get("fecha_creacion")?);
    quote.scheduled_at = row.get("scheduled_at")?;
    quote.status = row.get("status")?;
    quote.creator_name = row.get("creado_por_nombre")?;
    quote.category_name = row.get("categoria_nombre")?;
    Ok(quote)
}
