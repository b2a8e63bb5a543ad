//! Category repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and search over `categoria`.
//! - Guard deletion while quotes still reference a category.
//! - Expose per-category quote listings and statistics.
//!
//! # Invariants
//! - A taken name surfaces as `RepoError::Duplicate`. Names are unique
//!   regardless of case: `Ánimo` blocks `ánimo`.
//! - `delete(force = false)` never removes a category that has quotes.
//! - `delete(force = true)` relies on `ON DELETE CASCADE`: the category's
//!   quotes are removed together with it.

use crate::db::{ConnectionManager, DbError, StoreErrorKind, UNICODE_LOWER_FN};
use crate::model::category::{Category, CategoryId, CategoryPatch};
use crate::model::quote::Quote;
use crate::repo::filter::WhereClause;
use crate::repo::quote_repo::{QuoteFilter, QuoteRepository, SqliteQuoteRepository};
use crate::repo::{
    bind_opt_text, bind_text, Page, QuoteStats, RepoError, RepoResult, QUOTE_STATS_COLUMNS,
};
use log::{info, warn};
use rusqlite::types::Value;
use rusqlite::Row;

const ENTITY: &str = "category";

const CATEGORY_SELECT_SQL: &str = "SELECT
    id_category,
    nombre,
    descripcion
FROM categoria";

/// Repository interface for category operations.
pub trait CategoryRepository {
    fn create(&self, category: &mut Category) -> RepoResult<CategoryId>;
    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    /// Lists categories by name ascending.
    fn find_all(&self, page: Page) -> RepoResult<Vec<Category>>;
    /// Case-insensitive substring match on name or description, by name.
    fn search(&self, term: &str, page: Page) -> RepoResult<Vec<Category>>;
    fn count(&self) -> RepoResult<i64>;
    fn update(&self, category: &mut Category, patch: CategoryPatch) -> RepoResult<()>;
    /// Returns whether a row was removed.
    fn delete(&self, category: &Category, force: bool) -> RepoResult<bool>;
    fn quote_count(&self, category: &Category) -> RepoResult<i64>;
    fn quotes(&self, category: &Category, page: Page) -> RepoResult<Vec<Quote>>;
    fn stats(&self, category: &Category) -> RepoResult<QuoteStats>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'db> {
    db: &'db ConnectionManager,
}

impl<'db> SqliteCategoryRepository<'db> {
    pub fn new(db: &'db ConnectionManager) -> Self {
        Self { db }
    }

    fn list(&self, clause: WhereClause, page: Page) -> RepoResult<Vec<Category>> {
        let mut sql = format!(
            "{CATEGORY_SELECT_SQL}{} ORDER BY nombre ASC, id_category ASC",
            clause.sql()
        );
        let mut bind_values = clause.into_bind_values();
        page.push_sql(&mut sql, &mut bind_values);

        let categories = self.db.query(&sql, &bind_values, parse_category_row)?;
        Ok(categories)
    }

    /// Whether another category already uses `name`, compared case-insensitively.
    fn name_taken(&self, name: &str, except: Option<CategoryId>) -> RepoResult<bool> {
        let taken = self.db.query_one(
            &format!(
                "SELECT 1 FROM categoria
                 WHERE {UNICODE_LOWER_FN}(nombre) = {UNICODE_LOWER_FN}(?) AND id_category <> ?
                 LIMIT 1;"
            ),
            &[bind_text(name), Value::Integer(except.unwrap_or(0))],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(taken.is_some())
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create(&self, category: &mut Category) -> RepoResult<CategoryId> {
        if let Some(id) = category.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }
        category.validate().into_result()?;
        if self.name_taken(category.name.trim(), None)? {
            return Err(duplicate_name());
        }

        let outcome = self
            .db
            .execute(
                "INSERT INTO categoria (nombre, descripcion) VALUES (?, ?);",
                &[
                    bind_text(category.name.trim()),
                    bind_opt_text(category.description.as_deref()),
                ],
            )
            .map_err(map_write_error)?;

        category.name = category.name.trim().to_string();
        category.assign_id(outcome.last_insert_id);
        info!(
            "event=category_create module=repo status=ok id={}",
            outcome.last_insert_id
        );
        Ok(outcome.last_insert_id)
    }

    fn find_by_id(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let category = self.db.query_one(
            &format!("{CATEGORY_SELECT_SQL} WHERE id_category = ?;"),
            &[Value::Integer(id)],
            parse_category_row,
        )?;
        Ok(category)
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let category = self.db.query_one(
            &format!(
                "{CATEGORY_SELECT_SQL}
                 WHERE {UNICODE_LOWER_FN}(nombre) = {UNICODE_LOWER_FN}(?)
                 LIMIT 1;"
            ),
            &[bind_text(name.trim())],
            parse_category_row,
        )?;
        Ok(category)
    }

    fn find_all(&self, page: Page) -> RepoResult<Vec<Category>> {
        self.list(WhereClause::new(), page)
    }

    fn search(&self, term: &str, page: Page) -> RepoResult<Vec<Category>> {
        let mut clause = WhereClause::new();
        clause.and_contains_any(&["nombre", "descripcion"], term);
        self.list(clause, page)
    }

    fn count(&self) -> RepoResult<i64> {
        let total = self
            .db
            .query_one("SELECT COUNT(*) FROM categoria;", &[], |row| row.get(0))?;
        Ok(total.unwrap_or(0))
    }

    fn update(&self, category: &mut Category, patch: CategoryPatch) -> RepoResult<()> {
        let id = category.id().ok_or(RepoError::MissingId { entity: ENTITY })?;

        let mut merged = category.clone();
        merged.apply(patch);
        merged.validate().into_result()?;
        merged.name = merged.name.trim().to_string();
        if self.name_taken(&merged.name, Some(id))? {
            return Err(duplicate_name());
        }

        self.db
            .execute(
                "UPDATE categoria SET nombre = ?, descripcion = ? WHERE id_category = ?;",
                &[
                    bind_text(&merged.name),
                    bind_opt_text(merged.description.as_deref()),
                    Value::Integer(id),
                ],
            )
            .map_err(map_write_error)?;

        *category = merged;
        Ok(())
    }

    fn delete(&self, category: &Category, force: bool) -> RepoResult<bool> {
        let id = category.id().ok_or(RepoError::MissingId { entity: ENTITY })?;

        let dependents = self.quote_count(category)?;
        if dependents > 0 {
            if !force {
                return Err(RepoError::Dependency {
                    entity: ENTITY,
                    id,
                    dependents,
                });
            }
            warn!(
                "event=category_delete module=repo status=forced id={id} cascaded_quotes={dependents}"
            );
        }

        let outcome = self.db.execute(
            "DELETE FROM categoria WHERE id_category = ?;",
            &[Value::Integer(id)],
        )?;
        Ok(outcome.affected_rows > 0)
    }

    fn quote_count(&self, category: &Category) -> RepoResult<i64> {
        let id = category.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        let total = self.db.query_one(
            "SELECT COUNT(*) FROM frase WHERE categoria_id = ?;",
            &[Value::Integer(id)],
            |row| row.get(0),
        )?;
        Ok(total.unwrap_or(0))
    }

    fn quotes(&self, category: &Category, page: Page) -> RepoResult<Vec<Quote>> {
        let id = category.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        let filter = QuoteFilter {
            category_id: Some(id),
            ..QuoteFilter::default()
        };
        SqliteQuoteRepository::new(self.db).find_all(&filter, page)
    }

    fn stats(&self, category: &Category) -> RepoResult<QuoteStats> {
        let id = category.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        let stats = self
            .db
            .query_one(
                &format!("SELECT {QUOTE_STATS_COLUMNS} FROM frase f WHERE f.categoria_id = ?;"),
                &[Value::Integer(id)],
                QuoteStats::from_row,
            )?
            .unwrap_or_default();
        Ok(stats)
    }
}

fn duplicate_name() -> RepoError {
    RepoError::Duplicate {
        entity: ENTITY,
        field: "name",
    }
}

fn map_write_error(err: DbError) -> RepoError {
    match err.store_kind() {
        StoreErrorKind::UniqueViolation => duplicate_name(),
        _ => RepoError::Db(err),
    }
}

fn parse_category_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category::from_store(
        row.get("id_category")?,
        row.get("nombre")?,
        row.get("descripcion")?,
    ))
}
