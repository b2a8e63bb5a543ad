//! Quote model and its publication lifecycle.
//!
//! # Responsibility
//! - Hold quote content, ownership and publication state.
//! - Validate content bounds and scheduling constraints.
//! - Provide the in-memory side of `publish`/`schedule`/`draft` transitions.
//!
//! # Invariants
//! - `status == Scheduled` requires `scheduled_at` to be set.
//! - Any set `scheduled_at` must be strictly after the validation instant.
//! - Any status may move to any other; validation is the only guard.

use crate::model::category::CategoryId;
use crate::model::now_epoch_ms;
use crate::model::user::UserId;
use crate::model::validation::{char_len, ValidationReport};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type QuoteId = i64;

pub const QUOTE_TEXT_MIN_CHARS: usize = 10;
pub const QUOTE_TEXT_MAX_CHARS: usize = 1000;
pub const QUOTE_AUTHOR_MAX_CHARS: usize = 120;

pub(crate) const TEXT_RULE: &str = "text must be between 10 and 1000 characters";
pub(crate) const AUTHOR_RULE: &str = "author must be at most 120 characters";
pub(crate) const CREATOR_RULE: &str = "creator id must be a positive integer";
pub(crate) const CATEGORY_RULE: &str = "category id must be a positive integer";
pub(crate) const STATUS_RULE: &str = "status must be one of: draft, scheduled, published";
pub(crate) const SCHEDULE_REQUIRED_RULE: &str = "scheduled status requires a scheduled_at timestamp";
pub(crate) const SCHEDULE_FUTURE_RULE: &str = "scheduled_at must be in the future";

/// Publication state stored in `frase.status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Scheduled,
    Published,
}

impl QuoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
        }
    }
}

impl Display for QuoteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "scheduled" => Ok(Self::Scheduled),
            "published" => Ok(Self::Published),
            _ => Err(STATUS_RULE.to_string()),
        }
    }
}

impl FromSql for QuoteStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|_| {
            FromSqlError::Other(format!("invalid status `{text}` in frase.status").into())
        })
    }
}

impl From<QuoteStatus> for Value {
    fn from(value: QuoteStatus) -> Self {
        Value::Text(value.as_str().to_string())
    }
}

/// Quote record, optionally enriched with creator/category display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    #[serde(rename = "id_quote")]
    id: Option<QuoteId>,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "autor")]
    pub author: Option<String>,
    /// Assigned by the store on insert.
    #[serde(rename = "fecha_creacion")]
    pub created_at: Option<i64>,
    pub scheduled_at: Option<i64>,
    pub status: QuoteStatus,
    #[serde(rename = "creado_por")]
    pub created_by: UserId,
    pub category_id: CategoryId,
    /// Joined `usuario.nombre`; only present on detailed reads.
    #[serde(rename = "creado_por_nombre", skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    /// Joined `categoria.nombre`; only present on detailed reads.
    #[serde(rename = "categoria_nombre", skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}

/// Updatable quote fields. Nullable columns use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotePatch {
    pub text: Option<String>,
    pub author: Option<Option<String>>,
    pub scheduled_at: Option<Option<i64>>,
    pub status: Option<QuoteStatus>,
    pub created_by: Option<UserId>,
    pub category_id: Option<CategoryId>,
}

impl Quote {
    /// Creates an unsaved draft quote.
    pub fn new(text: impl Into<String>, created_by: UserId, category_id: CategoryId) -> Self {
        Self {
            id: None,
            text: text.into(),
            author: None,
            created_at: None,
            scheduled_at: None,
            status: QuoteStatus::Draft,
            created_by,
            category_id,
            creator_name: None,
            category_name: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_status(mut self, status: QuoteStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_scheduled_at(mut self, scheduled_at: i64) -> Self {
        self.scheduled_at = Some(scheduled_at);
        self
    }

    pub(crate) fn set_id(&mut self, id: QuoteId) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<QuoteId> {
        self.id
    }

    /// Validates against the current wall clock.
    pub fn validate(&self) -> ValidationReport {
        self.validate_at(now_epoch_ms())
    }

    /// Validates treating `now_ms` as the present instant.
    pub fn validate_at(&self, now_ms: i64) -> ValidationReport {
        let mut report = ValidationReport::new();
        let text_len = char_len(self.text.trim());
        report.check(
            (QUOTE_TEXT_MIN_CHARS..=QUOTE_TEXT_MAX_CHARS).contains(&text_len),
            TEXT_RULE,
        );
        report.check(
            self.author
                .as_deref()
                .map_or(true, |author| char_len(author) <= QUOTE_AUTHOR_MAX_CHARS),
            AUTHOR_RULE,
        );
        report.check(self.created_by > 0, CREATOR_RULE);
        report.check(self.category_id > 0, CATEGORY_RULE);
        report.check(
            self.status != QuoteStatus::Scheduled || self.scheduled_at.is_some(),
            SCHEDULE_REQUIRED_RULE,
        );
        report.check(
            self.scheduled_at.map_or(true, |at| at > now_ms),
            SCHEDULE_FUTURE_RULE,
        );
        report
    }

    pub fn apply(&mut self, patch: QuotePatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(author) = patch.author {
            self.author = author;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            self.scheduled_at = scheduled_at;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(created_by) = patch.created_by {
            self.created_by = created_by;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
    }

    pub(crate) fn mark_published(&mut self) {
        self.status = QuoteStatus::Published;
        self.scheduled_at = None;
    }

    pub(crate) fn mark_scheduled(&mut self, at: i64) {
        self.status = QuoteStatus::Scheduled;
        self.scheduled_at = Some(at);
    }

    pub(crate) fn mark_draft(&mut self) {
        self.status = QuoteStatus::Draft;
        self.scheduled_at = None;
    }
}
