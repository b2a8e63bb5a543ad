//! Category model: topical grouping for quotes.

use crate::model::validation::{char_len, ValidationReport};
use serde::Serialize;

pub type CategoryId = i64;

pub const CATEGORY_NAME_MIN_CHARS: usize = 2;
pub const CATEGORY_NAME_MAX_CHARS: usize = 80;
pub const CATEGORY_DESCRIPTION_MAX_CHARS: usize = 255;

pub(crate) const NAME_RULE: &str = "name must be between 2 and 80 characters";
pub(crate) const DESCRIPTION_RULE: &str = "description must be at most 255 characters";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    #[serde(rename = "id_category")]
    id: Option<CategoryId>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
}

/// Updatable category fields; `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description,
        }
    }

    pub(crate) fn from_store(id: CategoryId, name: String, description: Option<String>) -> Self {
        Self {
            id: Some(id),
            name,
            description,
        }
    }

    pub fn id(&self) -> Option<CategoryId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: CategoryId) {
        self.id = Some(id);
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let name_len = char_len(self.name.trim());
        report.check(
            (CATEGORY_NAME_MIN_CHARS..=CATEGORY_NAME_MAX_CHARS).contains(&name_len),
            NAME_RULE,
        );
        report.check(
            self.description
                .as_deref()
                .map_or(true, |text| char_len(text) <= CATEGORY_DESCRIPTION_MAX_CHARS),
            DESCRIPTION_RULE,
        );
        report
    }

    pub fn apply(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }
}
