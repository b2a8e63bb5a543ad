//! Dynamic `WHERE` composition for optional-field filters.
//!
//! # Invariants
//! - Predicates are joined with `AND` in insertion order.
//! - Caller values only ever travel as bound parameters.
//! - Substring search matches literally: LIKE wildcards in the term are escaped.
//! - Both the column and the term are folded with Unicode case rules, so
//!   `Éxito` and `éxito` match each other.

use crate::db::UNICODE_LOWER_FN;
use rusqlite::types::Value;

#[derive(Debug, Clone, Default)]
pub(crate) struct WhereClause {
    predicates: Vec<String>,
    bind_values: Vec<Value>,
}

impl WhereClause {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds one predicate with exactly as many `?` placeholders as `values`.
    pub(crate) fn and(
        &mut self,
        predicate: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> &mut Self {
        self.predicates.push(predicate.into());
        self.bind_values.extend(values);
        self
    }

    /// Adds a case-insensitive substring match over any of `columns`.
    ///
    /// Blank terms add nothing.
    pub(crate) fn and_contains_any(&mut self, columns: &[&str], term: &str) -> &mut Self {
        let trimmed = term.trim();
        if trimmed.is_empty() || columns.is_empty() {
            return self;
        }

        let pattern = like_pattern(trimmed);
        let predicate = columns
            .iter()
            .map(|column| format!("{UNICODE_LOWER_FN}({column}) LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let values = columns
            .iter()
            .map(|_| Value::Text(pattern.clone()))
            .collect::<Vec<_>>();
        self.and(format!("({predicate})"), values)
    }

    /// Renders ` WHERE a AND b`, or an empty string when nothing was added.
    pub(crate) fn sql(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        format!(" WHERE {}", self.predicates.join(" AND "))
    }

    pub(crate) fn into_bind_values(self) -> Vec<Value> {
        self.bind_values
    }
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::{like_pattern, WhereClause};
    use rusqlite::types::Value;

    #[test]
    fn empty_clause_renders_nothing() {
        let clause = WhereClause::new();
        assert_eq!(clause.sql(), "");
        assert!(clause.into_bind_values().is_empty());
    }

    #[test]
    fn predicates_join_with_and_in_order() {
        let mut clause = WhereClause::new();
        clause
            .and("f.status = ?", [Value::Text("published".to_string())])
            .and_contains_any(&["f.texto", "f.autor"], "Hope");

        assert_eq!(
            clause.sql(),
            " WHERE f.status = ? AND (unicode_lower(f.texto) LIKE ? ESCAPE '\\' OR unicode_lower(f.autor) LIKE ? ESCAPE '\\')"
        );
        assert_eq!(
            clause.into_bind_values(),
            vec![
                Value::Text("published".to_string()),
                Value::Text("%hope%".to_string()),
                Value::Text("%hope%".to_string()),
            ]
        );
    }

    #[test]
    fn blank_search_term_is_ignored() {
        let mut clause = WhereClause::new();
        clause.and_contains_any(&["nombre"], "   ");
        assert_eq!(clause.sql(), "");
    }

    #[test]
    fn search_term_is_folded_with_unicode_rules() {
        assert_eq!(like_pattern("ÉXITO Ánimo"), "%éxito ánimo%");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }
}
