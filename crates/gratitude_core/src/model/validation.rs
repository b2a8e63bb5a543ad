//! Structured validation outcome shared by every entity.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Pass/fail result with every violated rule, in rule order.
///
/// Produced by `validate()` on each entity; never an early exit on the first
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub(crate) fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub(crate) fn check(&mut self, passed: bool, message: impl Into<String>) {
        if !passed {
            self.is_valid = false;
            self.errors.push(message.into());
        }
    }

    /// Converts a failing report into an error, keeping passing ones as `Ok`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("validation passed");
        }
        write!(f, "validation failed: {}", self.errors.join("; "))
    }
}

impl Error for ValidationReport {}

/// Counts characters, not bytes, so multi-byte text is measured as users see it.
pub(crate) fn char_len(value: &str) -> usize {
    value.chars().count()
}
