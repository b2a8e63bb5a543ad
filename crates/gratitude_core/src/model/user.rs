//! User account model.
//!
//! # Responsibility
//! - Hold account identity, role and credential hash.
//! - Validate account fields before persistence.
//!
//! # Invariants
//! - `password_hash` never leaves the crate through serialization.
//! - Emails are compared and stored in their normalized (trimmed, lowercase)
//!   form; `ANA@x.com` and `ana@x.com` are the same account.
//! - Before `create`, the plaintext credential is validated separately and
//!   only its hash is ever stored on the model.

use crate::model::validation::{char_len, ValidationReport};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type UserId = i64;

pub const USER_NAME_MIN_CHARS: usize = 2;
pub const PASSWORD_MIN_CHARS: usize = 6;

pub(crate) const NAME_RULE: &str = "name must be at least 2 characters";
pub(crate) const EMAIL_RULE: &str = "email must be a valid address (local@domain.tld)";
pub(crate) const PASSWORD_RULE: &str = "password must be at least 6 characters";
pub(crate) const ROLE_RULE: &str = "role must be one of: admin, user";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Account role stored in `usuario.rol`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(ROLE_RULE.to_string()),
        }
    }
}

impl FromSql for UserRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|_| FromSqlError::Other(format!("invalid role `{text}` in usuario.rol").into()))
    }
}

impl From<UserRole> for Value {
    fn from(value: UserRole) -> Self {
        Value::Text(value.as_str().to_string())
    }
}

/// Account record. Serializes without the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    #[serde(rename = "id_user")]
    id: Option<UserId>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "correo_electronico")]
    pub email: String,
    #[serde(skip_serializing)]
    password_hash: String,
    /// Assigned by the store on insert.
    #[serde(rename = "fecha_creacion")]
    pub created_at: Option<i64>,
    #[serde(rename = "rol")]
    pub role: UserRole,
}

/// Updatable user fields. Credentials change through `update_password` only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

impl User {
    /// Creates an unsaved user; the credential is supplied to `create`.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            password_hash: String::new(),
            created_at: None,
            role,
        }
    }

    pub(crate) fn from_store(
        id: UserId,
        name: String,
        email: String,
        password_hash: String,
        created_at: i64,
        role: UserRole,
    ) -> Self {
        Self {
            id: Some(id),
            name,
            email,
            password_hash,
            created_at: Some(created_at),
            role,
        }
    }

    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub(crate) fn assign_id(&mut self, id: UserId, created_at: i64) {
        self.id = Some(id);
        self.created_at = Some(created_at);
    }

    pub(crate) fn set_password_hash(&mut self, hash: String) {
        self.password_hash = hash;
    }

    /// Validates persisted account fields (name, email).
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.check_identity(&mut report);
        report
    }

    /// Validates an unsaved account together with its plaintext credential.
    pub fn validate_for_create(&self, plaintext: &str) -> ValidationReport {
        let mut report = ValidationReport::new();
        self.check_identity(&mut report);
        report.check(password_is_acceptable(plaintext), PASSWORD_RULE);
        report
    }

    /// Applies the present patch fields in place.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
    }

    fn check_identity(&self, report: &mut ValidationReport) {
        report.check(char_len(self.name.trim()) >= USER_NAME_MIN_CHARS, NAME_RULE);
        report.check(EMAIL_RE.is_match(self.email.trim()), EMAIL_RULE);
    }
}

/// Canonical form of an email address for storage and lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn password_is_acceptable(plaintext: &str) -> bool {
    char_len(plaintext) >= PASSWORD_MIN_CHARS
}
