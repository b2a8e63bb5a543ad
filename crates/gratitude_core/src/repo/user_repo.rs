//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist accounts with hashed credentials in `usuario`.
//! - Authenticate email/password pairs.
//!
//! # Invariants
//! - Plaintext passwords are hashed before any store interaction and never
//!   logged or stored.
//! - A taken email surfaces as `RepoError::Duplicate`, not a store error.
//! - Emails are normalized before every write and lookup, so account
//!   identity is case-insensitive.
//! - `authenticate` only fails on store errors; unknown email or wrong
//!   password yield `Ok(None)`.

use crate::credential::{hash_password, verify_password};
use crate::db::{ConnectionManager, DbError, StoreErrorKind};
use crate::model::user::{
    normalize_email, password_is_acceptable, User, UserId, UserPatch, PASSWORD_RULE,
};
use crate::model::validation::ValidationReport;
use crate::repo::{bind_text, Page, RepoError, RepoResult};
use log::info;
use rusqlite::types::Value;
use rusqlite::Row;

const ENTITY: &str = "user";

const USER_SELECT_SQL: &str = "SELECT
    id_user,
    nombre,
    correo_electronico,
    password_hash,
    fecha_creacion,
    rol
FROM usuario";

/// Repository interface for account operations.
pub trait UserRepository {
    /// Validates, hashes `plaintext`, inserts, and assigns id/creation time.
    fn create(&self, user: &mut User, plaintext: &str) -> RepoResult<UserId>;
    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Lists users, newest first.
    fn find_all(&self, page: Page) -> RepoResult<Vec<User>>;
    fn count(&self) -> RepoResult<i64>;
    /// Merges `patch`, re-validates, and persists name/email/role.
    fn update(&self, user: &mut User, patch: UserPatch) -> RepoResult<()>;
    fn update_password(&self, user: &mut User, plaintext: &str) -> RepoResult<()>;
    /// Returns whether a row was removed.
    fn delete(&self, user: &User) -> RepoResult<bool>;
    fn authenticate(&self, email: &str, plaintext: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'db> {
    db: &'db ConnectionManager,
}

impl<'db> SqliteUserRepository<'db> {
    pub fn new(db: &'db ConnectionManager) -> Self {
        Self { db }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create(&self, user: &mut User, plaintext: &str) -> RepoResult<UserId> {
        if let Some(id) = user.id() {
            return Err(RepoError::AlreadyPersisted { entity: ENTITY, id });
        }
        user.validate_for_create(plaintext).into_result()?;

        let email = normalize_email(&user.email);
        let password_hash = hash_password(plaintext);
        let outcome = self
            .db
            .execute(
                "INSERT INTO usuario (nombre, correo_electronico, password_hash, rol)
                 VALUES (?, ?, ?, ?);",
                &[
                    bind_text(user.name.trim()),
                    bind_text(&email),
                    bind_text(&password_hash),
                    Value::from(user.role),
                ],
            )
            .map_err(map_write_error)?;

        let id = outcome.last_insert_id;
        let created_at = self
            .db
            .query_one(
                "SELECT fecha_creacion FROM usuario WHERE id_user = ?;",
                &[Value::Integer(id)],
                |row| row.get::<_, i64>(0),
            )?
            .ok_or_else(|| RepoError::InvalidData(format!("user {id} missing after insert")))?;

        user.name = user.name.trim().to_string();
        user.email = email;
        user.set_password_hash(password_hash);
        user.assign_id(id, created_at);
        info!("event=user_create module=repo status=ok id={id}");
        Ok(id)
    }

    fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self.db.query_one(
            &format!("{USER_SELECT_SQL} WHERE id_user = ?;"),
            &[Value::Integer(id)],
            parse_user_row,
        )?;
        Ok(user)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = self.db.query_one(
            &format!("{USER_SELECT_SQL} WHERE correo_electronico = ? COLLATE NOCASE;"),
            &[bind_text(&normalize_email(email))],
            parse_user_row,
        )?;
        Ok(user)
    }

    fn find_all(&self, page: Page) -> RepoResult<Vec<User>> {
        let mut sql = format!("{USER_SELECT_SQL} ORDER BY fecha_creacion DESC, id_user DESC");
        let mut bind_values = Vec::new();
        page.push_sql(&mut sql, &mut bind_values);

        let users = self.db.query(&sql, &bind_values, parse_user_row)?;
        Ok(users)
    }

    fn count(&self) -> RepoResult<i64> {
        let total = self
            .db
            .query_one("SELECT COUNT(*) FROM usuario;", &[], |row| row.get(0))?;
        Ok(total.unwrap_or(0))
    }

    fn update(&self, user: &mut User, patch: UserPatch) -> RepoResult<()> {
        let id = user.id().ok_or(RepoError::MissingId { entity: ENTITY })?;

        let mut merged = user.clone();
        merged.apply(patch);
        merged.validate().into_result()?;
        merged.name = merged.name.trim().to_string();
        merged.email = normalize_email(&merged.email);

        self.db
            .execute(
                "UPDATE usuario
                 SET nombre = ?, correo_electronico = ?, rol = ?
                 WHERE id_user = ?;",
                &[
                    bind_text(&merged.name),
                    bind_text(&merged.email),
                    Value::from(merged.role),
                    Value::Integer(id),
                ],
            )
            .map_err(map_write_error)?;

        *user = merged;
        Ok(())
    }

    fn update_password(&self, user: &mut User, plaintext: &str) -> RepoResult<()> {
        let id = user.id().ok_or(RepoError::MissingId { entity: ENTITY })?;
        if !password_is_acceptable(plaintext) {
            let mut report = ValidationReport::new();
            report.check(false, PASSWORD_RULE);
            return Err(RepoError::Validation(report));
        }

        let password_hash = hash_password(plaintext);
        self.db.execute(
            "UPDATE usuario SET password_hash = ? WHERE id_user = ?;",
            &[bind_text(&password_hash), Value::Integer(id)],
        )?;

        user.set_password_hash(password_hash);
        info!("event=user_password_update module=repo status=ok id={id}");
        Ok(())
    }

    fn delete(&self, user: &User) -> RepoResult<bool> {
        let id = user.id().ok_or(RepoError::MissingId { entity: ENTITY })?;

        match self.db.execute(
            "DELETE FROM usuario WHERE id_user = ?;",
            &[Value::Integer(id)],
        ) {
            Ok(outcome) => Ok(outcome.affected_rows > 0),
            Err(err) if err.store_kind() == StoreErrorKind::ForeignKeyViolation => {
                let dependents = self
                    .db
                    .query_one(
                        "SELECT COUNT(*) FROM frase WHERE creado_por = ?;",
                        &[Value::Integer(id)],
                        |row| row.get(0),
                    )?
                    .unwrap_or(0);
                Err(RepoError::Dependency {
                    entity: ENTITY,
                    id,
                    dependents,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn authenticate(&self, email: &str, plaintext: &str) -> RepoResult<Option<User>> {
        let Some(user) = self.find_by_email(email)? else {
            info!("event=user_authenticate module=repo status=rejected reason=unknown_account");
            return Ok(None);
        };

        if verify_password(plaintext, user.password_hash()) {
            info!(
                "event=user_authenticate module=repo status=ok id={}",
                user.id().unwrap_or_default()
            );
            Ok(Some(user))
        } else {
            info!("event=user_authenticate module=repo status=rejected reason=bad_credentials");
            Ok(None)
        }
    }
}

fn map_write_error(err: DbError) -> RepoError {
    match err.store_kind() {
        StoreErrorKind::UniqueViolation => RepoError::Duplicate {
            entity: ENTITY,
            field: "email",
        },
        _ => RepoError::Db(err),
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User::from_store(
        row.get("id_user")?,
        row.get("nombre")?,
        row.get("correo_electronico")?,
        row.get("password_hash")?,
        row.get("fecha_creacion")?,
        row.get("rol")?,
    ))
}
