//! User storage contract.
//!
//! ARCHITECTURE
//! ============
//! `UserRepository` is the seam between domain code and Postgres. The service
//! layer only sees this trait, so tests can swap in a recording double while
//! production uses `PgUserRepository`, the one place that knows the `users`
//! table layout.
//!
//! Every method is one statement against the store; nothing here opens a
//! multi-statement transaction.

pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::error::ErrorKind;
use uuid::Uuid;

use crate::db::DbError;
use crate::error::ErrorCode;

pub use postgres::PgUserRepository;

// =============================================================================
// TYPES
// =============================================================================

/// A stored user. `id` is generated by the database and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Validated input for an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    NotNull,
    Check,
    ForeignKey,
}

impl ConstraintKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::NotNull => "not_null",
            Self::Check => "check",
            Self::ForeignKey => "foreign_key",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The store rejected the data. Retrying the same write will fail the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} constraint violated: {message}")]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub constraint: Option<String>,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let kind = match db_err.kind() {
                ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                _ => None,
            };
            if let Some(kind) = kind {
                return Self::Constraint(ConstraintViolation {
                    kind,
                    constraint: db_err.constraint().map(str::to_owned),
                    message: db_err.message().to_owned(),
                });
            }
        }
        Self::Db(DbError::from(err))
    }
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Constraint(_) => "E_CONSTRAINT",
            Self::Db(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Constraint(_) => false,
            Self::Db(e) => e.retryable(),
        }
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a row and return it with its generated `id`.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Look up one row. `Ok(None)` means no such user, not a failure.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
