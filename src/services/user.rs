//! User service — request validation in front of the repository.
//!
//! DESIGN
//! ======
//! Request bodies arrive as `RegisterUser`, an explicit schema whose fields
//! are optional so that "missing" and "blank" are both caught here rather than
//! surfacing as decode errors. Nothing reaches the repository until the input
//! is valid. Repository failures pass through untouched: the service adds
//! validation, it does not reinterpret persistence errors.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::repository::{NewUser, StoreError, User, UserRepository};

// =============================================================================
// TYPES
// =============================================================================

/// Body of a registration request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUser {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("{0} must not contain NUL characters")]
    NulCharacter(&'static str),
    #[error("malformed user id: {0:?}")]
    MalformedId(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for UserError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Store(e) => e.retryable(),
        }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// Stateless apart from the injected repository; clones share it.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    #[must_use]
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Validate and store a new user.
    ///
    /// # Errors
    ///
    /// `Validation` if `email` or `name` is missing, blank or contains a NUL
    /// character (the repository is not called), otherwise whatever the
    /// repository returned.
    pub async fn register_user(&self, req: RegisterUser) -> Result<User, UserError> {
        let new_user = validate_registration(req)?;
        let user = self.repo.create(new_user).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Fetch a user by its string id. `Ok(None)` when no such user exists.
    ///
    /// # Errors
    ///
    /// `Validation` if `id` is not a UUID, otherwise whatever the repository
    /// returned.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, UserError> {
        let id = parse_user_id(id)?;
        Ok(self.repo.find_by_id(id).await?)
    }
}

pub(crate) fn validate_registration(req: RegisterUser) -> Result<NewUser, ValidationError> {
    let email = required_field("email", req.email)?;
    let name = required_field("name", req.name)?;
    Ok(NewUser { email, name })
}

/// Stored exactly as given; whitespace only decides whether the field is blank.
fn required_field(field: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::Missing(field))?;
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    // Postgres text cannot hold U+0000.
    if value.contains('\0') {
        return Err(ValidationError::NulCharacter(field));
    }
    Ok(value)
}

pub(crate) fn parse_user_id(raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ValidationError::MalformedId(raw.to_owned()))
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
