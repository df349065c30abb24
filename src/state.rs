//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! carries the user service (which owns a handle to the repository and,
//! through it, the pool) plus the HTTP-level policy for duplicate emails.
//! There is no process-wide singleton: `main` builds one `AppState` from an
//! explicitly created pool and passes it to the router.

use axum::http::StatusCode;

use crate::services::user::UserService;

/// Clone is required by Axum; all inner fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    /// Status for a unique-email violation: 409 or 400.
    pub duplicate_email_status: StatusCode,
}

impl AppState {
    #[must_use]
    pub fn new(users: UserService, duplicate_email_status: StatusCode) -> Self {
        Self { users, duplicate_email_status }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
