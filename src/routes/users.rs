//! User routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use tracing::{error, warn};

use crate::error::{ErrorBody, ErrorCode};
use crate::repository::{ConstraintKind, StoreError};
use crate::services::user::{RegisterUser, UserError};
use crate::state::AppState;

/// `POST /api/users` — register a user.
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<RegisterUser>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new("E_VALIDATION", rejection.body_text())))
                .into_response();
        }
    };

    match state.users.register_user(req).await {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(e) => user_error_response(&state, &e),
    }
}

/// `GET /api/users/:id` — fetch one user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.users.get_user(&id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ErrorBody::new("E_NOT_FOUND", format!("user {id} not found"))))
            .into_response(),
        Err(e) => user_error_response(&state, &e),
    }
}

pub(crate) fn user_error_status(err: &UserError, duplicate_email_status: StatusCode) -> StatusCode {
    match err {
        UserError::Validation(_) => StatusCode::BAD_REQUEST,
        UserError::Store(StoreError::Constraint(v)) if v.kind == ConstraintKind::Unique => duplicate_email_status,
        UserError::Store(StoreError::Constraint(_)) => StatusCode::BAD_REQUEST,
        UserError::Store(StoreError::Db(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn user_error_response(state: &AppState, err: &UserError) -> Response {
    let status = user_error_status(err, state.duplicate_email_status);
    let body = if status.is_server_error() {
        error!(error = %err, code = err.error_code(), retryable = err.retryable(), "user request failed");
        ErrorBody::internal(err)
    } else {
        warn!(error = %err, code = err.error_code(), "user request rejected");
        ErrorBody::from_error(err)
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
