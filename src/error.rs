//! Shared error-reporting contract.
//!
//! DESIGN
//! ======
//! Each layer owns its own `thiserror` enum. They all implement `ErrorCode`
//! so the HTTP layer can render a stable machine-readable code and tell
//! clients whether a retry is worthwhile, without matching on every variant
//! of every layer.

use serde::Serialize;

pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Wire shape of an error response body: `{"error": {...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ErrorBody {
    pub fn from_error(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self {
            error: ErrorDetail { code: err.error_code(), message: err.to_string(), retryable: err.retryable() },
        }
    }

    /// Body for a server-side failure: code and retryable flag only, the
    /// detail stays in the log.
    pub fn internal(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self {
            error: ErrorDetail {
                code: err.error_code(),
                message: INTERNAL_ERROR_MESSAGE.to_owned(),
                retryable: err.retryable(),
            },
        }
    }

    /// Body for a bare outcome that has no error value behind it (e.g. not found).
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { error: ErrorDetail { code, message: message.into(), retryable: false } }
    }
}
