//! Process configuration parsed from environment variables.
//!
//! Numeric tuning knobs fall back to their defaults when missing or
//! unparseable. Enumerated knobs and the connection target are strict: a bad
//! value refuses to boot rather than silently picking a policy.

use std::time::Duration;

use axum::http::StatusCode;

use crate::db::PoolConfig;
use crate::db::migrate::EmailUniqueness;
use crate::error::ErrorCode;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_DB_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_DB_QUERY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid {key}: {value:?} ({expected})")]
    Invalid { key: &'static str, value: String, expected: &'static str },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG"
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub pool: PoolConfig,
    /// Apply pending migrations at boot. When false, boot fails if any are pending.
    pub run_migrations: bool,
    pub email_uniqueness: EmailUniqueness,
    /// Status returned when an insert trips the email uniqueness constraint.
    pub duplicate_email_status: StatusCode,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `DB_ACQUIRE_TIMEOUT_MS`, `DB_CONNECT_TIMEOUT_MS`, `DB_QUERY_TIMEOUT_MS`
    /// - `DB_RUN_MIGRATIONS`: `true` (default) or `false`
    /// - `EMAIL_UNIQUENESS`: `enforced` (default) or `unenforced`
    /// - `DUPLICATE_EMAIL_STATUS`: `409` (default) or `400`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `DATABASE_URL` is missing or an enumerated
    /// knob holds an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            pool: pool_config_from_env(),
            run_migrations: parse_bool("DB_RUN_MIGRATIONS", std::env::var("DB_RUN_MIGRATIONS").ok().as_deref(), true)?,
            email_uniqueness: parse_email_uniqueness(std::env::var("EMAIL_UNIQUENESS").ok().as_deref())?,
            duplicate_email_status: parse_duplicate_status(std::env::var("DUPLICATE_EMAIL_STATUS").ok().as_deref())?,
        })
    }
}

/// Pool tuning from `DB_*` variables; shared by the server and the test harness.
#[must_use]
pub fn pool_config_from_env() -> PoolConfig {
    PoolConfig {
        max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS).max(1),
        acquire_timeout: Duration::from_millis(env_parse("DB_ACQUIRE_TIMEOUT_MS", DEFAULT_DB_ACQUIRE_TIMEOUT_MS)),
        connect_timeout: Duration::from_millis(env_parse("DB_CONNECT_TIMEOUT_MS", DEFAULT_DB_CONNECT_TIMEOUT_MS)),
        query_timeout: Duration::from_millis(env_parse("DB_QUERY_TIMEOUT_MS", DEFAULT_DB_QUERY_TIMEOUT_MS)),
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(key: &'static str, raw: Option<&str>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value: raw.to_owned(), expected: "true or false" }),
    }
}

fn parse_email_uniqueness(raw: Option<&str>) -> Result<EmailUniqueness, ConfigError> {
    match raw.map(str::trim).unwrap_or("enforced") {
        "enforced" => Ok(EmailUniqueness::Enforced),
        "unenforced" => Ok(EmailUniqueness::Unenforced),
        other => Err(ConfigError::Invalid {
            key: "EMAIL_UNIQUENESS",
            value: other.to_owned(),
            expected: "'enforced' or 'unenforced'",
        }),
    }
}

fn parse_duplicate_status(raw: Option<&str>) -> Result<StatusCode, ConfigError> {
    match raw.map(str::trim).unwrap_or("409") {
        "409" => Ok(StatusCode::CONFLICT),
        "400" => Ok(StatusCode::BAD_REQUEST),
        other => Err(ConfigError::Invalid {
            key: "DUPLICATE_EMAIL_STATUS",
            value: other.to_owned(),
            expected: "409 or 400",
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
