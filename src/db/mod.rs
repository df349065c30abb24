//! Connection pool lifecycle.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup (or the test harness) creates exactly one `Pool`, runs migrations
//! through `migrate`, and only then hands the pool to the repository. The same
//! owner calls `shutdown` once at the end of its lifetime.
//!
//! DESIGN
//! ======
//! `Pool` wraps the SQLx `PgPool`, which already gives scoped acquisition:
//! a `PoolConnection` goes back to the pool on drop, so every exit path
//! releases it. On top of that this module adds bounded reachability on
//! create, a per-call query deadline, and a closed-state check that fails
//! fast instead of waiting on a pool that will never hand out connections.

pub mod migrate;
#[cfg(all(test, feature = "live-db-tests"))]
pub mod test_harness;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use tracing::{debug, info};

use crate::error::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

/// Pool sizing and timeouts. Built from `DB_*` env vars in `config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on live connections.
    pub max_connections: u32,
    /// How long `acquire` waits for a connection before `PoolExhausted`
    /// (pool full) or `ConnectTimeout` (pool had room, endpoint unreachable).
    pub acquire_timeout: Duration,
    /// How long `create` waits for the endpoint before `ConnectTimeout`.
    pub connect_timeout: Duration,
    /// Deadline for a single database call made through `timed`.
    pub query_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("invalid connection target: {0}")]
    Configuration(String),
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("database unreachable after {0:?}")]
    ConnectTimeout(Duration),
    #[error("no database connection available")]
    PoolExhausted,
    #[error("connection pool is closed")]
    PoolClosed,
    #[error("query exceeded {0:?}")]
    QueryTimeout(Duration),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("{pending} migration(s) pending, refusing to use database")]
    PendingMigrations { pending: usize },
    #[error("database error: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => Self::PoolExhausted,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::Configuration(e) => Self::Configuration(e.to_string()),
            sqlx::Error::Migrate(e) => Self::Migration(*e),
            transport @ (sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed) => Self::Connection(transport),
            other => Self::Query(other),
        }
    }
}

impl ErrorCode for DbError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "E_CONFIG",
            Self::Connection(_) | Self::ConnectTimeout(_) => "E_CONNECTION",
            Self::PoolExhausted => "E_POOL_EXHAUSTED",
            Self::PoolClosed => "E_POOL_CLOSED",
            Self::QueryTimeout(_) => "E_TIMEOUT",
            Self::Migration(_) | Self::PendingMigrations { .. } => "E_MIGRATION",
            Self::Query(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectTimeout(_) | Self::PoolExhausted | Self::QueryTimeout(_)
        )
    }
}

// =============================================================================
// POOL
// =============================================================================

/// Handle over a bounded set of Postgres connections.
///
/// Cloning is cheap and every clone shares the same connections, so
/// `shutdown` on any clone closes the pool for all of them.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: PgPool,
    config: PoolConfig,
}

impl Pool {
    /// Open a pool against a `postgres://` connection URI.
    ///
    /// # Errors
    ///
    /// `Configuration` if the URI does not parse, `ConnectTimeout` if the
    /// endpoint does not answer within `connect_timeout`, `Connection` if it
    /// refuses the session.
    pub async fn create(target: &str, config: &PoolConfig) -> Result<Self, DbError> {
        let options = PgConnectOptions::from_str(target).map_err(|e| DbError::Configuration(e.to_string()))?;
        Self::create_with(options, config).await
    }

    /// Open a pool from already-parsed connect options.
    ///
    /// # Errors
    ///
    /// Same as [`Pool::create`].
    pub async fn create_with(options: PgConnectOptions, config: &PoolConfig) -> Result<Self, DbError> {
        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or_default(),
            max_connections = config.max_connections,
            "opening database pool"
        );

        let connect = pool_options(config).connect_with(options);
        let inner = match tokio::time::timeout(config.connect_timeout, connect).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(sqlx::Error::PoolTimedOut)) | Err(_) => {
                return Err(DbError::ConnectTimeout(config.connect_timeout));
            }
            Ok(Err(sqlx::Error::Configuration(e))) => return Err(DbError::Configuration(e.to_string())),
            Ok(Err(err)) => return Err(DbError::Connection(err)),
        };

        Ok(Self { inner, config: *config })
    }

    /// Pool that opens connections on first use. Tests only: nothing is checked up front.
    #[cfg(test)]
    #[must_use]
    pub fn lazy(options: PgConnectOptions, config: &PoolConfig) -> Self {
        Self { inner: pool_options(config).connect_lazy_with(options), config: *config }
    }

    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Check out one connection for a single logical operation.
    ///
    /// The connection returns to the pool when the guard drops.
    ///
    /// # Errors
    ///
    /// `PoolClosed` after `shutdown`, `PoolExhausted` if every connection is
    /// in use and nothing frees up within `acquire_timeout`, `ConnectTimeout`
    /// if the pool had room but could not open a connection in that time,
    /// `Connection` if a fresh connection fails outright.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DbError> {
        if self.inner.is_closed() {
            return Err(DbError::PoolClosed);
        }
        match self.inner.acquire().await {
            Ok(conn) => Ok(conn),
            Err(sqlx::Error::PoolTimedOut) => Err(self.classify_acquire_timeout(self.inner.size())),
            Err(err) => Err(DbError::from(err)),
        }
    }

    // SQLx reports both "all connections busy" and "endpoint kept refusing
    // new connections" as PoolTimedOut; only a full pool is exhaustion.
    fn classify_acquire_timeout(&self, size: u32) -> DbError {
        if size < self.config.max_connections {
            DbError::ConnectTimeout(self.config.acquire_timeout)
        } else {
            DbError::PoolExhausted
        }
    }

    /// Run one database call under `query_timeout`.
    ///
    /// Generic over the caller's error type so repositories can classify the
    /// raw SQLx error themselves (constraint violations, for example).
    ///
    /// # Errors
    ///
    /// `QueryTimeout` (converted into `E`) when the deadline passes, otherwise
    /// whatever the call itself returned.
    pub async fn timed<T, E, F>(&self, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
        E: From<sqlx::Error> + From<DbError>,
    {
        let limit = self.config.query_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(E::from),
            Err(_) => Err(E::from(DbError::QueryTimeout(limit))),
        }
    }

    /// Close every connection. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.inner.is_closed() {
            debug!("database pool already shut down");
            return;
        }
        info!(size = self.inner.size(), idle = self.inner.num_idle(), "shutting down database pool");
        self.inner.close().await;
    }

    pub(crate) fn pg(&self) -> &PgPool {
        &self.inner
    }
}

fn pool_options(config: &PoolConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
