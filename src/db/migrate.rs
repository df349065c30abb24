//! Migration barrier and schema policy.
//!
//! SYSTEM CONTEXT
//! ==============
//! Repositories are built from a `MigratedPool`, and the only ways to get one
//! are `run` (apply pending migrations) and `ensure_current` (verify nothing
//! is pending). That makes "migrations before first query" a compile-time
//! ordering instead of a per-request check.
//!
//! Email uniqueness is deployment policy rather than schema history, so it is
//! applied after migrations as an idempotent index create/drop.

use sqlx::migrate::{MigrateError, Migrator};
use tracing::info;

use super::{DbError, Pool};

/// Embedded scripts from `src/db/migrations/`, applied in ascending version order.
pub static MIGRATOR: Migrator = sqlx::migrate!("src/db/migrations");

/// Name of the unique index backing `EmailUniqueness::Enforced`.
pub const EMAIL_UNIQUE_INDEX: &str = "users_email_key";

const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailUniqueness {
    /// Storage rejects a second row with the same email.
    Enforced,
    /// Duplicate emails are stored as separate users.
    Unenforced,
}

/// A pool whose database has every embedded migration applied.
#[derive(Debug, Clone)]
pub struct MigratedPool {
    pool: Pool,
}

impl MigratedPool {
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// Apply all pending migrations.
///
/// # Errors
///
/// `PoolClosed` if the pool was shut down, `Migration` if a script fails or
/// the applied history diverges from the embedded scripts.
pub async fn run(pool: &Pool) -> Result<MigratedPool, DbError> {
    if pool.is_closed() {
        return Err(DbError::PoolClosed);
    }

    let available = MIGRATOR.iter().count();
    info!(available, "applying pending migrations");
    MIGRATOR.run(pool.pg()).await?;
    info!("migrations up to date");

    Ok(MigratedPool { pool: pool.clone() })
}

/// Accept the database only if nothing is pending. Used when boot is not
/// allowed to alter the schema.
///
/// # Errors
///
/// `Migration` if an applied script no longer matches its embedded checksum,
/// `PendingMigrations` with the number of unapplied scripts, or a database
/// error if the history table cannot be read.
pub async fn ensure_current(pool: &Pool) -> Result<MigratedPool, DbError> {
    if pool.is_closed() {
        return Err(DbError::PoolClosed);
    }

    let applied = applied_migrations(pool).await?;
    if let Some(&version) = modified_versions(&applied, available_checksums()).first() {
        return Err(DbError::Migration(MigrateError::VersionMismatch(version)));
    }

    let versions: Vec<i64> = applied.iter().map(|(version, _)| *version).collect();
    let pending = pending_versions(&versions, available_versions());
    if !pending.is_empty() {
        return Err(DbError::PendingMigrations { pending: pending.len() });
    }

    Ok(MigratedPool { pool: pool.clone() })
}

/// Create or drop the email unique index to match `policy`.
///
/// # Errors
///
/// Returns a database error if the DDL fails, including when existing
/// duplicate rows prevent building the index.
pub async fn apply_email_policy(db: &MigratedPool, policy: EmailUniqueness) -> Result<(), DbError> {
    let sql = match policy {
        EmailUniqueness::Enforced => format!("CREATE UNIQUE INDEX IF NOT EXISTS {EMAIL_UNIQUE_INDEX} ON users (email)"),
        EmailUniqueness::Unenforced => format!("DROP INDEX IF EXISTS {EMAIL_UNIQUE_INDEX}"),
    };

    info!(?policy, "applying email uniqueness policy");
    let pool = db.pool();
    pool.timed::<_, DbError, _>(sqlx::query(&sql).execute(pool.pg()))
        .await?;
    Ok(())
}

fn available_versions() -> impl Iterator<Item = i64> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
}

fn available_checksums() -> impl Iterator<Item = (i64, &'static [u8])> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| (m.version, m.checksum.as_ref()))
}

/// `(version, checksum)` of every successfully applied migration.
async fn applied_migrations(pool: &Pool) -> Result<Vec<(i64, Vec<u8>)>, DbError> {
    let query = sqlx::query_as::<_, (i64, Vec<u8>)>(
        "SELECT version, checksum FROM _sqlx_migrations WHERE success ORDER BY version",
    );
    match pool.timed::<_, DbError, _>(query.fetch_all(pool.pg())).await {
        Ok(applied) => Ok(applied),
        // No history table yet: nothing has ever been applied.
        Err(DbError::Query(sqlx::Error::Database(e))) if e.code().as_deref() == Some(UNDEFINED_TABLE) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Applied versions whose recorded checksum differs from the embedded script,
/// in ascending order.
fn modified_versions<'a>(
    applied: &[(i64, Vec<u8>)],
    available: impl IntoIterator<Item = (i64, &'a [u8])>,
) -> Vec<i64> {
    let mut modified: Vec<i64> = available
        .into_iter()
        .filter(|(version, checksum)| {
            applied
                .iter()
                .any(|(v, recorded)| v == version && recorded.as_slice() != *checksum)
        })
        .map(|(version, _)| version)
        .collect();
    modified.sort_unstable();
    modified
}

/// Versions in `available` that are missing from `applied`, in ascending order.
fn pending_versions(applied: &[i64], available: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut pending: Vec<i64> = available
        .into_iter()
        .filter(|v| !applied.contains(v))
        .collect();
    pending.sort_unstable();
    pending
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
