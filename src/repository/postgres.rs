//! Postgres-backed `UserRepository`.
//!
//! Each call checks out one connection, runs one statement under the pool's
//! query deadline, and drops the connection before returning.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{NewUser, StoreError, User, UserRepository};
use crate::db::Pool;
use crate::db::migrate::MigratedPool;

const INSERT_USER: &str = "INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id, email, name";
const SELECT_USER_BY_ID: &str = "SELECT id, email, name FROM users WHERE id = $1";

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    /// Only a migrated pool is accepted, so no query runs against a stale schema.
    #[must_use]
    pub fn new(db: &MigratedPool) -> Self {
        Self { pool: db.pool().clone() }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let created: User = self
            .pool
            .timed::<_, StoreError, _>(
                sqlx::query_as::<_, User>(INSERT_USER)
                    .bind(&user.email)
                    .bind(&user.name)
                    .fetch_one(&mut *conn),
            )
            .await?;

        debug!(user_id = %created.id, "user row inserted");
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        self.pool
            .timed(
                sqlx::query_as::<_, User>(SELECT_USER_BY_ID)
                    .bind(id)
                    .fetch_optional(&mut *conn),
            )
            .await
    }
}

#[cfg(all(test, feature = "live-db-tests"))]
#[path = "postgres_test.rs"]
mod tests;
