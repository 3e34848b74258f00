use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, FromRow, PgPool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthResult;

/// A server-side revocable login session, one per successful login.
///
/// `valid` is monotonic: it only ever transitions true to false. Rows are
/// deleted by the external account-deletion flow (FK cascade), never here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub user_agent: String,
    pub valid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Source of truth for session revocation.
#[rocket::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user_id: Uuid, user_agent: &str) -> AuthResult<Session>;

    async fn list_active(&self, user_id: Uuid) -> AuthResult<Vec<Session>>;

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>>;

    /// Set `valid = false`. Idempotent: invalidating an already-invalid
    /// session is a no-op success. Returns the updated record, None when the
    /// id is unknown.
    async fn invalidate(&self, id: Uuid) -> AuthResult<Option<Session>>;
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, user_id: Uuid, user_agent: &str) -> AuthResult<Session> {
        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (user_id, user_agent)
             VALUES ($1, $2)
             RETURNING id, user_id, user_agent, valid, created_at, updated_at",
        )
        .bind(user_id)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn list_active(&self, user_id: Uuid) -> AuthResult<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, user_agent, valid, created_at, updated_at
             FROM sessions
             WHERE user_id = $1 AND valid
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, user_agent, valid, created_at, updated_at
             FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn invalidate(&self, id: Uuid) -> AuthResult<Option<Session>> {
        // Last-write-wins single-row update; no valid-state precondition so
        // repeated logouts stay no-op successes.
        let session = sqlx::query_as::<_, Session>(
            "UPDATE sessions
             SET valid = FALSE, updated_at = now()
             WHERE id = $1
             RETURNING id, user_id, user_agent, valid, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
