use chrono::{DateTime, Utc};
use rocket_db_pools::sqlx::{self, FromRow, PgPool, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::passwords::PasswordService;
use crate::auth::AuthResult;

/// The authoritative principal record. The password hash lives only in the
/// `users` table and never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_guest: bool,
}

/// Principal + credential store contract.
///
/// `validate_credentials` answers None for an unknown username and for a
/// password mismatch alike, so callers cannot enumerate usernames.
#[rocket::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<User>>;

    async fn create(&self, new_user: NewUser) -> AuthResult<User>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
    passwords: PasswordService,
}

impl PgUserStore {
    pub fn new(pool: PgPool, passwords: PasswordService) -> Self {
        Self { pool, passwords }
    }
}

#[rocket::async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, first_name, last_name, is_admin, is_guest, created_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, first_name, last_name, is_admin, is_guest, created_at, password_hash
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let password_hash: String = row.try_get("password_hash")?;
        if !self.passwords.verify_password(password, &password_hash)? {
            return Ok(None);
        }

        Ok(Some(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            is_admin: row.try_get("is_admin")?,
            is_guest: row.try_get("is_guest")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn create(&self, new_user: NewUser) -> AuthResult<User> {
        let password_hash = self.passwords.hash_password(&new_user.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, first_name, last_name, is_admin, is_guest)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, username, first_name, last_name, is_admin, is_guest, created_at",
        )
        .bind(&new_user.username)
        .bind(&password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.is_admin)
        .bind(new_user.is_guest)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
