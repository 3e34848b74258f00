//! Authentication module: configuration, token codec, session lifecycle,
//! the per-request fairing, Rocket request guards, and HTTP route handlers.

use std::sync::Arc;

use rocket_db_pools::sqlx::PgPool;

pub mod config;
pub mod error;
pub mod fairing;
pub mod guards;
pub mod passwords;
pub mod responses;
pub mod routes;
pub mod service;
pub mod sessions;
pub mod tokens;
pub mod users;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use fairing::{AuthContext, Authentication};
pub use guards::{AuthUser, RequireAdmin};
pub use service::SessionService;
pub use tokens::TokenCodec;

use crate::auth::passwords::PasswordService;
use crate::auth::sessions::{PgSessionStore, SessionStore};
use crate::auth::users::{PgUserStore, UserStore};

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub service: Arc<SessionService>,
    pub users: Arc<dyn UserStore>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let codec = TokenCodec::from_config(&config);
        let service = Arc::new(SessionService::new(codec, sessions, users.clone()));
        Self {
            config,
            service,
            users,
        }
    }

    /// Wire the Postgres-backed stores onto a shared pool.
    pub fn postgres(pool: PgPool, config: AuthConfig) -> AuthResult<Self> {
        let passwords = PasswordService::new()?;
        let users = Arc::new(PgUserStore::new(pool.clone(), passwords));
        let sessions = Arc::new(PgSessionStore::new(pool));
        Ok(Self::new(config, users, sessions))
    }
}
