#![allow(dead_code)]

use std::sync::Arc;

use auth_server::auth::users::{NewUser, User, UserStore};
use auth_server::auth::{AuthConfig, AuthState};
use auth_server::test_support::{MemorySessionStore, MemoryUserStore};

pub const ACCESS_SECRET: &str = "access-secret-for-tests";
pub const REFRESH_SECRET: &str = "refresh-secret-for-tests";

pub fn test_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: ACCESS_SECRET.into(),
        refresh_token_secret: REFRESH_SECRET.into(),
        access_token_ttl_secs: 900,
        refresh_token_ttl_secs: 86400,
    }
}

/// Same secrets, but every access token minted is already expired, well past
/// the verifier's clock leeway.
pub fn expired_access_config() -> AuthConfig {
    AuthConfig {
        access_token_ttl_secs: -120,
        ..test_config()
    }
}

/// Auth state over in-memory stores, with handles kept for direct
/// manipulation from tests.
pub struct TestBackend {
    pub state: AuthState,
    pub users: Arc<MemoryUserStore>,
    pub sessions: Arc<MemorySessionStore>,
}

pub fn memory_backend() -> TestBackend {
    let users = Arc::new(MemoryUserStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let state = AuthState::new(test_config(), users.clone(), sessions.clone());
    TestBackend {
        state,
        users,
        sessions,
    }
}

pub async fn seed_user(users: &MemoryUserStore, username: &str, is_admin: bool) -> User {
    users
        .create(NewUser {
            username: username.into(),
            password: "testpwd".into(),
            first_name: "first".into(),
            last_name: "last".into(),
            is_admin,
            is_guest: false,
        })
        .await
        .expect("user created")
}
