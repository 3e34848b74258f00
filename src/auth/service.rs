use std::sync::Arc;

use uuid::Uuid;

use crate::auth::sessions::{Session, SessionStore};
use crate::auth::tokens::{IssuedToken, TokenClaims, TokenCodec, TokenKind};
use crate::auth::users::UserStore;
use crate::auth::{AuthError, AuthResult};

/// Everything minted by a successful login.
#[derive(Debug)]
pub struct IssuedSession {
    pub access_token: IssuedToken,
    pub refresh_token: IssuedToken,
    pub session: Session,
}

#[derive(Debug, Clone)]
pub struct TokenMetadata {
    pub algorithm: &'static str,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// Orchestrates login, session listing, logout, and silent renewal.
pub struct SessionService {
    codec: TokenCodec,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
}

impl SessionService {
    pub fn new(
        codec: TokenCodec,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            codec,
            sessions,
            users,
        }
    }

    /// Authenticate credentials, create a session, and mint both tokens.
    ///
    /// Unknown username and wrong password are indistinguishable to the
    /// caller: both are `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        user_agent: &str,
    ) -> AuthResult<IssuedSession> {
        let user = self
            .users
            .validate_credentials(username, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let session = self.sessions.create(user.id, user_agent).await?;

        let access_token = self.codec.issue(&user, session.id, TokenKind::Access)?;
        let refresh_token = self.codec.issue(&user, session.id, TokenKind::Refresh)?;

        log::debug!("user {} opened session {}", user.id, session.id);

        Ok(IssuedSession {
            access_token,
            refresh_token,
            session,
        })
    }

    pub async fn list_active_sessions(&self, user_id: Uuid) -> AuthResult<Vec<Session>> {
        self.sessions.list_active(user_id).await
    }

    /// Invalidate a session. Once invalidated it can never renew again.
    pub async fn logout(&self, session_id: Uuid) -> AuthResult<Option<Session>> {
        let session = self.sessions.invalidate(session_id).await?;
        if session.is_some() {
            log::debug!("session {session_id} invalidated");
        }
        Ok(session)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Returns Ok(None) on every expected refusal: bad or expired refresh
    /// token, missing or invalidated session, deleted principal. Err is
    /// reserved for store faults. The new token embeds the freshly read
    /// principal, not the snapshot carried by the refresh token.
    pub async fn renew_access_token(&self, refresh_token: &str) -> AuthResult<Option<IssuedToken>> {
        let claims = match self.codec.verify(refresh_token, TokenKind::Refresh) {
            Ok(claims) => claims,
            Err(AuthError::TokenExpired) | Err(AuthError::TokenInvalid) => {
                log::debug!("renewal refused: refresh token did not verify");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let session = match self.sessions.find_by_id(claims.session).await? {
            Some(session) if session.valid => session,
            Some(_) => {
                log::debug!("renewal refused: session {} is invalidated", claims.session);
                return Ok(None);
            }
            None => {
                log::debug!("renewal refused: session {} not found", claims.session);
                return Ok(None);
            }
        };

        let user = match self.users.find_by_id(claims.sub).await? {
            Some(user) => user,
            None => {
                log::debug!("renewal refused: user {} no longer exists", claims.sub);
                return Ok(None);
            }
        };

        let access_token = self.codec.issue(&user, session.id, TokenKind::Access)?;
        Ok(Some(access_token))
    }

    pub fn verify_access_token(&self, token: &str) -> AuthResult<TokenClaims> {
        self.codec.verify(token, TokenKind::Access)
    }

    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            algorithm: "HS256",
            access_token_ttl_secs: self.codec.ttl_secs(TokenKind::Access),
            refresh_token_ttl_secs: self.codec.ttl_secs(TokenKind::Refresh),
        }
    }
}
