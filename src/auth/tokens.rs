use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::users::User;
use crate::auth::{AuthConfig, AuthError, AuthResult};

/// Which of the two cooperating token classes a token belongs to.
///
/// Encoded into the payload as the `kind` claim and checked on every verify,
/// on top of the per-class signing secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Signed token payload: a point-in-time principal snapshot plus the session
/// reference. The snapshot can go stale relative to the users table; renewal
/// and `AuthUser` re-read the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub sub: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub is_guest: bool,
    pub session: Uuid,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ClassKeys {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

/// HS256 signer/verifier for both token classes.
pub struct TokenCodec {
    access: ClassKeys,
    refresh: ClassKeys,
    validation: Validation,
}

impl TokenCodec {
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        Self {
            access: ClassKeys::new(&config.access_token_secret, config.access_token_ttl_secs),
            refresh: ClassKeys::new(&config.refresh_token_secret, config.refresh_token_ttl_secs),
            validation,
        }
    }

    fn class(&self, kind: TokenKind) -> &ClassKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        self.class(kind).ttl.num_seconds()
    }

    /// Mint a token of the given class embedding `user` as the principal
    /// snapshot and `session_id` as the session reference.
    pub fn issue(&self, user: &User, session_id: Uuid, kind: TokenKind) -> AuthResult<IssuedToken> {
        let keys = self.class(kind);
        let now = Utc::now();
        let expires_at = now + keys.ttl;

        let claims = TokenClaims {
            sub: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            is_guest: user.is_guest,
            session: session_id,
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Verify a token against the secret of the claimed class.
    ///
    /// `TokenExpired` and `TokenInvalid` are distinguished outcomes: only a
    /// well-signed token past its `exp` reports expired; tampered or garbage
    /// input is invalid. The `kind` claim is checked before the caller gets
    /// to trust any other field.
    pub fn verify(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        let keys = self.class(kind);
        let data = decode::<TokenClaims>(token, &keys.decoding, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            },
        )?;

        if data.claims.kind != kind {
            return Err(AuthError::TokenInvalid);
        }

        Ok(data.claims)
    }
}
