use crate::auth::{AuthError, AuthResult};

/// Token secrets and lifetimes, loaded from environment variables.
///
/// Both token classes get their own signing secret; class separation depends
/// on verifying against the matching secret plus the `kind` claim.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let access_token_secret = std::env::var("CHATTER_ACCESS_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("CHATTER_ACCESS_TOKEN_SECRET is required".into()))?;
        let refresh_token_secret = std::env::var("CHATTER_REFRESH_TOKEN_SECRET")
            .map_err(|_| AuthError::Config("CHATTER_REFRESH_TOKEN_SECRET is required".into()))?;
        let access_token_ttl_secs = std::env::var("CHATTER_ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(15 * 60);
        let refresh_token_ttl_secs = std::env::var("CHATTER_REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(24 * 60 * 60);

        let config = Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
        };
        config.validate()?;

        Ok(config)
    }

    /// An access token must never outlive the refresh token that renews it.
    pub fn validate(&self) -> AuthResult<()> {
        if self.access_token_ttl_secs > self.refresh_token_ttl_secs {
            return Err(AuthError::Config(
                "access token TTL must not exceed refresh token TTL".into(),
            ));
        }
        if self.access_token_secret == self.refresh_token_secret {
            log::warn!(
                "access and refresh token secrets are identical; class separation now rests on the kind claim alone"
            );
        }
        Ok(())
    }
}
