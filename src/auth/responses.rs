use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::sessions::Session;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

/// Logout response: the invalidated session plus explicit nulls telling the
/// client to drop both tokens.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub session: Option<Session>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SigningKeyMetadata {
    pub algorithm: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}
