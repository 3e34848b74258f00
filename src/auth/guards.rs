use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_okapi::request::OpenApiFromRequest;
use uuid::Uuid;

use crate::auth::fairing::AuthContext;
use crate::auth::tokens::TokenClaims;
use crate::auth::users::User;
use crate::auth::{AuthError, AuthResult, AuthState};

/// Request guard for authenticated endpoints.
///
/// Re-fetches the principal from the users table so a token cannot outlive
/// an account edit or deletion: 401 without an authenticated context, 404
/// when the re-read finds nothing. The carried `user` is the fresh record,
/// not the token snapshot.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct AuthUser {
    pub user: User,
    pub session_id: Uuid,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match require_user(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

async fn require_user(request: &Request<'_>) -> AuthResult<AuthUser> {
    let context = request.local_cache(AuthContext::default);

    if let Some(fault) = &context.fault {
        return Err(AuthError::Other(fault.clone()));
    }

    let claims = context.claims.as_ref().ok_or(AuthError::Unauthorized)?;

    let state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from managed state".into()))?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::PrincipalMissing)?;

    Ok(AuthUser {
        user,
        session_id: claims.session,
    })
}

/// Request guard for admin-only endpoints.
///
/// Trusts the privilege flag of the token-embedded snapshot without a
/// source-of-truth re-read, so a de-privileged admin keeps access until the
/// access token expires.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct RequireAdmin(pub TokenClaims);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let context = request.local_cache(AuthContext::default);

        if let Some(fault) = &context.fault {
            let err = AuthError::Other(fault.clone());
            return Outcome::Error((err.status(), err));
        }

        match &context.claims {
            None => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
            Some(claims) if !claims.is_admin => {
                Outcome::Error((Status::Forbidden, AuthError::Forbidden))
            }
            Some(claims) => Outcome::Success(RequireAdmin(claims.clone())),
        }
    }
}

/// The caller's `User-Agent` header, empty when absent. Recorded on the
/// session at login.
#[derive(Debug, Clone, OpenApiFromRequest)]
pub struct UserAgent(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserAgent {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let agent = request.headers().get_one("User-Agent").unwrap_or_default();
        Outcome::Success(UserAgent(agent.to_string()))
    }
}
