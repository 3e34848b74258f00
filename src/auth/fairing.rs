use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Data, Request, Response};

use crate::auth::tokens::TokenClaims;
use crate::auth::{AuthError, AuthState};

/// Per-request authentication result, cached in request-local state.
///
/// The fairing never blocks a request; it only fails to authenticate one.
/// Downstream guards decide what an unauthenticated request is allowed to do.
#[derive(Debug, Default)]
pub struct AuthContext {
    /// Principal snapshot taken from the accepted (or freshly renewed)
    /// access token.
    pub claims: Option<TokenClaims>,
    /// Set when this request's expired access token was renewed; echoed back
    /// in the `X-Access-Token` response header.
    pub renewed_access_token: Option<String>,
    /// Store fault hit during renewal. Guards surface this as a 500 instead
    /// of mislabeling it an authentication failure.
    pub fault: Option<String>,
}

impl AuthContext {
    fn authenticated(claims: TokenClaims, renewed_access_token: Option<String>) -> Self {
        Self {
            claims: Some(claims),
            renewed_access_token,
            fault: None,
        }
    }
}

/// Fairing that runs the token state machine on every inbound request.
///
/// Priority order: absent header, verifying access token, tampered token
/// (treated the same as absent), expired access token with an optional
/// renewal via the `X-Refresh` header.
pub struct Authentication;

#[rocket::async_trait]
impl Fairing for Authentication {
    fn info(&self) -> Info {
        Info {
            name: "Bearer Authentication",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let context = authenticate(request).await;
        request.local_cache(move || context);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let context = request.local_cache(AuthContext::default);
        if let Some(token) = &context.renewed_access_token {
            response.set_header(Header::new("X-Access-Token", token.clone()));
        }
    }
}

async fn authenticate(request: &Request<'_>) -> AuthContext {
    let Some(state) = request.rocket().state::<AuthState>() else {
        log::warn!("authentication fairing attached without managed AuthState");
        return AuthContext::default();
    };

    let Some(access_token) = bearer_token(request) else {
        return AuthContext::default();
    };

    match state.service.verify_access_token(access_token) {
        Ok(claims) => AuthContext::authenticated(claims, None),
        Err(AuthError::TokenExpired) => {
            let refresh_token = request
                .headers()
                .get_one("X-Refresh")
                .filter(|value| !value.is_empty());
            let Some(refresh_token) = refresh_token else {
                return AuthContext::default();
            };

            match state.service.renew_access_token(refresh_token).await {
                Ok(Some(renewed)) => {
                    AuthContext::authenticated(renewed.claims, Some(renewed.token))
                }
                Ok(None) => AuthContext::default(),
                Err(err) => {
                    log::error!("access token renewal hit a store fault: {err}");
                    AuthContext {
                        fault: Some(err.to_string()),
                        ..AuthContext::default()
                    }
                }
            }
        }
        // Tampered or garbage tokens collapse to "absent": no distinct
        // rejection is surfaced and no renewal is attempted.
        Err(_) => AuthContext::default(),
    }
}

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    let header = request.headers().get_one("Authorization")?;
    let (scheme, token) = header.split_once(' ')?;
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}
