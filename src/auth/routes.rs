use rand::Rng;
use rand::distributions::Alphanumeric;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, post};
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::openapi;

use crate::auth::guards::{AuthUser, RequireAdmin, UserAgent};
use crate::auth::responses::{LoginRequest, LoginResponse, LogoutResponse, SigningKeyMetadata};
use crate::auth::sessions::Session;
use crate::auth::users::NewUser;
use crate::auth::{AuthError, AuthState};
use crate::models::DataResponse;

type AuthRouteResult<T> = Result<Json<T>, status::Custom<Json<AuthErrorResponse>>>;

const GUEST_PASSWORD: &str = "guest";

#[derive(Debug, serde::Serialize, JsonSchema)]
pub struct AuthErrorResponse {
    pub status: u16,
    pub message: String,
}

/// Log in with username and password, opening a new session.
#[openapi(tag = "Sessions")]
#[post("/sessions", data = "<payload>")]
pub async fn create_session(
    state: &State<AuthState>,
    agent: UserAgent,
    payload: Json<LoginRequest>,
) -> AuthRouteResult<LoginResponse> {
    let issued = state
        .service
        .login(&payload.username, &payload.password, &agent.0)
        .await
        .map_err(respond_error)?;

    Ok(Json(LoginResponse {
        access_token: issued.access_token.token,
        refresh_token: issued.refresh_token.token,
    }))
}

/// Provision a throwaway guest account and log it in.
#[openapi(tag = "Sessions")]
#[post("/guest")]
pub async fn guest_session(
    state: &State<AuthState>,
    agent: UserAgent,
) -> AuthRouteResult<LoginResponse> {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    let user = state
        .users
        .create(NewUser {
            username: format!("Guest_#{suffix}"),
            password: GUEST_PASSWORD.into(),
            first_name: "Guest".into(),
            last_name: format!("#{suffix}"),
            is_admin: false,
            is_guest: true,
        })
        .await
        .map_err(respond_error)?;

    log::info!("guest user {} created", user.username);

    let issued = state
        .service
        .login(&user.username, GUEST_PASSWORD, &agent.0)
        .await
        .map_err(respond_error)?;

    Ok(Json(LoginResponse {
        access_token: issued.access_token.token,
        refresh_token: issued.refresh_token.token,
    }))
}

/// List the calling user's active sessions.
#[openapi(tag = "Sessions")]
#[get("/sessions")]
pub async fn list_sessions(
    state: &State<AuthState>,
    user: AuthUser,
) -> AuthRouteResult<DataResponse<Vec<Session>>> {
    let sessions = state
        .service
        .list_active_sessions(user.user.id)
        .await
        .map_err(respond_error)?;

    Ok(Json(DataResponse { data: sessions }))
}

/// Log out: invalidate the session carried by the presented access token.
#[openapi(tag = "Sessions")]
#[delete("/sessions")]
pub async fn delete_session(
    state: &State<AuthState>,
    user: AuthUser,
) -> AuthRouteResult<LogoutResponse> {
    let session = state
        .service
        .logout(user.session_id)
        .await
        .map_err(respond_error)?;

    Ok(Json(LogoutResponse {
        session,
        access_token: None,
        refresh_token: None,
    }))
}

/// Bare authentication probe.
#[openapi(tag = "Auth")]
#[get("/authcheck")]
pub async fn authcheck(_user: AuthUser) -> Status {
    Status::Ok
}

/// Token configuration metadata for operators.
#[openapi(tag = "Auth")]
#[get("/auth/keys")]
pub async fn signing_keys(
    state: &State<AuthState>,
    _admin: RequireAdmin,
) -> AuthRouteResult<SigningKeyMetadata> {
    let meta = state.service.metadata();

    Ok(Json(SigningKeyMetadata {
        algorithm: meta.algorithm.to_string(),
        access_token_ttl_secs: meta.access_token_ttl_secs,
        refresh_token_ttl_secs: meta.refresh_token_ttl_secs,
    }))
}

fn respond_error(err: AuthError) -> status::Custom<Json<AuthErrorResponse>> {
    let status = err.status();
    if status == Status::InternalServerError {
        log::error!("auth route failed: {err}");
    }
    status::Custom(
        status,
        Json(AuthErrorResponse {
            status: status.code,
            message: err.to_string(),
        }),
    )
}
