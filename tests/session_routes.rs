mod common;

use auth_server::auth::TokenCodec;
use auth_server::auth::routes as auth_routes;
use auth_server::auth::sessions::{Session, SessionStore};
use auth_server::auth::tokens::TokenKind;
use auth_server::models::DataResponse;
use auth_server::test_support::TestRocketBuilder;
use common::{memory_backend, seed_user, test_config};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rocket::routes;
use serde_json::{Value, json};

async fn session_client(backend: &common::TestBackend) -> Client {
    TestRocketBuilder::new()
        .with_auth_state(backend.state.clone())
        .mount_api_routes(routes![
            auth_routes::create_session,
            auth_routes::guest_session,
            auth_routes::list_sessions,
            auth_routes::delete_session,
        ])
        .async_client()
        .await
}

async fn login(client: &Client, username: &str, password: &str) -> (Status, Value) {
    let response = client
        .post("/api/v1/sessions")
        .header(ContentType::JSON)
        .body(json!({ "username": username, "password": password }).to_string())
        .dispatch()
        .await;

    let status = response.status();
    let payload: Value = response.into_json().await.expect("JSON body");
    (status, payload)
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}

#[tokio::test]
async fn login_returns_a_verifiable_token_pair() {
    let backend = memory_backend();
    seed_user(&backend.users, "testuser", false).await;
    let client = session_client(&backend).await;

    let (status, payload) = login(&client, "testuser", "testpwd").await;
    assert_eq!(status, Status::Ok);

    let access = payload["accessToken"].as_str().expect("accessToken string");
    let refresh = payload["refreshToken"]
        .as_str()
        .expect("refreshToken string");
    assert!(!access.is_empty());
    assert!(!refresh.is_empty());

    let codec = TokenCodec::from_config(&test_config());
    let access_claims = codec
        .verify(access, TokenKind::Access)
        .expect("access token verifies against the access secret");
    let refresh_claims = codec
        .verify(refresh, TokenKind::Refresh)
        .expect("refresh token verifies against the refresh secret");

    assert_eq!(access_claims.username, "testuser");
    assert_eq!(access_claims.session, refresh_claims.session);
}

#[tokio::test]
async fn login_failures_do_not_reveal_which_credential_was_wrong() {
    let backend = memory_backend();
    seed_user(&backend.users, "testuser", false).await;
    let client = session_client(&backend).await;

    let (unknown_status, unknown_body) = login(&client, "nobody", "testpwd").await;
    let (wrong_status, wrong_body) = login(&client, "testuser", "wrong").await;

    assert_eq!(unknown_status, Status::Unauthorized);
    assert_eq!(wrong_status, Status::Unauthorized);
    assert_eq!(unknown_body, wrong_body);
}

#[tokio::test]
async fn session_listing_returns_only_valid_sessions() {
    let backend = memory_backend();
    let user = seed_user(&backend.users, "testuser", false).await;
    let client = session_client(&backend).await;

    login(&client, "testuser", "testpwd").await;
    let (_, second) = login(&client, "testuser", "testpwd").await;

    let open = backend.sessions.list_active(user.id).await.unwrap();
    assert_eq!(open.len(), 2);

    backend.sessions.invalidate(open[0].id).await.unwrap();

    let response = client
        .get("/api/v1/sessions")
        .header(bearer(second["accessToken"].as_str().unwrap()))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let payload: DataResponse<Vec<Session>> =
        response.into_json().await.expect("session list payload");
    assert_eq!(payload.data.len(), 1);
    assert_ne!(payload.data[0].id, open[0].id);
    assert!(payload.data[0].valid);
    assert_eq!(payload.data[0].user_id, user.id);
}

#[tokio::test]
async fn logout_invalidates_the_session_and_clears_tokens() {
    let backend = memory_backend();
    let user = seed_user(&backend.users, "testuser", false).await;
    let client = session_client(&backend).await;

    let (_, tokens) = login(&client, "testuser", "testpwd").await;
    let access = tokens["accessToken"].as_str().unwrap();

    let response = client
        .delete("/api/v1/sessions")
        .header(bearer(access))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let payload: Value = response.into_json().await.expect("logout payload");
    assert_eq!(payload["session"]["valid"], Value::Bool(false));
    assert_eq!(payload["accessToken"], Value::Null);
    assert_eq!(payload["refreshToken"], Value::Null);

    // The unexpired access token is still individually accepted; the session
    // just no longer shows up as active.
    let response = client
        .get("/api/v1/sessions")
        .header(bearer(access))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let payload: DataResponse<Vec<Session>> = response.into_json().await.expect("session list");
    assert!(payload.data.is_empty());

    assert!(
        backend
            .sessions
            .list_active(user.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn guest_sessions_carry_the_guest_flag() {
    let backend = memory_backend();
    let client = session_client(&backend).await;

    let response = client.post("/api/v1/guest").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let payload: Value = response.into_json().await.expect("guest payload");
    let access = payload["accessToken"].as_str().expect("accessToken string");

    let codec = TokenCodec::from_config(&test_config());
    let claims = codec
        .verify(access, TokenKind::Access)
        .expect("guest access token verifies");

    assert!(claims.is_guest);
    assert!(!claims.is_admin);
    assert!(claims.username.starts_with("Guest_#"));
}
