use auth_server::auth::passwords::PasswordService;
use auth_server::auth::sessions::{PgSessionStore, SessionStore};
use auth_server::auth::users::{NewUser, PgUserStore, UserStore};
use auth_server::test_support::{TestDatabase, TestDatabaseError};
use sqlx::migrate::Migrator;
use uuid::Uuid;

static TEST_MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn provision() -> Option<TestDatabase> {
    match TestDatabase::new().await {
        Ok(db) => Some(db),
        Err(TestDatabaseError::Container(err)) => {
            eprintln!("skipping Postgres-backed test: container runtime unavailable: {err}");
            None
        }
        Err(err) => panic!("failed to provision test database: {err:?}"),
    }
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.into(),
        password: "testpwd".into(),
        first_name: "first".into(),
        last_name: "last".into(),
        is_admin: false,
        is_guest: false,
    }
}

#[tokio::test]
async fn user_store_creates_and_validates_credentials() {
    let Some(db) = provision().await else { return };

    let store = PgUserStore::new(db.pool_clone(), PasswordService::new().expect("argon2"));

    let user = store.create(new_user("testuser")).await.expect("create");
    assert_eq!(user.username, "testuser");
    assert!(!user.is_admin);

    let found = store.find_by_id(user.id).await.expect("find");
    assert_eq!(found.expect("user exists").id, user.id);

    let valid = store
        .validate_credentials("testuser", "testpwd")
        .await
        .expect("validate");
    assert_eq!(valid.expect("credentials accepted").id, user.id);

    // Wrong password and unknown username are both plain None.
    assert!(
        store
            .validate_credentials("testuser", "wrong")
            .await
            .expect("validate")
            .is_none()
    );
    assert!(
        store
            .validate_credentials("nobody", "testpwd")
            .await
            .expect("validate")
            .is_none()
    );
}

#[tokio::test]
async fn session_store_lists_and_invalidates() {
    let Some(db) = provision().await else { return };

    let users = PgUserStore::new(db.pool_clone(), PasswordService::new().expect("argon2"));
    let sessions = PgSessionStore::new(db.pool_clone());

    let user = users.create(new_user("testuser")).await.expect("create");

    let first = sessions
        .create(user.id, "PostmanRuntime/7.39.0")
        .await
        .expect("create session");
    let second = sessions
        .create(user.id, "Mozilla/5.0")
        .await
        .expect("create session");

    assert!(first.valid);
    assert_eq!(first.user_agent, "PostmanRuntime/7.39.0");

    let active = sessions.list_active(user.id).await.expect("list");
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].id, first.id);

    let invalidated = sessions
        .invalidate(first.id)
        .await
        .expect("invalidate")
        .expect("session exists");
    assert!(!invalidated.valid);
    assert!(invalidated.updated_at >= invalidated.created_at);

    // Idempotent: a second invalidation is a no-op success.
    let again = sessions
        .invalidate(first.id)
        .await
        .expect("invalidate")
        .expect("session exists");
    assert!(!again.valid);

    // Unknown ids are not an error.
    assert!(
        sessions
            .invalidate(Uuid::new_v4())
            .await
            .expect("invalidate")
            .is_none()
    );

    let active = sessions.list_active(user.id).await.expect("list");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let fetched = sessions
        .find_by_id(first.id)
        .await
        .expect("find")
        .expect("row still present");
    assert!(!fetched.valid);
}

#[tokio::test]
async fn migrations_apply_and_revert_cleanly() {
    let Some(db) = provision().await else { return };

    let pool = db.pool_clone();

    TEST_MIGRATOR.undo(&pool, 0).await.expect("migrations revert");

    let session_tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name = 'sessions'",
    )
    .fetch_one(&pool)
    .await
    .expect("lookup succeeded");
    assert_eq!(session_tables, 0, "sessions should be dropped after revert");

    TEST_MIGRATOR.run(&pool).await.expect("migrations rerun");

    let user_tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'public' AND table_name = 'users'",
    )
    .fetch_one(&pool)
    .await
    .expect("lookup succeeded");
    assert_eq!(user_tables, 1);
}
