#[macro_use]
extern crate rocket;

pub mod auth;
pub mod db;
pub mod models;
pub mod request_logger;
pub mod routes;

use std::sync::Once;

use crate::auth::{AuthConfig, AuthState, Authentication};
use crate::db::ChatterDb;
use crate::request_logger::RequestLogger;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_db_pools::Database;
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    // Configure CORS; X-Access-Token must be exposed or browsers cannot see
    // renewed tokens.
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .expose_headers(["X-Access-Token"].iter().map(|h| h.to_string()).collect())
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(Authentication)
        .attach(ChatterDb::init())
        .attach(cors)
        // Run database migrations on startup
        .attach(AdHoc::try_on_ignite("Run Migrations", |rocket| async move {
            match ChatterDb::fetch(&rocket) {
                Some(db) => {
                    let pool = (**db).clone();
                    match db::run_migrations(&pool).await {
                        Ok(_) => {
                            log::info!("database migrations successful");
                            Ok(rocket)
                        }
                        Err(e) => {
                            log::error!("database migrations failed: {}", e);
                            Err(rocket)
                        }
                    }
                }
                None => {
                    log::error!("database pool not available for migrations");
                    Err(rocket)
                }
            }
        }))
        // Build the auth state (token codec + stores) on the shared pool
        .attach(AdHoc::try_on_ignite("Manage Auth State", |rocket| async move {
            let pool = match ChatterDb::fetch(&rocket) {
                Some(db) => (**db).clone(),
                None => {
                    log::error!("database pool not available for auth state");
                    return Err(rocket);
                }
            };

            let config = match AuthConfig::from_env() {
                Ok(config) => config,
                Err(err) => {
                    log::error!("auth configuration invalid: {err}");
                    return Err(rocket);
                }
            };

            match AuthState::postgres(pool, config) {
                Ok(state) => Ok(rocket.manage(state)),
                Err(err) => {
                    log::error!("failed to build auth state: {err}");
                    Err(rocket)
                }
            }
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Session routes
                auth::routes::create_session,
                auth::routes::guest_session,
                auth::routes::list_sessions,
                auth::routes::delete_session,
                // Auth probes and metadata
                auth::routes::authcheck,
                auth::routes::signing_keys,
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Chatter Auth API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};

    use crate::auth::{AuthState, Authentication};

    pub use database::{TestDatabase, TestDatabaseError};
    pub use memory::{MemorySessionStore, MemoryUserStore};

    /// In-memory store implementations for tests that exercise the session
    /// lifecycle without a database.
    pub mod memory {
        use std::collections::HashMap;
        use std::sync::Mutex;

        use chrono::Utc;
        use uuid::Uuid;

        use crate::auth::AuthResult;
        use crate::auth::passwords::PasswordService;
        use crate::auth::sessions::{Session, SessionStore};
        use crate::auth::users::{NewUser, User, UserStore};

        pub struct MemoryUserStore {
            passwords: PasswordService,
            records: Mutex<HashMap<Uuid, (User, String)>>,
        }

        impl MemoryUserStore {
            pub fn new() -> Self {
                Self {
                    passwords: PasswordService::new().expect("argon2 parameters are valid"),
                    records: Mutex::new(HashMap::new()),
                }
            }

            /// Simulate external account deletion.
            pub fn remove(&self, id: Uuid) -> Option<User> {
                self.records
                    .lock()
                    .unwrap()
                    .remove(&id)
                    .map(|(user, _)| user)
            }

            /// Simulate an external account edit.
            pub fn update(&self, id: Uuid, mutate: impl FnOnce(&mut User)) {
                if let Some((user, _)) = self.records.lock().unwrap().get_mut(&id) {
                    mutate(user);
                }
            }
        }

        impl Default for MemoryUserStore {
            fn default() -> Self {
                Self::new()
            }
        }

        #[rocket::async_trait]
        impl UserStore for MemoryUserStore {
            async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
                Ok(self
                    .records
                    .lock()
                    .unwrap()
                    .get(&id)
                    .map(|(user, _)| user.clone()))
            }

            async fn validate_credentials(
                &self,
                username: &str,
                password: &str,
            ) -> AuthResult<Option<User>> {
                let record = self
                    .records
                    .lock()
                    .unwrap()
                    .values()
                    .find(|(user, _)| user.username == username)
                    .cloned();

                let Some((user, hash)) = record else {
                    return Ok(None);
                };

                if self.passwords.verify_password(password, &hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }

            async fn create(&self, new_user: NewUser) -> AuthResult<User> {
                let hash = self.passwords.hash_password(&new_user.password)?;
                let user = User {
                    id: Uuid::new_v4(),
                    username: new_user.username,
                    first_name: new_user.first_name,
                    last_name: new_user.last_name,
                    is_admin: new_user.is_admin,
                    is_guest: new_user.is_guest,
                    created_at: Utc::now(),
                };
                self.records
                    .lock()
                    .unwrap()
                    .insert(user.id, (user.clone(), hash));
                Ok(user)
            }
        }

        #[derive(Default)]
        pub struct MemorySessionStore {
            records: Mutex<HashMap<Uuid, Session>>,
        }

        impl MemorySessionStore {
            pub fn new() -> Self {
                Self::default()
            }
        }

        #[rocket::async_trait]
        impl SessionStore for MemorySessionStore {
            async fn create(&self, user_id: Uuid, user_agent: &str) -> AuthResult<Session> {
                let now = Utc::now();
                let session = Session {
                    id: Uuid::new_v4(),
                    user_id,
                    user_agent: user_agent.to_string(),
                    valid: true,
                    created_at: now,
                    updated_at: now,
                };
                self.records
                    .lock()
                    .unwrap()
                    .insert(session.id, session.clone());
                Ok(session)
            }

            async fn list_active(&self, user_id: Uuid) -> AuthResult<Vec<Session>> {
                let mut sessions: Vec<Session> = self
                    .records
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|session| session.user_id == user_id && session.valid)
                    .cloned()
                    .collect();
                sessions.sort_by_key(|session| session.created_at);
                Ok(sessions)
            }

            async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<Session>> {
                Ok(self.records.lock().unwrap().get(&id).cloned())
            }

            async fn invalidate(&self, id: Uuid) -> AuthResult<Option<Session>> {
                let mut records = self.records.lock().unwrap();
                Ok(records.get_mut(&id).map(|session| {
                    session.valid = false;
                    session.updated_at = Utc::now();
                    session.clone()
                }))
            }
        }
    }

    /// Ephemeral Postgres factory for store and migration tests.
    pub mod database {
        use rocket_db_pools::sqlx::postgres::PgPoolOptions;
        use rocket_db_pools::sqlx::{self, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
        }

        /// Disposable Postgres container with migrations applied.
        pub struct TestDatabase {
            pool: PgPool,
            _container: ContainerAsync<Postgres>,
        }

        impl TestDatabase {
            pub async fn new() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().start().await?;

                let host = container.get_host().await?;
                let port = container.get_host_port_ipv4(5432).await?;
                let url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&url)
                    .await?;

                crate::db::run_migrations(&pool).await?;

                Ok(Self {
                    pool,
                    _container: container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                &self.pool
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool.clone()
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        auth_state: Option<AuthState>,
    }

    impl TestRocketBuilder {
        /// Start a builder with sensible defaults: random port, logging off.
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                auth_state: None,
            }
        }

        /// Mount routes under `/api/v1`.
        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        /// Manage an `AuthState` and attach the authentication fairing, the
        /// way the real launch path does.
        pub fn with_auth_state(mut self, state: AuthState) -> Self {
            self.auth_state = Some(state);
            self
        }

        /// Finish building the Rocket instance.
        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(state) = self.auth_state {
                rocket = rocket.manage(state).attach(Authentication);
            }

            rocket
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
