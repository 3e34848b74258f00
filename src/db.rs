use rocket_db_pools::{Database, sqlx};

#[derive(Database)]
#[database("chatter_db")]
pub struct ChatterDb(sqlx::PgPool);

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
