//! Courtside persistence layer: pool construction, embedded migrations, and
//! per-entity repositories over PostgreSQL.
//!
//! Repositories expose two shapes of methods: pool-based reads, and
//! `&mut PgConnection` methods for the row-locked booking/score paths that
//! must run inside the caller's transaction.

use sqlx::postgres::PgPoolOptions;

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::PgPool;

/// Default maximum number of pooled connections.
const MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Cheap liveness probe.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    Ok(())
}

/// Apply embedded migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
