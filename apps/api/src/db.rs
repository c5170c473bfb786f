use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Creates a PostgreSQL pool and applies the schema in `migrations/`.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    // Statements are idempotent (IF NOT EXISTS); run as one simple query.
    pool.execute(include_str!("../migrations/0001_init.sql"))
        .await?;

    info!("PostgreSQL connection pool established, schema ready");
    Ok(pool)
}
