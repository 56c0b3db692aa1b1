use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::config::loader::mask_database_url;
use crate::config::DatabaseConfig;
use crate::error::OrchestraResult;

/// Build a connection pool from configuration
pub async fn connect(config: &DatabaseConfig) -> OrchestraResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await?;

    info!(
        database_url = %mask_database_url(&config.url),
        max_connections = config.max_connections,
        "✅ Database pool connected"
    );

    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> OrchestraResult<bool> {
    let row = sqlx::query("SELECT 1 AS health").fetch_one(pool).await?;
    let health: i32 = row.try_get("health")?;
    Ok(health == 1)
}
