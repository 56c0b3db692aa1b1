//! # Database Migration Support
//!
//! Migrations live in the crate's `migrations/` directory and are embedded at
//! compile time. The first migration installs the pgmq extension, so a single
//! run prepares both the stores and the queue.

use sqlx::PgPool;
use tracing::info;

use crate::error::OrchestraResult;

/// Migrator over every file in `migrations/`.
///
/// Also usable with `#[sqlx::test(migrator = "llm_orchestra::database::MIGRATOR")]`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations
pub async fn run_migrations(pool: &PgPool) -> OrchestraResult<()> {
    info!("Running database migrations");
    MIGRATOR.run(pool).await?;
    info!("Database migrations complete");
    Ok(())
}
