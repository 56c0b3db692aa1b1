//! # Database Operations
//!
//! Connection pooling and schema migrations for the Postgres-backed stores.
//!
//! - [`connection`] - pool construction from [`DatabaseConfig`](crate::config::DatabaseConfig)
//! - [`migrations`] - the embedded migrator for the `tasks`, `conversations`,
//!   `messages` and `logs` tables plus the pgmq extension
//!
//! ```rust,no_run
//! use llm_orchestra::config::DatabaseConfig;
//! use llm_orchestra::database::{connect, run_migrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect(&DatabaseConfig::default()).await?;
//! run_migrations(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::{connect, health_check};
pub use migrations::{run_migrations, MIGRATOR};
