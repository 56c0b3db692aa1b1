//! # Orchestra Configuration
//!
//! Typed configuration for the worker, the stores and the inference gateway.
//! Every section carries serde defaults, so an empty configuration file (or no
//! file at all) yields a runnable local setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use llm_orchestra::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let queue_name = &manager.config().queue.name;
//! let timeout = manager.config().gateway.timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_GENERATE_URL, DEFAULT_MODEL, DEFAULT_QUEUE_NAME,
    DEFAULT_TASK_URL,
};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestraConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub gateway: GatewayConfig,
    pub worker: WorkerConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
    /// Longest a single dequeue call waits for an entry
    pub dequeue_timeout_ms: u64,
    /// Delay between empty polls inside one dequeue call
    pub poll_interval_ms: u64,
    /// Attempts made by submission before reporting `enqueued = false`
    pub enqueue_retry_attempts: u32,
    pub enqueue_retry_base_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            dequeue_timeout_ms: 5_000,
            poll_interval_ms: 250,
            enqueue_retry_attempts: 3,
            enqueue_retry_base_delay_ms: 100,
        }
    }
}

impl QueueConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Backoff before retry number `attempt` (1-based), doubling each time
    pub fn enqueue_retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.enqueue_retry_base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Task execution endpoint
    pub task_url: String,
    /// Chat generation endpoint
    pub generate_url: String,
    /// Model id sent with chat generation requests
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            task_url: DEFAULT_TASK_URL.to_string(),
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Pause after a queue error before polling again
    pub idle_backoff_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    /// Non-terminal tasks untouched for this long are re-enqueued
    pub stale_after_seconds: u64,
    pub interval_seconds: u64,
    /// Upper bound on tasks re-enqueued by a single sweep
    pub batch_size: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stale_after_seconds: 300,
            interval_seconds: 60,
            batch_size: 100,
        }
    }
}

impl ReconciliationConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_seconds)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl OrchestraConfig {
    /// Validate configuration for consistency and required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.queue.name.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "queue.name",
                "queue configuration",
            ));
        }

        if self.queue.dequeue_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.dequeue_timeout_ms",
                "0",
                "dequeue timeout must be greater than 0",
            ));
        }

        if self.queue.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue.poll_interval_ms",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        for (field, value) in [
            ("gateway.task_url", &self.gateway.task_url),
            ("gateway.generate_url", &self.gateway.generate_url),
            ("gateway.model", &self.gateway.model),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "gateway configuration",
                ));
            }
        }

        if self.gateway.timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "gateway.timeout_seconds",
                "0",
                "gateway timeout must be greater than 0",
            ));
        }

        if self.reconciliation.interval_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "reconciliation.interval_seconds",
                "0",
                "sweep interval must be greater than 0",
            ));
        }

        if self.reconciliation.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "reconciliation.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        // A task still waiting on the gateway must never look stale
        if self.reconciliation.stale_after_seconds <= self.gateway.timeout_seconds {
            return Err(ConfigurationError::invalid_value(
                "reconciliation.stale_after_seconds",
                self.reconciliation.stale_after_seconds,
                format!(
                    "must exceed gateway.timeout_seconds ({})",
                    self.gateway.timeout_seconds
                ),
            ));
        }

        Ok(())
    }
}
