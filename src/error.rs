//! # Error Types
//!
//! Structured error taxonomy shared by the task worker, the stores, the queue,
//! the inference gateway and the conversation flow.
//!
//! The variants map one-to-one onto the failure classes the core reasons about:
//! storage and queue errors abandon a worker iteration, gateway errors become a
//! task's terminal `failed` result, and inside a chat turn the gateway errors are
//! reported to the caller as "upstream unavailable" after a rollback.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::state_machine::StateMachineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestraError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Queue error: {0}")]
    QueueError(String),

    #[error("Inference service unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Inference service returned a bad response: {0}")]
    GatewayBadResponse(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("State transition error: {0}")]
    StateTransitionError(String),
}

impl OrchestraError {
    /// Create a not-found error for the given entity kind
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError(message.into())
    }

    /// Create a queue error
    pub fn queue(message: impl Into<String>) -> Self {
        Self::QueueError(message.into())
    }

    /// Create a gateway transport error
    pub fn gateway_unavailable(message: impl Into<String>) -> Self {
        Self::GatewayUnavailable(message.into())
    }

    /// Create a gateway payload error
    pub fn gateway_bad_response(message: impl Into<String>) -> Self {
        Self::GatewayBadResponse(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for failures of the external inference service.
    ///
    /// Callers of a chat turn use this to tell "retry the whole turn later"
    /// apart from local storage failures.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::GatewayUnavailable(_) | Self::GatewayBadResponse(_)
        )
    }
}

impl From<sqlx::Error> for OrchestraError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                OrchestraError::storage("timed out acquiring a database connection")
            }
            sqlx::Error::PoolClosed => OrchestraError::storage("database pool is closed"),
            sqlx::Error::RowNotFound => OrchestraError::not_found("row", "query returned no rows"),
            other => OrchestraError::storage(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for OrchestraError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        OrchestraError::storage(format!("migration failed: {err}"))
    }
}

impl From<pgmq::errors::PgmqError> for OrchestraError {
    fn from(err: pgmq::errors::PgmqError) -> Self {
        OrchestraError::queue(err.to_string())
    }
}

impl From<reqwest::Error> for OrchestraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            OrchestraError::gateway_bad_response(err.to_string())
        } else if err.is_timeout() {
            OrchestraError::gateway_unavailable(format!("request timed out: {err}"))
        } else {
            OrchestraError::gateway_unavailable(err.to_string())
        }
    }
}

impl From<StateMachineError> for OrchestraError {
    fn from(err: StateMachineError) -> Self {
        OrchestraError::StateTransitionError(err.to_string())
    }
}

impl From<ConfigurationError> for OrchestraError {
    fn from(err: ConfigurationError) -> Self {
        OrchestraError::ConfigurationError(err.to_string())
    }
}

pub type OrchestraResult<T> = std::result::Result<T, OrchestraError>;
