//! # Inference Gateway
//!
//! Request/response client for the external text-generation service. Two
//! operations are exposed: task execution for the worker and chat generation
//! for conversation turns. Calls are bounded by a timeout and never retried
//! here; callers decide what a failure means.
//!
//! Failures come in two flavours:
//! - [`OrchestraError::GatewayUnavailable`]: transport errors and timeouts
//! - [`OrchestraError::GatewayBadResponse`]: non-2xx statuses and bodies
//!   missing the expected field

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::{OrchestraError, OrchestraResult};
use crate::models::{ChatMessage, HistoryEntry};

pub use http::HttpInferenceGateway;

/// Body of a task execution call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInferenceRequest {
    pub task_type: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

/// Body of a chat generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Execute a task and return the service's `result` text
    async fn execute_task(&self, request: &TaskInferenceRequest) -> OrchestraResult<String>;

    /// Generate a chat reply and return the service's `content` text
    async fn generate(&self, request: &GenerateRequest) -> OrchestraResult<String>;
}

/// Run a gateway call under `timeout`; elapsing counts as unavailability
pub async fn call_with_timeout<F>(timeout: Duration, call: F) -> OrchestraResult<String>
where
    F: Future<Output = OrchestraResult<String>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(OrchestraError::gateway_unavailable(format!(
            "no response within {}s",
            timeout.as_secs_f64()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_request_omits_absent_history() {
        let request = TaskInferenceRequest {
            task_type: "summarization".into(),
            prompt: "text".into(),
            history: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"task_type": "summarization", "prompt": "text"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_with_timeout_maps_elapsed_to_unavailable() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok("late".to_string())
        };
        let err = call_with_timeout(Duration::from_secs(60), slow)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestraError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn test_call_with_timeout_passes_results_through() {
        let ok = call_with_timeout(Duration::from_secs(1), async { Ok("4".to_string()) }).await;
        assert_eq!(ok.unwrap(), "4");
    }
}
