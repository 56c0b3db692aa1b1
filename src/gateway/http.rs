//! HTTP implementation of [`InferenceGateway`] using `reqwest`.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::{GenerateRequest, InferenceGateway, TaskInferenceRequest};
use crate::config::GatewayConfig;
use crate::error::{OrchestraError, OrchestraResult};

#[derive(Debug, Deserialize)]
struct TaskInferenceResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: String,
}

#[derive(Debug, Clone)]
pub struct HttpInferenceGateway {
    client: Client,
    task_url: Url,
    generate_url: Url,
    timeout: Duration,
}

impl HttpInferenceGateway {
    pub fn new(config: &GatewayConfig) -> OrchestraResult<Self> {
        let parse = |field: &str, raw: &str| {
            Url::parse(raw).map_err(|e| {
                OrchestraError::ConfigurationError(format!("Invalid {field} '{raw}': {e}"))
            })
        };
        let task_url = parse("gateway.task_url", &config.task_url)?;
        let generate_url = parse("gateway.generate_url", &config.generate_url)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("llm-orchestra/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                OrchestraError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        debug!(
            task_url = %task_url,
            generate_url = %generate_url,
            timeout_seconds = config.timeout_seconds,
            "Created HttpInferenceGateway"
        );

        Ok(Self {
            client,
            task_url,
            generate_url,
            timeout: config.timeout(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn post_json<B, T>(&self, url: &Url, body: &B, operation: &str) -> OrchestraResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.client.post(url.clone()).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(status = %status, body = %text, "Inference {} failed", operation);
            return Err(OrchestraError::gateway_bad_response(format!(
                "HTTP {status}: {text}"
            )));
        }

        serde_json::from_str::<T>(&text).map_err(|e| {
            OrchestraError::gateway_bad_response(format!(
                "Failed to parse {operation} response: {e}"
            ))
        })
    }
}

#[async_trait]
impl InferenceGateway for HttpInferenceGateway {
    #[instrument(skip(self, request), fields(task_type = %request.task_type))]
    async fn execute_task(&self, request: &TaskInferenceRequest) -> OrchestraResult<String> {
        let response: TaskInferenceResponse = self
            .post_json(&self.task_url, request, "task execution")
            .await?;
        Ok(response.result)
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn generate(&self, request: &GenerateRequest) -> OrchestraResult<String> {
        let response: GenerateResponse = self
            .post_json(&self.generate_url, request, "generation")
            .await?;
        Ok(response.content)
    }
}
