//! Outbound channel to the answer service.
//!
//! One request per user send action: no retry, no queuing. The service is
//! a collaborator reached over local HTTP; everything that can go wrong
//! with it (unreachable, non-2xx, `success=false`) maps onto
//! `Error::Transport` so the widget shows one uniform inline error.

use async_trait::async_trait;
use pagebot_core::{Config, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub page_content: String,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Seam between the widget and the answer service, so the controller is
/// testable without a network.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<String>;
}

pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: config.backend.endpoint.clone(),
        }
    }
}

#[async_trait]
impl AnswerBackend for HttpBackend {
    async fn ask(&self, request: &AskRequest) -> Result<String> {
        debug!(endpoint = %self.endpoint, "Sending question to answer service");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "Answer service returned {}",
                response.status()
            )));
        }

        let answer: AskResponse = response
            .json()
            .await
            .map_err(|e| Error::Transport(format!("Failed to parse response: {}", e)))?;

        if !answer.success {
            return Err(Error::Transport(
                answer
                    .error
                    .unwrap_or_else(|| "Answer service reported failure".to_string()),
            ));
        }

        Ok(answer.response)
    }
}
