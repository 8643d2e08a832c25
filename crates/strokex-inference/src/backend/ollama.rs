//! Ollama HTTP backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InferenceError;
use crate::{InferenceClient, Result};

/// Default Ollama address used by the extraction tool.
pub const DEFAULT_HOST: &str = "http://localhost:11435";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default request timeout (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Request body for Ollama `/api/generate`.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response body from Ollama `/api/generate`.
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Response body from Ollama `/api/tags`.
#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama HTTP client for non-streaming generation.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for the Ollama instance at `host`.
    pub fn new(host: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| InferenceError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            base_url: host.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Client for the default local instance.
    pub fn default_local() -> Result<Self> {
        Self::new(DEFAULT_HOST, DEFAULT_TIMEOUT_SECS)
    }

    /// Base URL requests are sent to (no trailing slash).
    pub fn host(&self) -> &str {
        &self.base_url
    }

    /// List model names installed on the backend.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TagsResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    fn transport_error(&self, e: reqwest::Error) -> InferenceError {
        if e.is_connect() {
            InferenceError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            InferenceError::Timeout(self.timeout_secs)
        } else {
            InferenceError::Http(e.to_string())
        }
    }
}

impl InferenceClient for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
        };

        debug!("POST {} ({} prompt chars)", url, prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }
}
