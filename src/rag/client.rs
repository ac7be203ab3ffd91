//! LLM clients

use crate::config::LlmConfig;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling an external LLM endpoint
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP request failed (network unreachable, connection refused, non-2xx status)
    #[error("LLM network error: {0}")]
    Network(String),

    /// Failed to parse model response
    #[error("LLM parse error: {0}")]
    Parse(String),

    #[error("LLM request timed out")]
    Timeout,

    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Text generation backend
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl ChatCompletionsClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
            timeout,
        }
    }

    /// Build a client, reading the API key from `config.api_key_env`
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        Ok(Self::new(
            config.endpoint.clone(),
            api_key,
            config.model.clone(),
            config.temperature,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        })
    }
}

impl LlmClient for ChatCompletionsClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body_bytes = serde_json::to_vec(&self.request_body(prompt))
            .map_err(|e| LlmError::Parse(format!("failed to serialize request: {}", e)))?;

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        let agent = ureq::Agent::new_with_config(config);

        tracing::debug!("Calling {} with model {}", self.endpoint, self.model);

        let mut response = agent
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .send(&body_bytes[..])
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("timed out") || msg.contains("Timeout") {
                    LlmError::Timeout
                } else {
                    LlmError::Network(msg)
                }
            })?;

        let response_text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| LlmError::Network(format!("failed to read response: {}", e)))?;

        extract_content(&response_text)
    }
}

/// Pull `choices[0].message.content` out of a chat completions response
pub fn extract_content(response_text: &str) -> Result<String, LlmError> {
    let json: serde_json::Value = serde_json::from_str(response_text)
        .map_err(|e| LlmError::Parse(format!("invalid JSON response: {}", e)))?;

    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            let preview: String = response_text.chars().take(200).collect();
            LlmError::Parse(format!("unexpected response format: {}", preview))
        })
}
