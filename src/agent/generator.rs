use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;

pub const SYSTEM_PROMPT: &str = "You are an expert Python programmer. Based on the user's request, generate a Python script. Only output the raw Python code, without any explanation or markdown formatting.";

/// Abstraction over source generation for testability.
/// Real implementation: `OpenAiGenerator`.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, instruction: &str) -> Result<String, GenerationError>;
}

/// Connection settings for an OpenAI-compatible chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, if it has any.
    fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|text| !text.trim().is_empty())
    }
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl OpenAiGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                GenerationError::UpstreamFailure(format!("Failed to build HTTP client: {}", e))
            })?;
        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ScriptGenerator for OpenAiGenerator {
    async fn generate(&self, instruction: &str) -> Result<String, GenerationError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            GenerationError::UpstreamFailure("OPENAI_API_KEY is not set".to_string())
        })?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: instruction,
                },
            ],
        };

        tracing::debug!(model = %self.config.model, "requesting script completion");

        let resp = self
            .client
            .post(self.completions_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::UpstreamFailure(format!("request timed out: {}", e))
                } else {
                    GenerationError::UpstreamFailure(format!("request failed: {}", e))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::UpstreamFailure(format!(
                "http {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            GenerationError::UpstreamFailure(format!("invalid completion response: {}", e))
        })?;

        parsed.first_text().ok_or(GenerationError::EmptyCompletion)
    }
}
