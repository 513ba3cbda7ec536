//! External text generation service client.
//!
//! The presentation layer depends only on [`TextGenerator`]; the HTTP client
//! talks to an Anthropic Messages endpoint and returns the first text block
//! of the reply.

use crate::config::GenerationConfig;
use crate::prompt::PromptFields;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Text generation failures
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response parsing failed: {0}")]
    ResponseParse(String),

    #[error("response contained no text")]
    EmptyResponse,
}

/// Turns structured prompt fields into prose
pub trait TextGenerator {
    fn generate(&self, fields: &PromptFields) -> Result<String, ServiceError>;
}

impl<F> TextGenerator for F
where
    F: Fn(&PromptFields) -> Result<String, ServiceError>,
{
    fn generate(&self, fields: &PromptFields) -> Result<String, ServiceError> {
        self(fields)
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Blocking HTTP client for an Anthropic Messages endpoint
pub struct HttpTextGenerator {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_version: String,
    api_key: String,
    max_tokens: Option<u32>,
}

impl HttpTextGenerator {
    /// Build a client from config, reading the API key from the configured
    /// environment variable
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ServiceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingApiKey(config.api_key_env.clone()))?;

        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: &GenerationConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_version: config.api_version.clone(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
        })
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate(&self, fields: &PromptFields) -> Result<String, ServiceError> {
        fields
            .validate()
            .map_err(|e| ServiceError::InvalidPrompt(e.to_string()))?;

        let prompt = fields.to_prompt();
        let body = build_request(
            &self.model,
            self.max_tokens.unwrap_or_else(|| fields.max_tokens()),
            &prompt,
        );

        tracing::info!(
            kind = fields.kind(),
            model = %self.model,
            "Requesting generated text"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            tracing::warn!("Text generation failed with status {}", status);
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let output = extract_text(&text)?;
        tracing::debug!("Received {} characters of generated text", output.len());
        Ok(output)
    }
}

fn build_request<'a>(model: &'a str, max_tokens: u32, prompt: &'a str) -> MessagesRequest<'a> {
    MessagesRequest {
        model,
        max_tokens,
        messages: vec![RequestMessage {
            role: "user",
            content: vec![RequestBlock {
                kind: "text",
                text: prompt,
            }],
        }],
    }
}

/// Pull the first text block out of a Messages response body
pub fn extract_text(body: &str) -> Result<String, ServiceError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::ResponseParse(e.to_string()))?;

    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        Err(ServiceError::EmptyResponse)
    } else {
        Ok(text)
    }
}
