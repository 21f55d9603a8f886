//! Text-generation backend trait and types.
//!
//! Abstracts over the supported providers (OpenAI, Gemini). Callers hand over
//! a single prompt and get back the raw reply text.

use async_trait::async_trait;
use icebreaker_types::Provider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for text-generation operations.
#[derive(Error, Debug)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),
    /// API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },
    /// Rate limited by the provider.
    #[error("Rate limited by provider (status {status})")]
    RateLimited {
        /// 429 or 503.
        status: u16,
    },
    /// Response parsing failed.
    #[error("Parse error: {0}")]
    Parse(String),
    /// No API key configured.
    #[error("Missing API key: {0}")]
    MissingApiKey(String),
    /// The provider answered without any text.
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

/// A single-prompt generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// The full instruction document.
    pub prompt: String,
    /// Optional system instruction.
    pub system: Option<String>,
    /// Ask the provider for a JSON-only reply.
    pub json_mode: bool,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// A JSON-mode request with the given sampling settings.
    pub fn json(prompt: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            json_mode: true,
            temperature,
            max_tokens,
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A reply from a text-generation backend.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// Concatenated reply text.
    pub text: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
}

/// A provider able to turn a prompt into text.
#[async_trait]
pub trait TextGenerationBackend: Send + Sync {
    /// Send one prompt and wait for the full reply.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Configuration for creating a backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Provider to talk to.
    pub provider: Provider,
    /// Model identifier.
    pub model: String,
    /// API key.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
}

/// SECURITY: Custom Debug impl redacts the API key.
impl std::fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}
