//! Concrete text-generation backends and the factory that picks one.

pub mod gemini;
pub mod openai;

use crate::llm_driver::{DriverConfig, LlmError, TextGenerationBackend};
use icebreaker_types::{Provider, ProviderConfig};
use std::sync::Arc;

/// Build the backend for `config.provider`.
///
/// A blank or missing key is rejected here so callers get a clear error before
/// any prompt is sent.
pub fn create_driver(config: &DriverConfig) -> Result<Arc<dyn TextGenerationBackend>, LlmError> {
    let api_key = config
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            LlmError::MissingApiKey(format!("No API key supplied for {}", config.provider))
        })?
        .to_string();

    let defaults = match config.provider {
        Provider::OpenAi => ProviderConfig::openai(),
        Provider::Gemini => ProviderConfig::gemini(),
    };
    let base_url = config
        .base_url
        .clone()
        .filter(|u| !u.trim().is_empty())
        .unwrap_or(defaults.base_url);
    let model = if config.model.trim().is_empty() {
        defaults.model
    } else {
        config.model.clone()
    };

    let driver: Arc<dyn TextGenerationBackend> = match config.provider {
        Provider::OpenAi => Arc::new(openai::OpenAiDriver::new(api_key, model, base_url)),
        Provider::Gemini => Arc::new(gemini::GeminiDriver::new(api_key, model, base_url)),
    };
    Ok(driver)
}
