//! OpenAI Chat Completions driver.
//!
//! `POST {base_url}/v1/chat/completions` with bearer auth. JSON replies are
//! requested through `response_format: {"type": "json_object"}`, which OpenAI
//! only accepts when a message mentions JSON, so the default system message
//! does.

use crate::llm_driver::{
    GenerationRequest, GenerationResponse, LlmError, TextGenerationBackend, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

const DEFAULT_JSON_SYSTEM: &str = "You output valid JSON.";

/// OpenAI Chat Completions driver.
pub struct OpenAiDriver {
    api_key: Zeroizing<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiDriver {
    /// Create a new OpenAI driver.
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key: Zeroizing::new(api_key),
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        if trimmed.ends_with("/chat/completions") {
            trimmed.to_string()
        } else if trimmed.ends_with("/v1") {
            format!("{trimmed}/chat/completions")
        } else {
            format!("{trimmed}/v1/chat/completions")
        }
    }
}

// ── Request types ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

// ── Response types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

// ── Conversion ─────────────────────────────────────────────────────────

fn build_request(model: &str, request: &GenerationRequest) -> ChatRequest {
    let system = request
        .system
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .or_else(|| request.json_mode.then(|| DEFAULT_JSON_SYSTEM.to_string()));

    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: Some(system),
        });
    }
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: Some(request.prompt.clone()),
    });

    ChatRequest {
        model: model.to_string(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request
            .json_mode
            .then_some(ResponseFormat { kind: "json_object" }),
    }
}

fn convert_response(resp: ChatResponse) -> Result<GenerationResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("No choices in OpenAI response".to_string()))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(LlmError::Api {
            status: 200,
            message: "OpenAI filtered the response (finish_reason=content_filter)".to_string(),
        });
    }

    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let usage = resp
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(GenerationResponse { text, usage })
}

// ── TextGenerationBackend implementation ──────────────────────────────

#[async_trait]
impl TextGenerationBackend for OpenAiDriver {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey("OpenAI API key is empty".to_string()));
        }

        let body = build_request(&self.model, &request);
        let url = self.endpoint_url();
        debug!(url = %url, model = %self.model, json_mode = request.json_mode, "Sending OpenAI request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if status == 429 || status == 503 {
            return Err(LlmError::RateLimited { status });
        }

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api { status, message });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

        convert_response(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(base: &str) -> OpenAiDriver {
        OpenAiDriver::new("sk-test".to_string(), "gpt-4o".to_string(), base.to_string())
    }

    #[test]
    fn test_endpoint_url_variants() {
        assert_eq!(
            driver("https://api.openai.com").endpoint_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            driver("https://proxy.local/v1/").endpoint_url(),
            "https://proxy.local/v1/chat/completions"
        );
        assert_eq!(
            driver("https://proxy.local/v1/chat/completions").endpoint_url(),
            "https://proxy.local/v1/chat/completions"
        );
    }

    #[test]
    fn test_build_request_json_mode_adds_system() {
        let request = GenerationRequest::json("Lead data...", 0.75, 800);
        let body = serde_json::to_value(build_request("gpt-4o", &request)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], DEFAULT_JSON_SYSTEM);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Lead data...");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_build_request_plain_has_no_format() {
        let mut request = GenerationRequest::json("Hi", 0.0, 10);
        request.json_mode = false;
        let body = serde_json::to_value(build_request("gpt-4o", &request)).unwrap();
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_convert_response_text() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"message\":\"Hi\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4}
        }))
        .unwrap();
        let out = convert_response(resp).unwrap();
        assert_eq!(out.text, "{\"message\":\"Hi\"}");
        assert_eq!(out.usage.input_tokens, 12);
        assert_eq!(out.usage.output_tokens, 4);
    }

    #[test]
    fn test_convert_response_null_content_is_empty() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(matches!(
            convert_response(resp),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_convert_response_no_choices() {
        let resp: ChatResponse = serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(convert_response(resp), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_openai_error_body() {
        let err: OpenAiErrorResponse = serde_json::from_str(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        )
        .unwrap();
        assert_eq!(err.error.message, "Incorrect API key provided");
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_before_network() {
        let driver = OpenAiDriver::new(
            "  ".to_string(),
            "gpt-4o".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        let err = driver
            .generate(GenerationRequest::json("x", 0.0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey(_)));
    }
}
