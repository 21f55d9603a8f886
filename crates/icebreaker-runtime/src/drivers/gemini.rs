//! Google Gemini API driver.
//!
//! Native implementation of the Gemini generateContent API:
//! - Model goes in the URL path, not the request body
//! - Auth via `x-goog-api-key` header (not `Authorization: Bearer`)
//! - System prompt via `systemInstruction` field
//! - JSON replies via `generationConfig.responseMimeType`
//! - Response: `candidates[0].content.parts[]`

use crate::llm_driver::{
    GenerationRequest, GenerationResponse, LlmError, TextGenerationBackend, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

/// Google Gemini API driver.
pub struct GeminiDriver {
    api_key: Zeroizing<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiDriver {
    /// Create a new Gemini driver.
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            api_key: Zeroizing::new(api_key),
            model,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// ── Request types ──────────────────────────────────────────────────────

/// Top-level Gemini API request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A content entry (user/model turn).
#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// A part within a content entry. Only text parts are produced or read.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Generation configuration (temperature, max tokens, reply format).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

// ── Response types ─────────────────────────────────────────────────────

/// Top-level Gemini API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

/// Gemini API error response.
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

// ── Conversion ─────────────────────────────────────────────────────────

fn build_request(request: &GenerationRequest) -> GeminiRequest {
    let system_instruction = request
        .system
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .map(|text| GeminiContent {
            role: None, // systemInstruction doesn't use a role
            parts: vec![GeminiPart {
                text: Some(text.clone()),
            }],
        });

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(request.prompt.clone()),
            }],
        }],
        system_instruction,
        generation_config: Some(GenerationConfig {
            temperature: Some(request.temperature),
            max_output_tokens: Some(request.max_tokens),
            response_mime_type: request
                .json_mode
                .then(|| "application/json".to_string()),
        }),
    }
}

/// Convert a Gemini response into our GenerationResponse.
fn convert_response(resp: GeminiResponse) -> Result<GenerationResponse, LlmError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Parse("No candidates in Gemini response".to_string()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(LlmError::Api {
            status: 200,
            message: "Gemini blocked the response (finishReason=SAFETY)".to_string(),
        });
    }

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    let usage = resp
        .usage_metadata
        .map(|u| TokenUsage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();

    Ok(GenerationResponse { text, usage })
}

// ── TextGenerationBackend implementation ──────────────────────────────

#[async_trait]
impl TextGenerationBackend for GeminiDriver {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey("Gemini API key is empty".to_string()));
        }

        let gemini_request = build_request(&request);
        let url = self.endpoint_url();
        debug!(url = %url, json_mode = request.json_mode, "Sending Gemini API request");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .header("content-type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if status == 429 || status == 503 {
            return Err(LlmError::RateLimited { status });
        }

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api { status, message });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        let gemini_response: GeminiResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

        convert_response(gemini_response)
    }
}
