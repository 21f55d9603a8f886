//! The per-lead pipeline: scrape, normalize, compose.
//!
//! Leads are independent. A batch runs them one after another and turns each
//! failure into an error outcome instead of stopping.

use crate::compose::Composer;
use crate::error::LeadError;
use crate::normalize::Normalizer;
use icebreaker_runtime::{
    create_driver, ApifyScraper, DriverConfig, ProfileScraper, TextGenerationBackend,
};
use icebreaker_types::{IcebreakerConfig, LeadOutcome, LeadRecord, OutreachDraft, Provider};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

/// One lead to process, as sent by the browser UI.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRequest {
    #[serde(rename = "apifyKey", default)]
    pub scraper_token: String,
    #[serde(default)]
    pub api_key: String,
    pub provider: Provider,
    #[serde(default)]
    pub profile_url: String,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub my_offer: Option<String>,
}

/// SECURITY: Custom Debug impl redacts credentials.
impl std::fmt::Debug for LeadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadRequest")
            .field("scraper_token", &redact(&self.scraper_token))
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("profile_url", &self.profile_url)
            .field("custom_prompt", &self.custom_prompt)
            .field("my_offer", &self.my_offer)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.trim().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

/// Several leads sharing credentials, offer and instructions.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    #[serde(rename = "apifyKey", default)]
    pub scraper_token: String,
    #[serde(default)]
    pub api_key: String,
    pub provider: Provider,
    #[serde(default)]
    pub profile_urls: Vec<String>,
    /// Newline separated URLs, as pasted into the UI text area.
    #[serde(default)]
    pub leads: Option<String>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub my_offer: Option<String>,
}

impl std::fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRequest")
            .field("scraper_token", &redact(&self.scraper_token))
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("urls", &self.urls().len())
            .finish()
    }
}

impl BatchRequest {
    /// Every non-blank URL, `profileUrls` first, in submission order.
    pub fn urls(&self) -> Vec<String> {
        self.profile_urls
            .iter()
            .map(String::as_str)
            .chain(self.leads.as_deref().unwrap_or_default().lines())
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// The single-lead request for `profile_url`.
    pub fn lead_request(&self, profile_url: &str) -> LeadRequest {
        LeadRequest {
            scraper_token: self.scraper_token.clone(),
            api_key: self.api_key.clone(),
            provider: self.provider,
            profile_url: profile_url.to_string(),
            custom_prompt: self.custom_prompt.clone(),
            my_offer: self.my_offer.clone(),
        }
    }
}

/// Builds the external collaborators for one lead from its credentials.
pub trait CollaboratorFactory: Send + Sync {
    fn scraper(&self, token: &str) -> Result<Arc<dyn ProfileScraper>, LeadError>;

    fn backend(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<Arc<dyn TextGenerationBackend>, LeadError>;
}

/// Real Apify scraper and OpenAI/Gemini backends.
pub struct LiveCollaborators {
    config: Arc<IcebreakerConfig>,
}

impl LiveCollaborators {
    pub fn new(config: Arc<IcebreakerConfig>) -> Self {
        Self { config }
    }
}

impl CollaboratorFactory for LiveCollaborators {
    fn scraper(&self, token: &str) -> Result<Arc<dyn ProfileScraper>, LeadError> {
        Ok(Arc::new(ApifyScraper::new(
            token.to_string(),
            self.config.scraper.clone(),
        )))
    }

    fn backend(
        &self,
        provider: Provider,
        api_key: &str,
    ) -> Result<Arc<dyn TextGenerationBackend>, LeadError> {
        let settings = self.config.provider(provider);
        let driver = create_driver(&DriverConfig {
            provider,
            model: settings.model.clone(),
            api_key: Some(api_key.to_string()),
            base_url: Some(settings.base_url.clone()),
        })?;
        Ok(driver)
    }
}

/// Runs leads through scrape, normalize and compose.
pub struct LeadPipeline {
    config: Arc<IcebreakerConfig>,
    collaborators: Arc<dyn CollaboratorFactory>,
    normalizer: Normalizer,
}

impl LeadPipeline {
    /// Pipeline talking to the live services.
    pub fn new(config: IcebreakerConfig) -> Self {
        let config = Arc::new(config);
        let collaborators = Arc::new(LiveCollaborators::new(Arc::clone(&config)));
        Self {
            config,
            collaborators,
            normalizer: Normalizer::default(),
        }
    }

    pub fn with_collaborators(
        config: IcebreakerConfig,
        collaborators: Arc<dyn CollaboratorFactory>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
            normalizer: Normalizer::default(),
        }
    }

    pub fn config(&self) -> &IcebreakerConfig {
        &self.config
    }

    /// Process one lead to a record and a draft, or fail.
    pub async fn process(
        &self,
        request: &LeadRequest,
    ) -> Result<(LeadRecord, OutreachDraft), LeadError> {
        let profile_url = request.profile_url.trim();
        if profile_url.is_empty() {
            return Err(LeadError::InvalidRequest(
                "profileUrl is required".to_string(),
            ));
        }

        let token = credential(
            &request.scraper_token,
            &self.config.scraper.token_env,
            "scraper token (apifyKey)",
        )?;
        let settings = self.config.provider(request.provider);
        let api_key = credential(
            &request.api_key,
            &settings.api_key_env,
            &format!("{} API key (apiKey)", request.provider.display_name()),
        )?;

        let scraper = self.collaborators.scraper(&token)?;
        let backend = self.collaborators.backend(request.provider, &api_key)?;

        let items = scraper.scrape(profile_url).await?;
        debug!(items = items.len(), "Scraper returned items");
        let raw = first_profile(items).ok_or_else(|| LeadError::ScrapeEmpty {
            profile_url: profile_url.to_string(),
        })?;

        let lead = self.normalizer.normalize(Some(&raw), profile_url);
        let composer = Composer::new(
            self.config.composer.clone(),
            settings.temperature,
            settings.max_tokens,
        );
        let draft = composer
            .compose(
                &lead,
                request.my_offer.as_deref().unwrap_or_default(),
                request.custom_prompt.as_deref().unwrap_or_default(),
                backend.as_ref(),
            )
            .await?;
        Ok((lead, draft))
    }

    /// Process one lead and fold any failure into an error outcome.
    pub async fn process_lead(&self, request: &LeadRequest) -> LeadOutcome {
        self.process_lead_with_error(request)
            .await
            .unwrap_or_else(|(outcome, _)| outcome)
    }

    /// Like [`process_lead`](Self::process_lead), but hands the error back too
    /// so callers can pick a status code.
    pub async fn process_lead_with_error(
        &self,
        request: &LeadRequest,
    ) -> Result<LeadOutcome, (LeadOutcome, LeadError)> {
        let span = info_span!(
            "lead",
            profile_url = %request.profile_url.trim(),
            provider = %request.provider
        );
        async {
            info!("Processing lead");
            match self.process(request).await {
                Ok((lead, draft)) => {
                    info!(name = %lead.full_name, strategy = ?draft.strategy, "Lead drafted");
                    Ok(LeadOutcome::drafted(&lead, draft))
                }
                Err(e) => {
                    warn!(kind = e.kind(), error = %e, "Lead failed");
                    let outcome = LeadOutcome::failed(request.profile_url.trim(), e.to_string());
                    Err((outcome, e))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Process every URL of a batch in order. Never stops early.
    pub async fn process_batch(&self, batch: &BatchRequest) -> Vec<LeadOutcome> {
        let urls = batch.urls();
        info!(leads = urls.len(), "Starting batch");

        let mut results = Vec::with_capacity(urls.len());
        for url in &urls {
            let request = batch.lead_request(url);
            results.push(self.process_lead(&request).await);
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
            leads = results.len(),
            drafted = results.len() - failed,
            failed,
            "Batch finished"
        );
        results
    }
}

/// Supplied credential, else the named environment variable.
fn credential(supplied: &str, env_name: &str, what: &str) -> Result<String, LeadError> {
    let supplied = supplied.trim();
    if !supplied.is_empty() {
        return Ok(supplied.to_string());
    }
    std::env::var(env_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            LeadError::InvalidRequest(format!("Missing {what}; set it in the request or {env_name}"))
        })
}

/// The first scraped item, when it is a non-empty object.
fn first_profile(items: Vec<Value>) -> Option<Value> {
    items
        .into_iter()
        .next()
        .filter(|item| item.as_object().is_some_and(|o| !o.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lead_request_uses_ui_field_names() {
        let req: LeadRequest = serde_json::from_value(json!({
            "apifyKey": "apify-secret",
            "apiKey": "sk-secret",
            "provider": "gemini",
            "profileUrl": "https://linkedin.com/in/jane-doe",
            "myOffer": "We build data teams"
        }))
        .unwrap();
        assert_eq!(req.scraper_token, "apify-secret");
        assert_eq!(req.api_key, "sk-secret");
        assert_eq!(req.provider, Provider::Gemini);
        assert_eq!(req.custom_prompt, None);
        assert_eq!(req.my_offer.as_deref(), Some("We build data teams"));
    }

    #[test]
    fn test_lead_request_debug_redacts_credentials() {
        let req: LeadRequest = serde_json::from_value(json!({
            "apifyKey": "apify-secret",
            "apiKey": "",
            "provider": "openai",
            "profileUrl": "https://linkedin.com/in/jane-doe"
        }))
        .unwrap();
        let debug = format!("{req:?}");
        assert!(!debug.contains("apify-secret"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("<empty>"));
    }

    #[test]
    fn test_batch_urls_merge_list_and_text() {
        let batch: BatchRequest = serde_json::from_value(json!({
            "provider": "openai",
            "profileUrls": ["https://linkedin.com/in/a", "  "],
            "leads": "https://linkedin.com/in/b\n\n  https://linkedin.com/in/c  \r\n"
        }))
        .unwrap();
        assert_eq!(
            batch.urls(),
            vec![
                "https://linkedin.com/in/a",
                "https://linkedin.com/in/b",
                "https://linkedin.com/in/c"
            ]
        );
        let req = batch.lead_request("https://linkedin.com/in/b");
        assert_eq!(req.profile_url, "https://linkedin.com/in/b");
        assert_eq!(req.provider, Provider::OpenAi);
    }

    #[test]
    fn test_first_profile_rejects_empty_shapes() {
        assert!(first_profile(vec![]).is_none());
        assert!(first_profile(vec![Value::Null]).is_none());
        assert!(first_profile(vec![json!({})]).is_none());
        assert!(first_profile(vec![json!("text")]).is_none());
        assert!(first_profile(vec![json!({"fullName": "A"}), json!({})]).is_some());
    }

    #[test]
    fn test_supplied_credential_wins() {
        assert_eq!(
            credential("  key ", "ICEBREAKER_TEST_UNSET_VAR", "key").unwrap(),
            "key"
        );
        let err = credential("", "ICEBREAKER_TEST_UNSET_VAR", "scraper token").unwrap_err();
        assert!(matches!(err, LeadError::InvalidRequest(_)));
        assert!(err.to_string().contains("ICEBREAKER_TEST_UNSET_VAR"));
    }
}
