//! End-to-end pipeline tests with an in-memory scraper and backend.

use async_trait::async_trait;
use icebreaker_kernel::{
    normalize, BatchRequest, CollaboratorFactory, LeadError, LeadPipeline, LeadRequest,
};
use icebreaker_runtime::{
    GenerationRequest, GenerationResponse, LlmError, ProfileScraper, ScrapeError,
    TextGenerationBackend, TokenUsage,
};
use icebreaker_types::{IcebreakerConfig, LeadOutcome, Provider};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct FakeScraper {
    items: HashMap<String, Vec<Value>>,
}

#[async_trait]
impl ProfileScraper for FakeScraper {
    async fn scrape(&self, profile_url: &str) -> Result<Vec<Value>, ScrapeError> {
        Ok(self.items.get(profile_url).cloned().unwrap_or_default())
    }
}

struct RecordingBackend {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl TextGenerationBackend for RecordingBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt);
        Ok(GenerationResponse {
            text: self.reply.clone(),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 40,
            },
        })
    }
}

struct FakeCollaborators {
    scraper: Arc<FakeScraper>,
    backend: Arc<RecordingBackend>,
}

impl CollaboratorFactory for FakeCollaborators {
    fn scraper(&self, _token: &str) -> Result<Arc<dyn ProfileScraper>, LeadError> {
        Ok(self.scraper.clone())
    }

    fn backend(
        &self,
        _provider: Provider,
        _api_key: &str,
    ) -> Result<Arc<dyn TextGenerationBackend>, LeadError> {
        Ok(self.backend.clone())
    }
}

const JANE_URL: &str = "https://www.linkedin.com/in/jane-doe/";
const JOHN_URL: &str = "https://linkedin.com/in/john-smith-882x1/";
const PRIVATE_URL: &str = "https://linkedin.com/in/private-person/";

const JANE_REPLY: &str = r#"```json
{
  "strategy": "Company News",
  "signal_used": "Announcing our Series B",
  "icebreaker": "Congrats on announcing the Series B at Acme.",
  "message": "Hi Jane, congrats on announcing the Series B at Acme. Building through that stage is no small feat. Would love to follow what you ship next."
}
```"#;

fn test_config() -> IcebreakerConfig {
    let mut config = IcebreakerConfig::default();
    config.scraper.token_env = "ICEBREAKER_TEST_UNSET_SCRAPER_TOKEN".to_string();
    config.openai.api_key_env = "ICEBREAKER_TEST_UNSET_OPENAI_KEY".to_string();
    config.gemini.api_key_env = "ICEBREAKER_TEST_UNSET_GEMINI_KEY".to_string();
    config
}

fn setup(reply: &str) -> (LeadPipeline, Arc<RecordingBackend>) {
    let mut items = HashMap::new();
    items.insert(
        JANE_URL.to_string(),
        vec![json!({
            "fullName": "Jane Doe",
            "headline": "Founder at Acme",
            "posts": [{"text": "Announcing our Series B"}]
        })],
    );
    items.insert(JOHN_URL.to_string(), vec![json!({"headline": "Engineer"})]);
    items.insert(PRIVATE_URL.to_string(), vec![]);

    let backend = Arc::new(RecordingBackend {
        reply: reply.to_string(),
        prompts: Mutex::new(Vec::new()),
    });
    let collaborators = Arc::new(FakeCollaborators {
        scraper: Arc::new(FakeScraper { items }),
        backend: backend.clone(),
    });
    (
        LeadPipeline::with_collaborators(test_config(), collaborators),
        backend,
    )
}

fn request(url: &str, offer: &str) -> LeadRequest {
    serde_json::from_value(json!({
        "apifyKey": "apify-token",
        "apiKey": "sk-test",
        "provider": "openai",
        "profileUrl": url,
        "myOffer": offer
    }))
    .unwrap()
}

#[tokio::test]
async fn test_funding_post_without_offer_yields_networking_draft() {
    let (pipeline, backend) = setup(JANE_REPLY);

    let (lead, draft) = pipeline.process(&request(JANE_URL, "")).await.unwrap();

    assert_eq!(lead.full_name, "Jane Doe");
    assert_eq!(lead.first_name, "Jane");
    assert!(draft.message.starts_with("Hi Jane,"));
    assert!(draft.message.contains("Series B"));
    assert!(draft.message.split_whitespace().count() <= 45);

    let prompts = backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Series B"));
    assert!(prompts[0].contains("pure networking"));
}

#[tokio::test]
async fn test_offer_switches_prompt_to_sales_bridge() {
    let (pipeline, backend) = setup(JANE_REPLY);
    let offer = "We help Series B founders hire senior engineers in weeks.";

    pipeline.process(&request(JANE_URL, offer)).await.unwrap();

    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[0].contains(offer));
    assert!(!prompts[0].contains("pure networking"));
}

#[test]
fn test_null_profile_takes_name_from_url() {
    let lead = normalize(None, JOHN_URL);
    assert_eq!(lead.full_name, "John Smith");
    assert_eq!(lead.first_name, "John");
}

#[tokio::test]
async fn test_nameless_profile_takes_name_from_url() {
    let (pipeline, _) = setup(r#"{"icebreaker": "Nice stack.", "message": "Nice stack, John."}"#);

    let (lead, draft) = pipeline.process(&request(JOHN_URL, "")).await.unwrap();

    assert_eq!(lead.full_name, "John Smith");
    assert!(draft.message.starts_with("Hi John,"));
}

#[tokio::test]
async fn test_empty_scrape_is_an_error_outcome() {
    let (pipeline, backend) = setup(JANE_REPLY);

    let err = pipeline
        .process(&request(PRIVATE_URL, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, LeadError::ScrapeEmpty { .. }));

    let outcome = pipeline.process_lead(&request(PRIVATE_URL, "")).await;
    match outcome {
        LeadOutcome::Failed(failed) => {
            assert_eq!(failed.profile_url, PRIVATE_URL);
            assert!(failed.error.contains("private"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(backend.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_reply_fails_only_that_lead() {
    let (pipeline, _) = setup("I'd rather not.");

    let err = pipeline.process(&request(JANE_URL, "")).await.unwrap_err();
    assert_eq!(err.kind(), "generation_failed");
}

#[tokio::test]
async fn test_missing_credentials_are_rejected_before_scraping() {
    let (pipeline, backend) = setup(JANE_REPLY);
    let mut req = request(JANE_URL, "");
    req.api_key = "  ".to_string();

    let err = pipeline.process(&req).await.unwrap_err();
    assert!(matches!(err, LeadError::InvalidRequest(_)));
    assert!(backend.prompts.lock().unwrap().is_empty());

    let mut req = request(" ", "");
    req.profile_url = " ".to_string();
    assert!(matches!(
        pipeline.process(&req).await,
        Err(LeadError::InvalidRequest(_))
    ));
}

#[tokio::test]
async fn test_batch_continues_after_a_failure() {
    let (pipeline, backend) = setup(JANE_REPLY);
    let batch: BatchRequest = serde_json::from_value(json!({
        "apifyKey": "apify-token",
        "apiKey": "sk-test",
        "provider": "gemini",
        "leads": format!("{JANE_URL}\n{PRIVATE_URL}\n\n{JOHN_URL}")
    }))
    .unwrap();

    let results = pipeline.process_batch(&batch).await;

    assert_eq!(results.len(), 3);
    assert!(!results[0].is_error());
    assert!(results[1].is_error());
    assert!(!results[2].is_error());
    assert_eq!(results[1].profile_url(), PRIVATE_URL);
    assert_eq!(backend.prompts.lock().unwrap().len(), 2);
}
