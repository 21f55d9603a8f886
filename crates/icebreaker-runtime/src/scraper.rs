//! Profile scraping through an Apify-style actor.
//!
//! One scrape is one actor run: start it with the configured input, poll the
//! run until it reaches a terminal status, then list its default dataset.
//! The dataset items are returned untouched; interpreting them is the
//! normalizer's job.

use async_trait::async_trait;
use icebreaker_types::ScraperConfig;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Error type for scraping operations.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// HTTP request failed.
    #[error("Scraper HTTP error: {0}")]
    Http(String),
    /// Scraper API returned an error.
    #[error("Scraper API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The actor run ended without succeeding.
    #[error("Scraper run {run_id} finished with status {status}")]
    RunFailed { run_id: String, status: String },
    /// The run was still going after every poll.
    #[error("Scraper run {run_id} did not finish after {polls} polls")]
    Unfinished { run_id: String, polls: u32 },
    /// Response parsing failed.
    #[error("Scraper parse error: {0}")]
    Parse(String),
    /// No token configured.
    #[error("Missing scraper token")]
    MissingToken,
}

/// Something that can fetch raw profile items for a profile URL.
#[async_trait]
pub trait ProfileScraper: Send + Sync {
    /// Scrape one profile URL and return every item the scraper produced.
    async fn scrape(&self, profile_url: &str) -> Result<Vec<Value>, ScrapeError>;
}

/// Apify REST client for a single configured actor.
pub struct ApifyScraper {
    token: Zeroizing<String>,
    config: ScraperConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: RunInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunInfo {
    id: String,
    status: String,
    #[serde(default)]
    default_dataset_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApifyErrorResponse {
    error: ApifyErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApifyErrorDetail {
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Pending,
    Succeeded,
    Failed,
}

fn run_state(status: &str) -> RunState {
    match status {
        "SUCCEEDED" => RunState::Succeeded,
        "FAILED" | "ABORTED" | "TIMED-OUT" => RunState::Failed,
        _ => RunState::Pending,
    }
}

/// Actor ids are written `user/actor` but addressed as `user~actor` in paths.
fn actor_path_id(actor_id: &str) -> String {
    actor_id.trim().replace('/', "~")
}

/// Build the actor input for one profile URL from the configured contract.
pub fn build_run_input(config: &ScraperConfig, profile_url: &str) -> Value {
    let mut input: Map<String, Value> = config.extra_input.clone();
    let url = Value::String(profile_url.to_string());
    let url_value = if config.url_as_list {
        Value::Array(vec![url])
    } else {
        url
    };
    input.insert(config.url_input_key.clone(), url_value);
    Value::Object(input)
}

impl ApifyScraper {
    pub fn new(token: String, config: ScraperConfig) -> Self {
        Self {
            token: Zeroizing::new(token),
            config,
            client: reqwest::Client::new(),
        }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ScrapeError> {
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ScrapeError::Http(e.to_string()))?;
        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ApifyErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ScrapeError::Api { status, message });
        }
        serde_json::from_str(&body).map_err(|e| ScrapeError::Parse(e.to_string()))
    }

    async fn start_run(&self, profile_url: &str) -> Result<RunInfo, ScrapeError> {
        let url = format!(
            "{}/v2/acts/{}/runs",
            self.base(),
            actor_path_id(&self.config.actor_id)
        );
        let input = build_run_input(&self.config, profile_url);
        debug!(url = %url, actor = %self.config.actor_id, "Starting scraper run");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .query(&[("waitForFinish", self.config.wait_secs)])
            .json(&input)
            .send()
            .await
            .map_err(|e| ScrapeError::Http(e.to_string()))?;
        Ok(Self::read_json::<RunEnvelope>(resp).await?.data)
    }

    async fn poll_run(&self, run_id: &str) -> Result<RunInfo, ScrapeError> {
        let url = format!("{}/v2/actor-runs/{}", self.base(), run_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_str())
            .query(&[("waitForFinish", self.config.wait_secs)])
            .send()
            .await
            .map_err(|e| ScrapeError::Http(e.to_string()))?;
        Ok(Self::read_json::<RunEnvelope>(resp).await?.data)
    }

    async fn list_items(&self, dataset_id: &str) -> Result<Vec<Value>, ScrapeError> {
        let url = format!("{}/v2/datasets/{}/items", self.base(), dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_str())
            .query(&[("format", "json"), ("clean", "true")])
            .send()
            .await
            .map_err(|e| ScrapeError::Http(e.to_string()))?;
        Self::read_json::<Vec<Value>>(resp).await
    }
}

#[async_trait]
impl ProfileScraper for ApifyScraper {
    async fn scrape(&self, profile_url: &str) -> Result<Vec<Value>, ScrapeError> {
        if self.token.trim().is_empty() {
            return Err(ScrapeError::MissingToken);
        }

        let mut run = self.start_run(profile_url).await?;
        let mut polls = 0;
        loop {
            match run_state(&run.status) {
                RunState::Succeeded => break,
                RunState::Failed => {
                    warn!(run_id = %run.id, status = %run.status, "Scraper run failed");
                    return Err(ScrapeError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    });
                }
                RunState::Pending if polls >= self.config.max_polls => {
                    return Err(ScrapeError::Unfinished {
                        run_id: run.id,
                        polls,
                    });
                }
                RunState::Pending => {
                    polls += 1;
                    debug!(run_id = %run.id, status = %run.status, polls, "Polling scraper run");
                    run = self.poll_run(&run.id).await?;
                }
            }
        }

        let dataset_id = run.default_dataset_id.ok_or_else(|| {
            ScrapeError::Parse(format!("Run {} has no default dataset", run.id))
        })?;
        let items = self.list_items(&dataset_id).await?;
        info!(run_id = %run.id, items = items.len(), "Scraper results fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_run_input_list_form() {
        let config = ScraperConfig::default();
        let input = build_run_input(&config, "https://www.linkedin.com/in/jane-doe/");
        assert_eq!(
            input,
            serde_json::json!({
                "profileUrls": ["https://www.linkedin.com/in/jane-doe/"],
                "deepScrape": true
            })
        );
    }

    #[test]
    fn test_build_run_input_single_url_form() {
        let config = ScraperConfig {
            url_input_key: "url".to_string(),
            url_as_list: false,
            extra_input: Map::new(),
            ..ScraperConfig::default()
        };
        let input = build_run_input(&config, "https://linkedin.com/in/x");
        assert_eq!(input, serde_json::json!({"url": "https://linkedin.com/in/x"}));
    }

    #[test]
    fn test_url_key_overrides_extra_input() {
        let mut extra = Map::new();
        extra.insert("url".to_string(), Value::String("stale".to_string()));
        let config = ScraperConfig {
            url_input_key: "url".to_string(),
            url_as_list: false,
            extra_input: extra,
            ..ScraperConfig::default()
        };
        let input = build_run_input(&config, "fresh");
        assert_eq!(input["url"], "fresh");
    }

    #[test]
    fn test_actor_path_id() {
        assert_eq!(
            actor_path_id("rocky/linkedin-profile-scraper"),
            "rocky~linkedin-profile-scraper"
        );
        assert_eq!(actor_path_id("abc~def"), "abc~def");
    }

    #[test]
    fn test_run_states() {
        assert_eq!(run_state("SUCCEEDED"), RunState::Succeeded);
        assert_eq!(run_state("RUNNING"), RunState::Pending);
        assert_eq!(run_state("READY"), RunState::Pending);
        assert_eq!(run_state("TIMED-OUT"), RunState::Failed);
        assert_eq!(run_state("ABORTED"), RunState::Failed);
    }

    #[test]
    fn test_run_envelope_deserialization() {
        let env: RunEnvelope = serde_json::from_value(serde_json::json!({
            "data": {
                "id": "run123",
                "actId": "act",
                "status": "SUCCEEDED",
                "defaultDatasetId": "ds456"
            }
        }))
        .unwrap();
        assert_eq!(env.data.id, "run123");
        assert_eq!(env.data.default_dataset_id.as_deref(), Some("ds456"));
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let scraper = ApifyScraper::new(String::new(), ScraperConfig::default());
        let err = scraper.scrape("https://linkedin.com/in/x").await.unwrap_err();
        assert!(matches!(err, ScrapeError::MissingToken));
    }
}
