//! Error taxonomy for one lead's trip through the pipeline.

use icebreaker_runtime::{LlmError, ScrapeError};
use thiserror::Error;

/// Failure while turning a lead record into an outreach draft.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The backend call itself failed.
    #[error("Text generation failed: {0}")]
    Backend(#[from] LlmError),
    /// The backend answered with nothing usable.
    #[error("Text generation returned an empty response")]
    EmptyResponse,
    /// The reply could not be read as a draft. `raw` keeps the reply text.
    #[error("Could not parse generated draft: {reason}")]
    Malformed { reason: String, raw: String },
}

/// Failure for a single lead. Never fatal to a batch.
#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Scraper finished but returned no profiles. Profile might be private or the URL invalid.")]
    ScrapeEmpty { profile_url: String },
    #[error("Scraping failed: {0}")]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl LeadError {
    /// Short machine-readable kind, used in logs and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            LeadError::InvalidRequest(_) => "invalid_request",
            LeadError::ScrapeEmpty { .. } => "scrape_empty",
            LeadError::Scrape(_) => "scrape_failed",
            LeadError::Generation(_) => "generation_failed",
        }
    }
}

impl From<LlmError> for LeadError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey(msg) => LeadError::InvalidRequest(msg),
            other => LeadError::Generation(GenerationError::Backend(other)),
        }
    }
}
