//! External collaborators for Icebreaker.
//!
//! Text-generation backends (OpenAI, Gemini) behind [`llm_driver::TextGenerationBackend`]
//! and the profile scraper behind [`scraper::ProfileScraper`].

pub mod drivers;
pub mod llm_driver;
pub mod scraper;

pub use drivers::create_driver;
pub use llm_driver::{
    DriverConfig, GenerationRequest, GenerationResponse, LlmError, TextGenerationBackend,
    TokenUsage,
};
pub use scraper::{ApifyScraper, ProfileScraper, ScrapeError};
