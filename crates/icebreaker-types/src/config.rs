//! Configuration loaded from `~/.icebreaker/config.toml`.
//!
//! Every field has a default so a missing or partial file still yields a
//! usable configuration.

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IcebreakerConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: String,
    pub scraper: ScraperConfig,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub composer: ComposerSettings,
}

impl Default for IcebreakerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:4200".to_string(),
            scraper: ScraperConfig::default(),
            openai: ProviderConfig::openai(),
            gemini: ProviderConfig::gemini(),
            composer: ComposerSettings::default(),
        }
    }
}

/// Input contract and endpoint of the profile-scraping actor.
///
/// Actors disagree on how the profile URL is passed in, so the key name and
/// list wrapping are configurable alongside arbitrary extra input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub base_url: String,
    /// Actor identifier, `user/actor` or `user~actor`.
    pub actor_id: String,
    /// Input key carrying the profile URL.
    pub url_input_key: String,
    /// Wrap the URL in a single-element list (`profileUrls: [url]`).
    pub url_as_list: bool,
    /// Seconds the API may hold each start/poll request open.
    pub wait_secs: u64,
    /// Poll requests issued before giving up on an unfinished run.
    pub max_polls: u32,
    /// Environment variable consulted when a request carries no token.
    pub token_env: String,
    /// Extra input merged into every run, e.g. `deepScrape = true`.
    pub extra_input: Map<String, Value>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        let mut extra_input = Map::new();
        extra_input.insert("deepScrape".to_string(), Value::Bool(true));
        Self {
            base_url: "https://api.apify.com".to_string(),
            actor_id: "rocky/linkedin-profile-scraper".to_string(),
            url_input_key: "profileUrls".to_string(),
            url_as_list: true,
            wait_secs: 60,
            max_polls: 10,
            token_env: "APIFY_TOKEN".to_string(),
            extra_input,
        }
    }
}

/// Per-provider model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Environment variable consulted when a request carries no API key.
    pub api_key_env: String,
}

impl ProviderConfig {
    pub fn openai() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com".to_string(),
            temperature: 0.75,
            max_tokens: 800,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }

    pub fn gemini() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.75,
            max_tokens: 800,
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::openai()
    }
}

/// Prompt sizing and mode switching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    /// Posts/positions/schools included in the lead summary.
    pub max_items: usize,
    /// Characters of the about section included in the lead summary.
    pub about_chars: usize,
    /// An offer longer than this (after trimming) switches to sales-bridge mode.
    pub offer_min_chars: usize,
    /// Word cap for pure-networking messages.
    pub networking_word_cap: usize,
    /// Instructions applied when a request supplies none.
    pub default_custom_instructions: String,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            max_items: 3,
            about_chars: 500,
            offer_min_chars: 5,
            networking_word_cap: 45,
            default_custom_instructions: String::new(),
        }
    }
}

impl IcebreakerConfig {
    /// `~/.icebreaker/config.toml`, or `./.icebreaker/config.toml` without a home dir.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".icebreaker")
            .join("config.toml")
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, body).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scraper.actor_id.trim().is_empty() {
            return Err(ConfigError::Invalid("scraper.actor_id is empty".to_string()));
        }
        if self.scraper.url_input_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "scraper.url_input_key is empty".to_string(),
            ));
        }
        if self.scraper.max_polls == 0 {
            return Err(ConfigError::Invalid(
                "scraper.max_polls must be at least 1".to_string(),
            ));
        }
        if self.composer.max_items == 0 || self.composer.about_chars == 0 {
            return Err(ConfigError::Invalid(
                "composer.max_items and composer.about_chars must be positive".to_string(),
            ));
        }
        if self.composer.networking_word_cap == 0 {
            return Err(ConfigError::Invalid(
                "composer.networking_word_cap must be positive".to_string(),
            ));
        }
        for (name, p) in [("openai", &self.openai), ("gemini", &self.gemini)] {
            if p.model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name}.model is empty")));
            }
        }
        Ok(())
    }

    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Gemini => &self.gemini,
        }
    }
}
