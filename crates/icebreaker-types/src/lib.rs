//! Shared types for Icebreaker.
//!
//! Lead records, outreach drafts, provider selection and configuration used by
//! every other crate in the workspace.

pub mod config;
pub mod lead;
pub mod provider;

pub use config::{ComposerSettings, ConfigError, IcebreakerConfig, ProviderConfig, ScraperConfig};
pub use lead::{DraftedLead, FailedLead, LeadOutcome, LeadRecord, OutreachDraft, FALLBACK_NAME};
pub use provider::Provider;
