//! Lead records, outreach drafts and the per-lead outcome returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder used whenever no usable name can be resolved for a lead.
pub const FALLBACK_NAME: &str = "there";

/// Canonical view of one scraped profile.
///
/// `full_name` and `first_name` are never empty; every other field may be.
/// Sequences keep the scraper's raw items in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub full_name: String,
    pub first_name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub posts: Vec<Value>,
    #[serde(default)]
    pub experience: Vec<Value>,
    #[serde(default)]
    pub education: Vec<Value>,
    pub source_url: String,
}

impl LeadRecord {
    /// A record with only a display name and source URL.
    pub fn named(full_name: impl Into<String>, source_url: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let first_name = full_name
            .split(' ')
            .next()
            .filter(|t| !t.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .to_string();
        Self {
            full_name,
            first_name,
            headline: String::new(),
            about: String::new(),
            posts: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            source_url: source_url.into(),
        }
    }
}

/// The generated icebreaker and message for one lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachDraft {
    /// Short label for the chosen approach, e.g. "Recent Post".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// The signal the backend based the icebreaker on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_used: Option<String>,
    pub icebreaker: String,
    pub message: String,
}

/// Result row for one submitted profile URL.
///
/// Serializes to the outbound shape consumed by the browser UI: generated
/// fields on success, an `error` string on failure. Failed leads keep their
/// place in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LeadOutcome {
    Drafted(DraftedLead),
    Failed(FailedLead),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftedLead {
    pub name: String,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_used: Option<String>,
    pub icebreaker: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedLead {
    pub name: String,
    pub profile_url: String,
    pub error: String,
}

impl LeadOutcome {
    pub fn drafted(lead: &LeadRecord, draft: OutreachDraft) -> Self {
        LeadOutcome::Drafted(DraftedLead {
            name: lead.full_name.clone(),
            profile_url: lead.source_url.clone(),
            strategy: draft.strategy,
            signal_used: draft.signal_used,
            icebreaker: draft.icebreaker,
            message: draft.message,
        })
    }

    pub fn failed(profile_url: impl Into<String>, error: impl Into<String>) -> Self {
        LeadOutcome::Failed(FailedLead {
            name: "Error".to_string(),
            profile_url: profile_url.into(),
            error: error.into(),
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LeadOutcome::Failed(_))
    }

    pub fn profile_url(&self) -> &str {
        match self {
            LeadOutcome::Drafted(d) => &d.profile_url,
            LeadOutcome::Failed(f) => &f.profile_url,
        }
    }
}
