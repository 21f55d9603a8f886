//! Candidate signal detection.
//!
//! Scans a lead for noteworthy facts and ranks them by category. The ranked
//! list is handed to the backend as hints; the backend still picks the one
//! signal the icebreaker is built on.

use crate::normalize::adapters::item_text;
use icebreaker_types::LeadRecord;
use serde::Serialize;
use serde_json::Value;

const POST_TEXT_KEYS: &[&str] = &[
    "text",
    "content",
    "postText",
    "commentary",
    "description",
    "title",
];
const POSITION_TITLE_KEYS: &[&str] = &["title", "position", "role", "jobTitle"];
const POSITION_COMPANY_KEYS: &[&str] = &["companyName", "company", "company_name", "subtitle"];
const POSITION_DESCRIPTION_KEYS: &[&str] = &["description", "summary"];

const NEWS_KEYWORDS: &[&str] = &[
    "raised",
    "funding",
    "series a",
    "series b",
    "series c",
    "seed round",
    "acquired",
    "acquisition",
    "launch",
    "launched",
    "launching",
    "announcing",
    "announce",
    "announced",
    "award",
    "awarded",
    "awards",
    "forbes",
    "ipo",
    "milestone",
    "milestones",
    "expansion",
];
const VENTURE_KEYWORDS: &[&str] = &[
    "founder",
    "co-founder",
    "cofounder",
    "founded",
    "exit",
    "exited",
    "acquired",
];

const EVIDENCE_CHARS: usize = 180;
const MAX_SIGNALS: usize = 5;

/// Signal categories, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    CompanyNews,
    RecentPost,
    CareerHistory,
    RoleInference,
    External,
}

impl SignalCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SignalCategory::CompanyNews => "Company news",
            SignalCategory::RecentPost => "Recent post",
            SignalCategory::CareerHistory => "Career history",
            SignalCategory::RoleInference => "Role inference",
            SignalCategory::External => "External signal",
        }
    }
}

/// A detected fact worth opening with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal {
    pub category: SignalCategory,
    pub evidence: String,
}

/// Detect and rank candidate signals, strongest first.
pub fn detect_signals(lead: &LeadRecord, custom_instructions: &str) -> Vec<Signal> {
    let mut signals = Vec::new();

    let post_texts: Vec<String> = lead
        .posts
        .iter()
        .filter_map(|p| post_text(p))
        .collect();

    // Company news can show up in a post or in the profile itself.
    let news_sources = post_texts
        .iter()
        .map(String::as_str)
        .chain([lead.headline.as_str(), lead.about.as_str()]);
    for text in news_sources {
        if let Some(snippet) = keyword_snippet(text, NEWS_KEYWORDS) {
            signals.push(Signal {
                category: SignalCategory::CompanyNews,
                evidence: snippet,
            });
            break;
        }
    }

    if let Some(first) = post_texts.first() {
        signals.push(Signal {
            category: SignalCategory::RecentPost,
            evidence: clip(first),
        });
    }

    if let Some(career) = career_signal(&lead.experience) {
        signals.push(Signal {
            category: SignalCategory::CareerHistory,
            evidence: career,
        });
    }

    if !lead.headline.trim().is_empty() {
        signals.push(Signal {
            category: SignalCategory::RoleInference,
            evidence: clip(&lead.headline),
        });
    }

    if !custom_instructions.trim().is_empty() {
        signals.push(Signal {
            category: SignalCategory::External,
            evidence: "See the additional instructions for externally supplied context."
                .to_string(),
        });
    }

    signals.sort_by_key(|s| s.category);
    signals.truncate(MAX_SIGNALS);
    signals
}

fn post_text(post: &Value) -> Option<String> {
    match post {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(_) => item_text(post, POST_TEXT_KEYS),
        _ => None,
    }
}

/// A founded venture or exit anywhere in the history beats the latest role.
fn career_signal(experience: &[Value]) -> Option<String> {
    let describe = |item: &Value| -> Option<String> {
        let title = item_text(item, POSITION_TITLE_KEYS);
        let company = item_text(item, POSITION_COMPANY_KEYS);
        match (title, company) {
            (Some(t), Some(c)) => Some(format!("{t} at {c}")),
            (Some(t), None) => Some(t),
            (None, Some(c)) => Some(format!("Worked at {c}")),
            (None, None) => None,
        }
    };

    let venture = experience.iter().find(|item| {
        let text = [
            item_text(item, POSITION_TITLE_KEYS),
            item_text(item, POSITION_DESCRIPTION_KEYS),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
        contains_keyword(&text, VENTURE_KEYWORDS)
    });

    venture
        .and_then(describe)
        .or_else(|| experience.first().and_then(describe))
        .map(|s| clip(&s))
}

/// Keyword hits must be whole words ("raised" but not "praised", "ipo" but not "ipod").
fn contains_keyword(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| {
        lower.match_indices(k).any(|(i, m)| {
            let starts = lower[..i]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let ends = lower[i + m.len()..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            starts && ends
        })
    })
}

/// The sentence containing the first keyword hit, clipped.
fn keyword_snippet(text: &str, keywords: &[&str]) -> Option<String> {
    let sentence = text
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| contains_keyword(s, keywords))?;
    Some(clip(sentence))
}

fn clip(text: &str) -> String {
    crate::compose::truncate_cleaned_text(text, EVIDENCE_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead() -> LeadRecord {
        LeadRecord::named("Jane Doe", "https://linkedin.com/in/jane-doe")
    }

    #[test]
    fn test_funding_post_ranks_first() {
        let mut lead = lead();
        lead.headline = "Founder at Acme".to_string();
        lead.posts = vec![json!({"text": "Announcing our Series B! Thanks to the team."})];
        let signals = detect_signals(&lead, "");
        assert_eq!(signals[0].category, SignalCategory::CompanyNews);
        assert!(signals[0].evidence.contains("Series B"));
        assert_eq!(signals[1].category, SignalCategory::RecentPost);
        assert_eq!(signals.last().unwrap().category, SignalCategory::RoleInference);
    }

    #[test]
    fn test_founded_venture_beats_latest_role() {
        let mut lead = lead();
        lead.experience = vec![
            json!({"title": "Advisor", "companyName": "Big Corp"}),
            json!({"title": "Co-Founder & CEO", "company": {"name": "Rocket Labs"}}),
        ];
        let signals = detect_signals(&lead, "");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].category, SignalCategory::CareerHistory);
        assert_eq!(signals[0].evidence, "Co-Founder & CEO at Rocket Labs");
    }

    #[test]
    fn test_latest_role_used_without_venture() {
        let mut lead = lead();
        lead.experience = vec![json!({"title": "VP Sales", "companyName": "Initech"})];
        let signals = detect_signals(&lead, "");
        assert_eq!(signals[0].evidence, "VP Sales at Initech");
    }

    #[test]
    fn test_string_posts_are_read() {
        let mut lead = lead();
        lead.posts = vec![json!("Thoughts on hiring engineers in 2024")];
        let signals = detect_signals(&lead, "");
        assert_eq!(signals[0].category, SignalCategory::RecentPost);
    }

    #[test]
    fn test_external_signal_from_instructions() {
        let signals = detect_signals(&lead(), "Their company just opened a Berlin office.");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].category, SignalCategory::External);
    }

    #[test]
    fn test_keywords_match_at_word_start_only() {
        assert!(contains_keyword("We raised $4M", NEWS_KEYWORDS));
        assert!(!contains_keyword("Customers praised the app", NEWS_KEYWORDS));
    }

    #[test]
    fn test_keywords_match_at_word_end_only() {
        assert!(!contains_keyword("Still using my iPod", NEWS_KEYWORDS));
        assert!(!contains_keyword("Exiting the building", VENTURE_KEYWORDS));
        assert!(contains_keyword("Big IPO today!", NEWS_KEYWORDS));
        assert!(contains_keyword("We exited in 2021", VENTURE_KEYWORDS));
        assert!(contains_keyword("Series B, announced today", NEWS_KEYWORDS));
        assert!(contains_keyword("Co-Founder & CEO", VENTURE_KEYWORDS));
    }

    #[test]
    fn test_empty_lead_has_no_signals() {
        assert!(detect_signals(&lead(), "   ").is_empty());
    }

    #[test]
    fn test_categories_are_ordered_by_strength() {
        assert!(SignalCategory::CompanyNews < SignalCategory::RecentPost);
        assert!(SignalCategory::RoleInference < SignalCategory::External);
    }
}
