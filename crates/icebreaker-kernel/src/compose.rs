//! Outreach composition.
//!
//! One parameterized instruction template covers both modes:
//! - Sales bridge: the detected signal is connected to the sender's offer
//! - Pure networking: no offer was given, so the message validates the signal
//!   and closes without any pitch
//!
//! The backend's reply is expected to be a JSON object, possibly wrapped in
//! markdown code fences.

use crate::error::GenerationError;
use crate::signals::{detect_signals, Signal};
use icebreaker_runtime::{GenerationRequest, TextGenerationBackend};
use icebreaker_types::{ComposerSettings, LeadRecord, OutreachDraft, FALLBACK_NAME};
use serde::Deserialize;
use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are an elite SDR doing deep research. You output valid JSON only.";

const SALES_MAX_WORDS: usize = 90;

const FORBIDDEN_PHRASES: &[&str] = &[
    "I hope this message finds you well",
    "I hope you're doing well",
    "I came across your profile",
    "I noticed you haven't posted",
    "I see you're not very active",
    "I'd love to pick your brain",
    "synergy",
    "game-changer",
    "leverage",
    "circle back",
    "touch base",
    "reach out",
];

const GREETINGS: &[&str] = &["hi", "hello", "hey", "dear", "good morning", "good afternoon"];

/// Abbreviations whose trailing dot does not end a salutation ("Hi Dr. Jane,").
const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "mx"];

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)```[a-z0-9_-]*").unwrap());
static UNDEFINED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)undefined").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static SPACE_BEFORE_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,.!?])").unwrap());

/// Which kind of message to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    SalesBridge,
    PureNetworking,
}

impl ComposeMode {
    /// Sales bridge when the trimmed offer is longer than `min_chars`.
    pub fn for_offer(offer: &str, min_chars: usize) -> Self {
        if offer.trim().chars().count() > min_chars {
            ComposeMode::SalesBridge
        } else {
            ComposeMode::PureNetworking
        }
    }
}

/// Builds prompts and turns backend replies into drafts.
#[derive(Debug, Clone)]
pub struct Composer {
    settings: ComposerSettings,
    temperature: f32,
    max_tokens: u32,
}

impl Composer {
    pub fn new(settings: ComposerSettings, temperature: f32, max_tokens: u32) -> Self {
        Self {
            settings,
            temperature,
            max_tokens,
        }
    }

    pub fn settings(&self) -> &ComposerSettings {
        &self.settings
    }

    pub fn mode_for(&self, offer: &str) -> ComposeMode {
        ComposeMode::for_offer(offer, self.settings.offer_min_chars)
    }

    /// Generate the draft for one lead.
    pub async fn compose(
        &self,
        lead: &LeadRecord,
        offer: &str,
        custom_instructions: &str,
        backend: &dyn TextGenerationBackend,
    ) -> Result<OutreachDraft, GenerationError> {
        let custom = if custom_instructions.trim().is_empty() {
            self.settings.default_custom_instructions.as_str()
        } else {
            custom_instructions
        };
        let mode = self.mode_for(offer);
        let prompt = self.build_prompt(lead, offer, custom);
        debug!(?mode, prompt_chars = prompt.len(), "Composing outreach draft");

        let mut request = GenerationRequest::json(prompt, self.temperature, self.max_tokens);
        request.system = Some(SYSTEM_PROMPT.to_string());

        let response = backend.generate(request).await?;
        if response.text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Draft generated"
        );

        let mut draft = parse_draft(&response.text, &lead.first_name).map_err(|e| {
            warn!(error = %e, "Generated draft could not be parsed");
            e
        })?;
        if mode == ComposeMode::PureNetworking {
            draft.message = cap_words(&draft.message, self.settings.networking_word_cap);
        }
        Ok(draft)
    }

    /// Render the instruction document for `lead`.
    pub fn build_prompt(&self, lead: &LeadRecord, offer: &str, custom_instructions: &str) -> String {
        let mode = self.mode_for(offer);
        let signals = detect_signals(lead, custom_instructions);
        let first = &lead.first_name;

        let mut p = String::with_capacity(4096);
        p.push_str("You are an elite SDR doing deep research on a single lead.\n\n");

        p.push_str("LEAD DATA:\n");
        p.push_str(&self.lead_summary(lead));
        p.push('\n');

        p.push_str("SIGNAL CANDIDATES (pre-ranked, strongest first):\n");
        p.push_str(&render_signals(&signals));
        p.push('\n');

        match mode {
            ComposeMode::SalesBridge => {
                p.push_str("YOUR OFFER / CONTEXT:\n");
                p.push_str(offer.trim());
                p.push_str("\n\n");
            }
            ComposeMode::PureNetworking => {
                p.push_str("YOUR OFFER / CONTEXT:\n");
                p.push_str(
                    "None. This is a pure networking message. Do not pitch, sell or mention any product, service or company of the sender.\n\n",
                );
            }
        }

        if !custom_instructions.trim().is_empty() {
            p.push_str("ADDITIONAL INSTRUCTIONS (follow these; they may also contain external signals such as company news):\n");
            p.push_str(custom_instructions.trim());
            p.push_str("\n\n");
        }

        p.push_str("GOAL:\nWrite a short, specific, personal connection message.\n\n");

        p.push_str("STRATEGY:\n");
        p.push_str("1. Scan for specificity: exact company names, awards, specific posts, funding or growth metrics.\n");
        p.push_str("2. Select exactly ONE signal. When several exist, prefer them in this order:\n");
        p.push_str("   a. Company news (funding round, acquisition, launch, award)\n");
        p.push_str("   b. Recent post content (quote or paraphrase its main insight)\n");
        p.push_str("   c. Career history (a venture they founded, an exit, a role transition)\n");
        p.push_str("   d. Role or headline inference\n");
        p.push_str("   e. External signals given in the additional instructions\n");
        p.push_str("3. Icebreaker: one sentence that validates that signal specifically.\n");
        match mode {
            ComposeMode::SalesBridge => {
                p.push_str("4. Bridge: one transition sentence that connects the signal to the offer naturally.\n");
                p.push_str("5. Close: one short, low-pressure question or call to connect.\n\n");
                p.push_str(&format!(
                    "STRUCTURE: Greeting -> Icebreaker -> Bridge -> Close. Keep it under {SALES_MAX_WORDS} words.\n\n"
                ));
            }
            ComposeMode::PureNetworking => {
                p.push_str("4. Bridge: relate to the signal as a peer (shared interest, genuine curiosity). No pitch, no offer, no meeting request.\n");
                p.push_str("5. Close: a warm, relational line such as wanting to follow their work.\n\n");
                p.push_str(&format!(
                    "STRUCTURE: Greeting -> Icebreaker -> Bridge -> Close. At most {} words.\n\n",
                    self.settings.networking_word_cap
                ));
            }
        }

        p.push_str("NEVER:\n");
        for phrase in FORBIDDEN_PHRASES {
            p.push_str(&format!("- \"{phrase}\"\n"));
        }
        p.push_str("- Generic well-wishing or flattery with no specific fact behind it\n");
        p.push_str("- Pointing out missing or absent activity; find something else positive to validate\n");
        p.push_str("- Placeholder text such as \"undefined\", \"[Company]\" or \"{name}\"\n\n");

        p.push_str("OUTPUT:\nReturn ONLY a JSON object, no markdown, with these keys:\n");
        p.push_str("{\n");
        p.push_str("  \"strategy\": \"e.g. Past Venture / Recent Post\",\n");
        p.push_str("  \"signal_used\": \"The one signal you chose\",\n");
        p.push_str("  \"icebreaker\": \"The 1-sentence specific observation\",\n");
        p.push_str(&format!(
            "  \"message\": \"Hi {first}, [Icebreaker]. [Bridge]. [Short Close].\"\n"
        ));
        p.push_str("}\n");
        p.push_str(&format!("The message MUST start with \"Hi {first},\".\n"));
        p
    }

    /// Structured text summary of the lead, with sequences and about text capped.
    pub fn lead_summary(&self, lead: &LeadRecord) -> String {
        let cap = self.settings.max_items;
        let about = truncate_cleaned_text(&lead.about, self.settings.about_chars);
        format!(
            "Name: {}\nHeadline: {}\nAbout: {}\n\nLATEST ACTIVITY:\n{}\nCAREER HISTORY (positions):\n{}\nEDUCATION:\n{}",
            lead.full_name,
            or_none(&lead.headline),
            or_none(&about),
            render_items(&lead.posts, cap),
            render_items(&lead.experience, cap),
            render_items(&lead.education, cap),
        )
    }
}

fn or_none(s: &str) -> &str {
    if s.trim().is_empty() {
        "(none)"
    } else {
        s
    }
}

const ITEM_CHARS: usize = 600;

fn render_items(items: &[Value], cap: usize) -> String {
    if items.is_empty() {
        return "(none found)\n".to_string();
    }
    let mut out = String::new();
    for item in items.iter().take(cap) {
        let text = match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str("- ");
        out.push_str(&truncate_cleaned_text(&text, ITEM_CHARS));
        out.push('\n');
    }
    out
}

fn render_signals(signals: &[Signal]) -> String {
    if signals.is_empty() {
        return "(none detected; infer a relevant angle from the role or headline)\n".to_string();
    }
    signals
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. [{}] {}\n", i + 1, s.category.label(), s.evidence))
        .collect()
}

/// Collapse whitespace and cut at a word boundary, appending `...` when cut.
pub(crate) fn truncate_cleaned_text(text: &str, max_chars: usize) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.is_empty() || max_chars == 0 {
        return String::new();
    }

    let clean_len = clean.chars().count();
    if clean_len <= max_chars {
        return clean;
    }

    let mut cut: String = clean.chars().take(max_chars).collect();
    if let Some(pos) = cut.rfind(' ') {
        cut.truncate(pos);
    }
    if cut.is_empty() {
        cut = clean.chars().take(max_chars).collect();
    }
    format!("{cut}...")
}

#[derive(Debug, Deserialize)]
struct DraftPayload {
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default, alias = "signal")]
    signal_used: Option<String>,
    #[serde(default)]
    icebreaker: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Remove markdown code fences (```` ```json ```` / ```` ``` ````) around a payload.
pub fn strip_code_fences(raw: &str) -> String {
    FENCE_RE.replace_all(raw, "").trim().to_string()
}

/// The outermost `{...}` span, for replies with prose around the object.
fn extract_json_payload(raw: &str) -> Option<&str> {
    let text = raw.trim();
    if text.starts_with('{') && text.ends_with('}') {
        return Some(text);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Interpret backend text as a draft addressed to `first_name`.
pub fn parse_draft(raw: &str, first_name: &str) -> Result<OutreachDraft, GenerationError> {
    let malformed = |reason: String| GenerationError::Malformed {
        reason,
        raw: raw.to_string(),
    };

    let unfenced = strip_code_fences(raw);
    let payload = extract_json_payload(&unfenced)
        .ok_or_else(|| malformed("no JSON object in response".to_string()))?;
    let parsed: DraftPayload =
        serde_json::from_str(payload).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let icebreaker = parsed
        .icebreaker
        .map(|s| scrub_undefined(&s))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing 'icebreaker'".to_string()))?;
    let message = parsed
        .message
        .map(|s| scrub_undefined(&s))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| malformed("missing 'message'".to_string()))?;

    Ok(OutreachDraft {
        strategy: clean_opt(parsed.strategy),
        signal_used: clean_opt(parsed.signal_used),
        icebreaker,
        message: ensure_greeting(&message, first_name),
    })
}

/// Keep at most `max_words` words, preferring to end on a full sentence.
fn cap_words(message: &str, max_words: usize) -> String {
    let words: Vec<&str> = message.split_whitespace().collect();
    if max_words == 0 || words.len() <= max_words {
        return message.to_string();
    }
    let kept = words[..max_words].join(" ");
    match kept.rfind(['.', '!', '?']) {
        Some(end) if kept[..end].split_whitespace().count() >= max_words / 2 => {
            kept[..=end].to_string()
        }
        _ => format!("{}.", kept.trim_end_matches([',', ';', ':', '-'])),
    }
}

fn clean_opt(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Drop every `undefined` and tidy the spacing it leaves behind.
fn scrub_undefined(text: &str) -> String {
    let out = UNDEFINED_RE.replace_all(text, "");
    let out = SPACES_RE.replace_all(&out, " ");
    let out = SPACE_BEFORE_PUNCT_RE.replace_all(&out, "$1");
    out.trim().to_string()
}

/// End of the salutation: the first `,` `!` `:` or newline, or a `.` that
/// does not follow an honorific.
fn salutation_end(text: &str) -> usize {
    for (i, c) in text.char_indices() {
        match c {
            ',' | '!' | ':' | '\n' => return i,
            '.' => {
                let word = text[..i]
                    .rsplit(char::is_whitespace)
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                if !HONORIFICS.contains(&word.as_str()) {
                    return i;
                }
            }
            _ => {}
        }
    }
    text.len()
}

/// Make sure the message opens by greeting `first_name`.
fn ensure_greeting(message: &str, first_name: &str) -> String {
    let first_name = first_name.trim();
    let first_name = if first_name.is_empty() || first_name.to_lowercase().contains("undefined") {
        FALLBACK_NAME
    } else {
        first_name
    };
    let trimmed = message.trim_start();
    let head_end = salutation_end(trimmed);
    let head = &trimmed[..head_end];
    let head_lower = head.to_lowercase();

    let greeted = GREETINGS.iter().any(|g| {
        head_lower == *g
            || head_lower
                .strip_prefix(g)
                .is_some_and(|rest| rest.starts_with(char::is_whitespace))
    });

    let wanted = first_name.to_lowercase();
    let names_lead = head
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .any(|t| t == wanted);

    if greeted && names_lead {
        return trimmed.to_string();
    }
    if greeted && head.split_whitespace().count() <= 4 {
        // Greeting without the name, or with the wrong one: swap the salutation.
        let rest = trimmed[head_end..]
            .trim_start_matches([',', '!', '.', ':'])
            .trim_start();
        return format!("Hi {first_name}, {rest}").trim_end().to_string();
    }
    format!("Hi {first_name}, {trimmed}")
}
