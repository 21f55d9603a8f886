//! Profile normalization: raw scraper JSON in, canonical [`LeadRecord`] out.
//!
//! Never fails. Field values come from the first adapter that reports them;
//! the display name falls back from direct name fields, to split given/family
//! names, to the profile URL slug, to the literal `"there"`.

pub mod adapters;

use adapters::{default_adapters, LeadFields, ProfileAdapter};
use icebreaker_types::{LeadRecord, FALLBACK_NAME};
use serde_json::Value;
use tracing::debug;

/// Tokens a scraper emits when it stringifies missing name parts.
const PLACEHOLDER_TOKENS: &[&str] = &["undefined", "null"];
const PLACEHOLDER_EXACT: &[&str] = &["none", "None", "NONE", "nan", "NaN", "NAN"];

/// Merges adapter output into lead records.
pub struct Normalizer {
    adapters: Vec<Box<dyn ProfileAdapter>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(default_adapters())
    }
}

impl Normalizer {
    pub fn new(adapters: Vec<Box<dyn ProfileAdapter>>) -> Self {
        Self { adapters }
    }

    /// Build a lead record from an optional raw profile and its source URL.
    pub fn normalize(&self, raw: Option<&Value>, source_url: &str) -> LeadRecord {
        let extracted: Vec<(&'static str, LeadFields)> = match raw {
            Some(raw @ Value::Object(_)) => self
                .adapters
                .iter()
                .map(|a| (a.name(), a.extract(raw)))
                .collect(),
            _ => Vec::new(),
        };

        let full_name = resolve_name(&extracted, source_url);
        let first_name = first_token(&full_name);

        let record = LeadRecord {
            full_name,
            first_name,
            headline: pick(&extracted, |f| f.headline.as_ref()),
            about: pick(&extracted, |f| f.about.as_ref()),
            posts: pick(&extracted, |f| f.posts.as_ref()),
            experience: pick(&extracted, |f| f.experience.as_ref()),
            education: pick(&extracted, |f| f.education.as_ref()),
            source_url: source_url.to_string(),
        };

        debug!(
            name = %record.full_name,
            posts = record.posts.len(),
            jobs = record.experience.len(),
            schools = record.education.len(),
            "Mapped profile data"
        );
        record
    }
}

/// Normalize with the default adapter set.
pub fn normalize(raw: Option<&Value>, source_url: &str) -> LeadRecord {
    Normalizer::default().normalize(raw, source_url)
}

/// First adapter's value for a field, or the type's empty default.
fn pick<T: Clone + Default>(
    extracted: &[(&'static str, LeadFields)],
    field: impl Fn(&LeadFields) -> Option<&T>,
) -> T {
    extracted
        .iter()
        .find_map(|(_, fields)| field(fields).cloned())
        .unwrap_or_default()
}

fn resolve_name(extracted: &[(&'static str, LeadFields)], source_url: &str) -> String {
    let direct = extracted.iter().find_map(|(adapter, fields)| {
        let name = fields.full_name.as_deref().and_then(usable_name)?;
        debug!(adapter, "Name taken from direct field");
        Some(name)
    });
    if let Some(name) = direct {
        return name;
    }

    let joined = extracted.iter().find_map(|(adapter, fields)| {
        let parts = [fields.given_name.as_deref(), fields.family_name.as_deref()];
        let joined = parts.iter().flatten().copied().collect::<Vec<_>>().join(" ");
        let name = usable_name(&joined)?;
        debug!(adapter, "Name joined from given/family fields");
        Some(name)
    });
    if let Some(name) = joined {
        return name;
    }

    debug!(url = %source_url, "Name missing in data, extracting from URL");
    name_from_url(source_url).unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Clean a candidate name, or reject it as missing or degenerate.
///
/// Placeholder tokens are dropped, so `"undefined Jones"` becomes `"Jones"`.
fn usable_name(candidate: &str) -> Option<String> {
    let cleaned = candidate
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect::<String>();
    let kept = cleaned
        .split_whitespace()
        .filter(|t| !is_placeholder_token(t))
        .collect::<Vec<_>>()
        .join(" ");
    if kept.chars().count() < 2 {
        return None;
    }
    Some(kept)
}

/// Stringified missing value. `NaN`/`None` only in their machine spellings,
/// so a real name like "Nan" survives.
fn is_placeholder_token(token: &str) -> bool {
    PLACEHOLDER_TOKENS.iter().any(|p| token.eq_ignore_ascii_case(p))
        || PLACEHOLDER_EXACT.contains(&token)
}

/// True for names made only of stringified missing values, e.g. "undefined undefined".
pub fn is_placeholder_name(name: &str) -> bool {
    let mut tokens = name.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(is_placeholder_token)
}

fn first_token(full_name: &str) -> String {
    full_name
        .split(' ')
        .next()
        .filter(|t| !t.is_empty() && !is_placeholder_token(t))
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Derive a display name from a `/in/<slug>` profile URL.
///
/// A trailing opaque id (all digits, or five or more characters containing a
/// digit) is dropped, dashes become spaces and each word is capitalized:
/// `.../in/anil-kumar-b123a9f` gives `Anil Kumar`.
pub fn name_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/in/")?;
    let slug = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let slug = percent_decode(slug);

    let mut tokens: Vec<&str> = slug.split(['-', '_']).filter(|t| !t.is_empty()).collect();
    if tokens.len() > 1 && tokens.last().is_some_and(|t| looks_like_opaque_id(t)) {
        tokens.pop();
    }

    let name = tokens
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ");
    usable_name(&name)
}

fn looks_like_opaque_id(token: &str) -> bool {
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let digits = token.chars().filter(char::is_ascii_digit).count();
    digits == token.len() || (digits > 0 && token.len() >= 5)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => format!("{}{}", c.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
