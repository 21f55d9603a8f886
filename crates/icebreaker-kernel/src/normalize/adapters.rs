//! Per-schema readers for scraped profile JSON.
//!
//! Each upstream scraper names the same facts differently. An adapter knows
//! one naming scheme and reports whatever it can find; the normalizer merges
//! adapters in order.

use serde_json::Value;

/// Partial lead data read by one adapter. `None` means "not present".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFields {
    pub full_name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub headline: Option<String>,
    pub about: Option<String>,
    pub posts: Option<Vec<Value>>,
    pub experience: Option<Vec<Value>>,
    pub education: Option<Vec<Value>>,
}

/// Reads one scraper's profile schema.
pub trait ProfileAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Pull every field this schema knows about out of `raw`.
    fn extract(&self, raw: &Value) -> LeadFields;
}

/// First key holding a non-blank string, trimmed.
pub(crate) fn first_str(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        raw.get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    })
}

/// First key holding an array. An empty array still counts as present.
pub(crate) fn first_array(raw: &Value, keys: &[&str]) -> Option<Vec<Value>> {
    keys.iter()
        .find_map(|k| raw.get(*k).and_then(Value::as_array).cloned())
}

/// Text of a nested item field that may be a string or an object with a
/// `name`/`text`, e.g. `company: {"name": "Acme"}`.
pub(crate) fn item_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match item.get(*k)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Object(_) => first_str(&item[*k], &["name", "text", "title"]),
        _ => None,
    })
}

/// `fullName`/`firstName`/`headline` style, the most common scraper output.
pub struct CamelCaseAdapter;

impl ProfileAdapter for CamelCaseAdapter {
    fn name(&self) -> &'static str {
        "camel_case"
    }

    fn extract(&self, raw: &Value) -> LeadFields {
        LeadFields {
            full_name: first_str(raw, &["fullName", "name", "displayName"]),
            given_name: first_str(raw, &["firstName", "givenName"]),
            family_name: first_str(raw, &["lastName", "familyName"]),
            headline: first_str(raw, &["headline", "occupation", "jobTitle"]),
            about: first_str(raw, &["summary", "about"]),
            posts: first_array(raw, &["posts", "recentPosts", "updates"]),
            experience: first_array(raw, &["experience", "experiences"]),
            education: first_array(raw, &["education", "educations"]),
        }
    }
}

/// `full_name`/`first_name` style.
pub struct SnakeCaseAdapter;

impl ProfileAdapter for SnakeCaseAdapter {
    fn name(&self) -> &'static str {
        "snake_case"
    }

    fn extract(&self, raw: &Value) -> LeadFields {
        LeadFields {
            full_name: first_str(raw, &["full_name", "fullname"]),
            given_name: first_str(raw, &["first_name", "firstname"]),
            family_name: first_str(raw, &["last_name", "lastname"]),
            headline: first_str(raw, &["job_title", "occupation", "sub_title"]),
            about: first_str(raw, &["summary", "about", "description"]),
            posts: first_array(raw, &["recent_posts", "activity", "updates"]),
            experience: first_array(raw, &["experiences", "work_experience", "positions"]),
            education: first_array(raw, &["educations", "schools"]),
        }
    }
}

/// Output of the `rocky/linkedin-profile-scraper` actor, which puts the
/// person's name in `title` and the headline in `sub_title`.
pub struct RockyAdapter;

impl ProfileAdapter for RockyAdapter {
    fn name(&self) -> &'static str {
        "rocky"
    }

    fn extract(&self, raw: &Value) -> LeadFields {
        LeadFields {
            full_name: first_str(raw, &["title"]),
            given_name: None,
            family_name: None,
            headline: first_str(raw, &["sub_title"]),
            about: first_str(raw, &["about"]),
            posts: first_array(raw, &["activities"]),
            experience: first_array(raw, &["positions"]),
            education: first_array(raw, &["education"]),
        }
    }
}

/// The adapters tried by default, in priority order.
pub fn default_adapters() -> Vec<Box<dyn ProfileAdapter>> {
    vec![
        Box::new(CamelCaseAdapter),
        Box::new(SnakeCaseAdapter),
        Box::new(RockyAdapter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_str_skips_blank_and_non_strings() {
        let raw = json!({"fullName": "  ", "name": 42, "displayName": " Jane Doe "});
        assert_eq!(
            first_str(&raw, &["fullName", "name", "displayName"]),
            Some("Jane Doe".to_string())
        );
    }

    #[test]
    fn test_first_array_accepts_empty_array_and_skips_null() {
        let raw = json!({"posts": null, "recentPosts": [], "updates": [{"text": "x"}]});
        assert_eq!(
            first_array(&raw, &["posts", "recentPosts", "updates"]),
            Some(vec![])
        );
    }

    #[test]
    fn test_item_text_reads_nested_objects() {
        let item = json!({"company": {"name": "Acme"}, "title": "CEO"});
        assert_eq!(item_text(&item, &["company"]), Some("Acme".to_string()));
        assert_eq!(item_text(&item, &["title"]), Some("CEO".to_string()));
        assert_eq!(item_text(&item, &["missing"]), None);
    }

    #[test]
    fn test_camel_case_adapter_reads_split_names() {
        let raw = json!({"firstName": "Jane", "lastName": "Doe", "headline": "Founder"});
        let fields = CamelCaseAdapter.extract(&raw);
        assert_eq!(fields.full_name, None);
        assert_eq!(fields.given_name.as_deref(), Some("Jane"));
        assert_eq!(fields.family_name.as_deref(), Some("Doe"));
        assert_eq!(fields.headline.as_deref(), Some("Founder"));
    }

    #[test]
    fn test_rocky_adapter_reads_title_as_name() {
        let raw = json!({
            "title": "Anil Kumar",
            "sub_title": "VP Engineering",
            "activities": [{"text": "hello"}],
            "positions": [{"title": "VP", "companyName": "Acme"}]
        });
        let fields = RockyAdapter.extract(&raw);
        assert_eq!(fields.full_name.as_deref(), Some("Anil Kumar"));
        assert_eq!(fields.headline.as_deref(), Some("VP Engineering"));
        assert_eq!(fields.posts.map(|p| p.len()), Some(1));
        assert_eq!(fields.experience.map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_snake_case_adapter_reads_its_aliases() {
        let raw = json!({
            "full_name": "Priya Shah",
            "job_title": "CTO",
            "experiences": [],
            "recent_posts": [{"content": "We shipped"}]
        });
        let fields = SnakeCaseAdapter.extract(&raw);
        assert_eq!(fields.full_name.as_deref(), Some("Priya Shah"));
        assert_eq!(fields.headline.as_deref(), Some("CTO"));
        assert_eq!(fields.experience, Some(vec![]));
        assert_eq!(fields.posts.map(|p| p.len()), Some(1));
    }
}
