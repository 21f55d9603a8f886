//! Text-generation provider selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A supported text-generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(alias = "OpenAI", alias = "OPENAI")]
    OpenAi,
    #[serde(alias = "Gemini", alias = "GEMINI")]
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        }
    }

    /// Human-readable label for status lines.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(format!(
                "Unknown provider '{other}' (expected 'openai' or 'gemini')"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_case_insensitively() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" gemini ".parse::<Provider>().unwrap(), Provider::Gemini);
        assert!("claude".parse::<Provider>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        assert_eq!(
            serde_json::to_string(&Provider::OpenAi).unwrap(),
            "\"openai\""
        );
        let p: Provider = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(p, Provider::Gemini);
    }
}
