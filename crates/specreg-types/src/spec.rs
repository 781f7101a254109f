use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::SpecVersion;

/// Declared source language of an uploaded spec document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    Json,
    Yaml,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

impl FromStr for Language {
    type Err = TypeError;

    /// Parse case-insensitively, e.g. `"json"`, `"JSON"`, `"Yaml"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JSON" => Ok(Self::Json),
            "YAML" | "YML" => Ok(Self::Yaml),
            _ => Err(TypeError::UnknownLanguage(s.to_string())),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the spec processor derives from a single uploaded document.
///
/// Transient: exists only for the duration of one write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecInfo {
    /// Version derived from the document content.
    pub version: SpecVersion,
    /// Number of models in the document, the quota unit.
    pub model_count: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Canonicalized document body, the bytes that get stored.
    pub spec_str: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parse_is_case_insensitive() {
        assert_eq!("json".parse::<Language>().unwrap(), Language::Json);
        assert_eq!("JSON".parse::<Language>().unwrap(), Language::Json);
        assert_eq!(" Yaml ".parse::<Language>().unwrap(), Language::Yaml);
        assert_eq!("yml".parse::<Language>().unwrap(), Language::Yaml);
    }

    #[test]
    fn language_parse_rejects_unknown() {
        assert_eq!(
            "toml".parse::<Language>().unwrap_err(),
            TypeError::UnknownLanguage("toml".into())
        );
    }

    #[test]
    fn language_display() {
        assert_eq!(Language::Json.to_string(), "JSON");
        assert_eq!(Language::Yaml.to_string(), "YAML");
    }
}
