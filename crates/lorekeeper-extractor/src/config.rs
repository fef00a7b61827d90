//! Configuration for the import pipeline

use serde::{Deserialize, Serialize};

/// Configuration for document imports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Session tag stamped on every chunk an import produces
    pub session_tag: String,

    /// Minimum trimmed content length (characters) for a document to be imported
    pub min_content_chars: usize,

    /// Minimum sentence length (characters) for sentence chunks
    pub sentence_min_chars: usize,

    /// Content prefix sent by the summary-style strategies (who/what/why, keyword, Q&A)
    pub summary_prefix_chars: usize,

    /// Content prefix sent by the planning strategies
    pub planning_prefix_chars: usize,

    /// Section prefix sent when asking for a section's question
    pub section_prefix_chars: usize,
}

impl ImportConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.session_tag.trim().is_empty() {
            return Err("session_tag must not be empty".to_string());
        }
        if self.min_content_chars == 0 {
            return Err("min_content_chars must be greater than 0".to_string());
        }
        if self.summary_prefix_chars == 0
            || self.planning_prefix_chars == 0
            || self.section_prefix_chars == 0
        {
            return Err("prefix bounds must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            session_tag: "document_import".to_string(),
            min_content_chars: 10,
            sentence_min_chars: 10,
            summary_prefix_chars: 2000,
            planning_prefix_chars: 3000,
            section_prefix_chars: 500,
        }
    }
}

impl ImportConfig {
    /// Compact preset: smaller prompts for small local models
    pub fn compact() -> Self {
        Self {
            summary_prefix_chars: 1000,
            planning_prefix_chars: 1500,
            section_prefix_chars: 250,
            ..Self::default()
        }
    }

    /// Generous preset: larger prompts for models with long context windows
    pub fn generous() -> Self {
        Self {
            summary_prefix_chars: 8000,
            planning_prefix_chars: 12_000,
            section_prefix_chars: 2000,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ImportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_tag, "document_import");
        assert_eq!(config.min_content_chars, 10);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ImportConfig::compact().validate().is_ok());
        assert!(ImportConfig::generous().validate().is_ok());
    }

    #[test]
    fn test_invalid_session_tag() {
        let config = ImportConfig {
            session_tag: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_prefix() {
        let config = ImportConfig {
            section_prefix_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ImportConfig::compact();
        let toml_str = config.to_toml().unwrap();
        let parsed = ImportConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ImportConfig::from_toml("session_tag = \"lore\"\n").unwrap();
        assert_eq!(parsed.session_tag, "lore");
        assert_eq!(parsed.summary_prefix_chars, 2000);
    }
}
