//! Matching configuration.
//!
//! Loaded from YAML:
//!
//! ```yaml
//! content_type_overrides:
//!   application/x-thing: json
//! request_allow_unexpected_keys: false
//! response_allow_unexpected_keys: true
//! coerce_numbers_in_headers_and_query: true
//! logging:
//!   level: debug
//!   format: json
//! ```

use crate::content_type::ContentType;
use crate::error::MatchError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content matcher to use for a content type that has no built-in matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentOverride {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MatchingConfig {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content_type_overrides: IndexMap<String, ContentOverride>,

    /// Unexpected keys policy for request bodies.
    #[serde(default)]
    pub request_allow_unexpected_keys: bool,

    /// Unexpected keys policy for response bodies and message contents.
    #[serde(default = "default_true")]
    pub response_allow_unexpected_keys: bool,

    #[serde(default = "default_true")]
    pub coerce_numbers_in_headers_and_query: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            content_type_overrides: IndexMap::new(),
            request_allow_unexpected_keys: false,
            response_allow_unexpected_keys: true,
            coerce_numbers_in_headers_and_query: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl MatchingConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: MatchingConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        for key in self.content_type_overrides.keys() {
            let content_type: ContentType = key.parse().map_err(|_| {
                MatchError::Config(format!("content type override '{key}' is not a valid content type"))
            })?;
            if content_type.to_string() != content_type.base_type() {
                return Err(MatchError::Config(format!(
                    "content type override '{key}' must not carry parameters"
                ))
                .into());
            }
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => anyhow::bail!(
                "Unknown logging level: '{other}'. Expected one of trace, debug, info, warn, error"
            ),
        }
    }

    /// Override registered for the base type of `content_type`.
    pub fn override_for(&self, content_type: &ContentType) -> Option<ContentOverride> {
        let base = content_type.base_type();
        self.content_type_overrides
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(&base))
            .map(|(_, value)| *value)
    }
}
