//! Input errors.
//!
//! A [`MatchError`] means an input could not be understood at all: a body that is not valid JSON,
//! a path expression that does not parse, a rule definition with the wrong shape. Disagreements
//! between well-formed expected and actual values are never errors; they are reported as
//! [`Mismatch`](crate::Mismatch) values.

use thiserror::Error;

/// Errors raised while reading matching inputs.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid path expression \"{expression}\": {message}")]
    InvalidPathExpression { expression: String, message: String },

    #[error("Failed to parse {side} body as JSON: {source}")]
    InvalidJson {
        side: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse {side} body as XML: {message}")]
    InvalidXml { side: &'static str, message: String },

    #[error("Failed to parse {side} multipart body: {message}")]
    InvalidMultipart { side: &'static str, message: String },

    #[error("Invalid matching rule definition: {0}")]
    InvalidRuleDefinition(String),

    #[error("Invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid content type '{0}'")]
    InvalidContentType(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MatchError {
    pub(crate) fn path(expression: &str, message: impl Into<String>) -> Self {
        MatchError::InvalidPathExpression {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn rule(message: impl Into<String>) -> Self {
        MatchError::InvalidRuleDefinition(message.into())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
