//! Plain text bodies.

use super::{ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::Result;
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch};
use crate::rules::MatchingRule;
use serde_json::Value;
use tracing::debug;

/// Matcher for `text/plain` and text types without a dedicated matcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextContentMatcher;

impl TextContentMatcher {
    fn compare_text(&self, expected: &str, actual: &str, context: &MatchingContext<'_>) -> Vec<BodyMismatch> {
        let regex = context
            .matchers
            .get("$")
            .and_then(|group| {
                group.rules.iter().find_map(|rule| match rule {
                    MatchingRule::Regex(pattern) => Some(pattern),
                    _ => None,
                })
            });

        match regex {
            Some(pattern) => {
                debug!("Comparing text body with regex '{}'", pattern.as_str());
                if pattern.is_full_match(actual) {
                    Vec::new()
                } else {
                    vec![BodyMismatch::new(
                        Some(expected.to_string()),
                        Some(actual.to_string()),
                        format!(
                            "Expected body '{}' to match '{}' using regex '{}' but did not match",
                            expected,
                            actual,
                            pattern.as_str()
                        ),
                        "$",
                    )]
                }
            }
            None if expected == actual => Vec::new(),
            None => vec![BodyMismatch::new(
                Some(expected.to_string()),
                Some(actual.to_string()),
                format!(
                    "Expected body '{}' to match '{}' using equality but did not match",
                    expected, actual
                ),
                "$",
            )],
        }
    }
}

impl ContentMatcher for TextContentMatcher {
    fn name(&self) -> &'static str {
        "text"
    }

    fn match_body(
        &self,
        expected: &OptionalBody,
        actual: &OptionalBody,
        context: &MatchingContext<'_>,
    ) -> Result<BodyMatchResult> {
        if expected.is_missing() {
            return Ok(BodyMatchResult::ok());
        }
        if expected.is_null() {
            return Ok(if actual.is_present() {
                BodyMatchResult::root_mismatch(BodyMismatch::new(
                    None,
                    Some(actual.value_as_string()),
                    format!("Expected empty body but received '{}'", actual.value_as_string()),
                    "$",
                ))
            } else {
                BodyMatchResult::ok()
            });
        }
        if actual.is_missing() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                Some(expected.value_as_string()),
                None,
                format!("Expected body '{}' but was missing", expected.value_as_string()),
                "$",
            )));
        }
        if expected.is_empty() && actual.is_empty() {
            return Ok(BodyMatchResult::ok());
        }

        let mismatches = self.compare_text(&expected.value_as_string(), &actual.value_as_string(), context);
        Ok(BodyMatchResult::from_items(vec![BodyItemMatchResult::new("$", mismatches)]))
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        InteractionContents::from_config_text(config, ContentType::text_plain())
    }
}
