//! Content matchers: body comparison per wire format.
//!
//! A body is routed to a matcher by its content type through a static registry of
//! content-type patterns. Each matcher walks its format's structure and consults the
//! [`MatchingContext`] at every node.
//!
//! # Module Structure
//!
//! - `collections` - List comparison shared by the structured matchers (padded, unordered, contains)
//! - `json` - JSON documents
//! - `xml` - XML documents
//! - `form` - `application/x-www-form-urlencoded` bodies
//! - `multipart` - `multipart/form-data` and `multipart/mixed` bodies
//! - `text` - Plain text
//! - `framed` - Schema-registry framed JSON

pub(crate) mod collections;
pub mod form;
pub mod framed;
pub mod json;
pub mod multipart;
pub mod text;
pub mod xml;

use crate::body::OptionalBody;
use crate::config::{ContentOverride, MatchingConfig};
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::Result;
use crate::executor::domatch;
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch, BodyTypeMismatch};
use crate::rules::{Category, MatchingRuleCategory};
use crate::value::MatchValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

pub use form::FormContentMatcher;
pub use framed::FramedJsonContentMatcher;
pub use json::JsonContentMatcher;
pub use multipart::MultipartContentMatcher;
pub use text::TextContentMatcher;
pub use xml::XmlContentMatcher;

/// Body and optional body rules built from a matcher-specific configuration object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InteractionContents {
    pub body: OptionalBody,
    pub rules: Option<MatchingRuleCategory>,
}

impl InteractionContents {
    /// Read `{"body": ..., "matchingRules": {...}}`.
    ///
    /// A string body is taken verbatim. Any other JSON value is serialized.
    pub fn from_config_text(config: &Value, content_type: ContentType) -> Result<Self> {
        let body = match config.get("body") {
            None => OptionalBody::missing(),
            Some(Value::Null) => OptionalBody::null(),
            Some(Value::String(text)) => OptionalBody::present(text.clone(), Some(content_type)),
            Some(other) => OptionalBody::present(other.to_string(), Some(content_type)),
        };
        let rules = config
            .get("matchingRules")
            .map(|rules| MatchingRuleCategory::from_json(Category::Body, rules))
            .transpose()?;
        Ok(InteractionContents { body, rules })
    }
}

/// Compares two bodies of one wire format.
pub trait ContentMatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn match_body(
        &self,
        expected: &OptionalBody,
        actual: &OptionalBody,
        context: &MatchingContext<'_>,
    ) -> Result<BodyMatchResult>;

    /// Build the expected contents from a matcher-specific configuration object.
    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents>;
}

static JSON: JsonContentMatcher = JsonContentMatcher;
static XML: XmlContentMatcher = XmlContentMatcher;
static TEXT: TextContentMatcher = TextContentMatcher;
static FORM: FormContentMatcher = FormContentMatcher;
static MULTIPART: MultipartContentMatcher = MultipartContentMatcher;
static FRAMED: FramedJsonContentMatcher = FramedJsonContentMatcher;

/// Content-type patterns, tried in order against the full base type.
static REGISTRY: Lazy<Vec<(Regex, &'static dyn ContentMatcher)>> = Lazy::new(|| {
    let entries: [(&str, &'static dyn ContentMatcher); 8] = [
        (r"application/vnd\.schemaregistry\.v1\+json", &FRAMED),
        (r"application/.*xml", &XML),
        (r"text/xml", &XML),
        (r".*json.*", &JSON),
        (r"text/plain", &TEXT),
        (r"multipart/form-data", &MULTIPART),
        (r"multipart/mixed", &MULTIPART),
        (r"application/x-www-form-urlencoded", &FORM),
    ];
    entries
        .into_iter()
        .map(|(pattern, matcher)| {
            let regex = Regex::new(&format!("^(?:{pattern})$")).expect("static regex");
            (regex, matcher)
        })
        .collect()
});

/// The built-in matcher registered for exactly this base type.
pub fn lookup_content_matcher(content_type: &ContentType) -> Option<&'static dyn ContentMatcher> {
    let base = content_type.base_type();
    REGISTRY
        .iter()
        .find(|(pattern, _)| pattern.is_match(&base))
        .map(|(_, matcher)| *matcher)
}

/// Resolve a matcher for `content_type`: the type itself, then its supertype, then any override in
/// `config`.
pub fn content_matcher_for(
    content_type: &ContentType,
    config: &MatchingConfig,
) -> Option<&'static dyn ContentMatcher> {
    lookup_content_matcher(content_type)
        .or_else(|| {
            content_type
                .supertype()
                .and_then(|supertype| lookup_content_matcher(&supertype))
        })
        .or_else(|| match config.override_for(content_type)? {
            ContentOverride::Json => Some(&JSON as &'static dyn ContentMatcher),
            ContentOverride::Text => Some(&TEXT as &'static dyn ContentMatcher),
        })
}

/// Compare two bodies, dispatching on the expected body's content type.
///
/// A rule registered at `$` that can apply to the whole body wins over structural comparison.
/// Bodies of different base types are not compared structurally.
pub fn match_body(
    expected: &OptionalBody,
    actual: &OptionalBody,
    context: &MatchingContext<'_>,
) -> Result<BodyMatchResult> {
    let expected_type = expected.determine_content_type();
    let actual_type = actual.determine_content_type();
    let root = vec!["$".to_string()];

    if let Some(group) = context.matchers.get("$") {
        if group.can_match(&expected_type) {
            debug!("Applying root rule group to the whole {} body", expected_type);
            let mismatches = domatch(
                group,
                &root,
                &MatchValue::Bytes(expected.value()),
                &MatchValue::Bytes(actual.value()),
                context.coerce_numbers,
            );
            return Ok(BodyMatchResult::from_items(vec![BodyItemMatchResult::new(
                "$",
                mismatches.into_iter().map(BodyMismatch::from).collect(),
            )]));
        }
    }

    if expected_type.base_type() != actual_type.base_type() {
        if expected.is_missing() || expected.is_null() || expected.is_empty() {
            return Ok(BodyMatchResult::ok());
        }
        debug!(
            "Body type mismatch: expected {} but received {}",
            expected_type, actual_type
        );
        return Ok(BodyMatchResult::type_mismatch(BodyTypeMismatch {
            expected: expected_type.base_type(),
            actual: actual_type.base_type(),
        }));
    }

    match content_matcher_for(&expected_type, &context.config) {
        Some(matcher) => {
            debug!("Found a matcher for {} -> {}", expected_type, matcher.name());
            matcher.match_body(expected, actual, context)
        }
        None => {
            debug!("No content matcher for {}, comparing raw bytes", expected_type);
            Ok(compare_bytes(expected, actual))
        }
    }
}

fn compare_bytes(expected: &OptionalBody, actual: &OptionalBody) -> BodyMatchResult {
    if expected.is_missing() {
        return BodyMatchResult::ok();
    }
    if expected.is_null() {
        return if actual.is_present() {
            BodyMatchResult::root_mismatch(BodyMismatch::new(
                None,
                Some(actual.value_as_string()),
                format!("Expected an empty body but received '{}'", actual.value_as_string()),
                "$",
            ))
        } else {
            BodyMatchResult::ok()
        };
    }
    if actual.is_missing() {
        return BodyMatchResult::root_mismatch(BodyMismatch::new(
            Some(expected.value_as_string()),
            None,
            format!("Expected body '{}' but was missing", expected.value_as_string()),
            "$",
        ));
    }
    if expected.value() == actual.value() {
        BodyMatchResult::ok()
    } else {
        BodyMatchResult::root_mismatch(BodyMismatch::new(
            Some(expected.value_as_string()),
            Some(actual.value_as_string()),
            format!(
                "Actual body [{}] is not equal to the expected body [{}]",
                actual.preview(),
                expected.preview()
            ),
            "$",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchingRule;
    use serde_json::json;

    fn ct(value: &str) -> ContentType {
        value.parse().unwrap()
    }

    #[test]
    fn test_registry_lookup() {
        assert_eq!(lookup_content_matcher(&ct("application/json")).unwrap().name(), "json");
        assert_eq!(lookup_content_matcher(&ct("application/hal+json")).unwrap().name(), "json");
        assert_eq!(lookup_content_matcher(&ct("text/xml")).unwrap().name(), "xml");
        assert_eq!(lookup_content_matcher(&ct("application/atom+xml")).unwrap().name(), "xml");
        assert_eq!(
            lookup_content_matcher(&ct("application/vnd.schemaregistry.v1+json")).unwrap().name(),
            "framed-json"
        );
        assert_eq!(lookup_content_matcher(&ct("multipart/mixed")).unwrap().name(), "multipart");
        assert_eq!(
            lookup_content_matcher(&ct("application/x-www-form-urlencoded")).unwrap().name(),
            "form"
        );
        assert!(lookup_content_matcher(&ct("image/png")).is_none());
    }

    #[test]
    fn test_supertype_and_override_fallback() {
        let config = MatchingConfig::default();
        assert_eq!(content_matcher_for(&ct("text/html"), &config).unwrap().name(), "text");
        assert!(content_matcher_for(&ct("application/x-thing"), &config).is_none());

        let mut config = MatchingConfig::default();
        config
            .content_type_overrides
            .insert("application/x-thing".into(), ContentOverride::Json);
        assert_eq!(content_matcher_for(&ct("application/x-thing"), &config).unwrap().name(), "json");
    }

    #[test]
    fn test_different_base_types_are_a_type_mismatch() {
        let rules = MatchingRuleCategory::new(Category::Body);
        let context = MatchingContext::new(&rules, false);
        let expected = OptionalBody::json(&json!({"a": 1}));
        let actual = OptionalBody::text("a=1");
        let result = match_body(&expected, &actual, &context).unwrap();
        assert_eq!(
            result.type_mismatch,
            Some(BodyTypeMismatch {
                expected: "application/json".into(),
                actual: "text/plain".into(),
            })
        );

        let result = match_body(&OptionalBody::empty(), &actual, &context).unwrap();
        assert!(result.matched_ok());
    }

    #[test]
    fn test_unknown_types_compare_bytes() {
        let rules = MatchingRuleCategory::new(Category::Body);
        let context = MatchingContext::new(&rules, false);
        let png = ct("image/png");
        let expected = OptionalBody::present(vec![1u8, 2, 3], Some(png.clone()));
        let actual = OptionalBody::present(vec![1u8, 2, 4], Some(png.clone()));
        let result = match_body(&expected, &actual, &context).unwrap();
        let mismatch = result.body_mismatches().next().unwrap();
        assert_eq!(
            mismatch.mismatch,
            "Actual body [image/png, 3 bytes, starting with 010204] is not equal to the expected body [image/png, 3 bytes, starting with 010203]"
        );

        let same = OptionalBody::present(vec![1u8, 2, 3], Some(png));
        assert!(match_body(&expected, &same, &context).unwrap().matched_ok());
    }

    #[test]
    fn test_root_content_type_rule_applies_to_whole_body() {
        let rules = MatchingRuleCategory::new(Category::Body)
            .with_rule("$", MatchingRule::ContentType("image/png".into()));
        let context = MatchingContext::new(&rules, false);
        let png = ct("image/png");
        let png_bytes = vec![0x89u8, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];
        let expected = OptionalBody::present(png_bytes.clone(), Some(png.clone()));
        let actual = OptionalBody::present(png_bytes, Some(png));
        assert!(match_body(&expected, &actual, &context).unwrap().matched_ok());
    }

    #[test]
    fn test_setup_from_config() {
        let contents = InteractionContents::from_config_text(
            &json!({"body": {"a": 1}, "matchingRules": {"$.a": {"matchers": [{"match": "type"}]}}}),
            ContentType::json(),
        )
        .unwrap();
        assert_eq!(contents.body.value_as_string(), "{\"a\":1}");
        assert!(contents.rules.unwrap().get("$.a").is_some());

        let contents = InteractionContents::from_config_text(&json!({}), ContentType::json()).unwrap();
        assert!(contents.body.is_missing());
    }
}
