//! Message metadata comparison.

use crate::context::MatchingContext;
use crate::executor::values_equal;
use crate::mismatch::MetadataMismatch;
use crate::value::MatchValue;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Keys carrying the content type of the message. The contents comparison covers them.
const CONTENT_TYPE_KEYS: [&str; 2] = ["contenttype", "content-type"];

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compare one metadata value.
pub fn compare_metadata_value(
    key: &str,
    expected: &Value,
    actual: &Value,
    context: &MatchingContext<'_>,
) -> Option<MetadataMismatch> {
    debug!("Comparing metadata '{}': {} to {}", key, actual, expected);
    let path = vec![key.to_string()];
    if context.matcher_defined(&path) {
        return context
            .domatch(&path, &MatchValue::Json(expected), &MatchValue::Json(actual))
            .into_iter()
            .map(|mismatch| MetadataMismatch {
                key: key.to_string(),
                expected: Some(render(expected)),
                actual: Some(render(actual)),
                mismatch: mismatch.message,
            })
            .reduce(MetadataMismatch::merge);
    }

    if values_equal(&MatchValue::Json(expected), &MatchValue::Json(actual)) {
        None
    } else {
        Some(MetadataMismatch {
            key: key.to_string(),
            expected: Some(render(expected)),
            actual: Some(render(actual)),
            mismatch: format!(
                "Expected metadata key '{key}' to have value '{}' but was '{}'",
                render(expected),
                render(actual)
            ),
        })
    }
}

/// Compare expected message metadata against the actual metadata. Extra actual keys are ignored.
pub fn compare_message_metadata(
    expected: &IndexMap<String, Value>,
    actual: &IndexMap<String, Value>,
    context: &MatchingContext<'_>,
) -> Vec<MetadataMismatch> {
    expected
        .iter()
        .filter_map(|(key, expected_value)| match actual.get(key) {
            Some(actual_value) => compare_metadata_value(key, expected_value, actual_value, context),
            None if CONTENT_TYPE_KEYS.contains(&key.to_ascii_lowercase().as_str()) => None,
            None => Some(MetadataMismatch {
                key: key.clone(),
                expected: Some(render(expected_value)),
                actual: None,
                mismatch: format!("Expected metadata '{key}' but was missing"),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Category, MatchingRule, MatchingRuleCategory};
    use serde_json::json;

    fn metadata(value: Value) -> IndexMap<String, Value> {
        value
            .as_object()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_missing_content_type_is_tolerated() {
        let rules = MatchingRuleCategory::new(Category::Metadata);
        let context = MatchingContext::new(&rules, true);
        let expected = metadata(json!({"contentType": "application/json", "topic": "orders"}));
        let actual = metadata(json!({"partition": 3}));
        let result = compare_message_metadata(&expected, &actual, &context);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].mismatch, "Expected metadata 'topic' but was missing");
    }

    #[test]
    fn test_value_mismatch() {
        let rules = MatchingRuleCategory::new(Category::Metadata);
        let context = MatchingContext::new(&rules, true);
        let mismatch = compare_metadata_value("topic", &json!("orders"), &json!("payments"), &context).unwrap();
        assert_eq!(
            mismatch.mismatch,
            "Expected metadata key 'topic' to have value 'orders' but was 'payments'"
        );
        assert!(compare_metadata_value("partition", &json!(3), &json!(3), &context).is_none());
    }

    #[test]
    fn test_metadata_rule() {
        let rules = MatchingRuleCategory::new(Category::Metadata)
            .with_rule("traceId", MatchingRule::regex("[0-9a-f]{8}").unwrap());
        let context = MatchingContext::new(&rules, true);
        assert!(compare_metadata_value("traceId", &json!("00000000"), &json!("deadbeef"), &context).is_none());
        let mismatch = compare_metadata_value("traceId", &json!("00000000"), &json!("nope"), &context).unwrap();
        assert_eq!(mismatch.mismatch, "Expected 'nope' to match '[0-9a-f]{8}'");
    }
}
