//! JSON body comparison.

use super::collections::{compare_list_content, compare_lists_with_rules, ElementComparator, Lists};
use super::{ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::diff::generate_json_diff;
use crate::error::{MatchError, Result};
use crate::executor::{domatch_rule, values_equal};
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch};
use crate::path_expr::construct_path;
use crate::rules::MatchingRule;
use crate::value::MatchValue;
use serde_json::{Map, Value};
use tracing::debug;

/// Matcher for `application/json` and every `*json*` content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentMatcher;

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "Map",
        Value::Array(_) => "List",
        Value::Null => "Null",
        Value::String(_) => "String",
        Value::Number(_) => "Number",
        Value::Bool(_) => "Boolean",
    }
}

fn value_of(value: &Value) -> String {
    MatchValue::Json(value).describe()
}

fn child_path(path: &[String], segment: impl Into<String>) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(segment.into());
    child
}

impl JsonContentMatcher {
    /// Compare two JSON nodes found at `path`.
    pub fn compare(
        &self,
        path: &[String],
        expected: &Value,
        actual: &Value,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        match (expected, actual) {
            (Value::Object(e), Value::Object(a)) => self.compare_maps(path, expected, actual, e, a, context),
            (Value::Array(e), Value::Array(a)) => self.compare_lists(path, expected, actual, e, a, context),
            (Value::Object(_), _) | (Value::Array(_), _) => {
                let location = construct_path(path);
                vec![BodyItemMatchResult::single(
                    &location,
                    BodyMismatch::new(
                        Some(expected.to_string()),
                        Some(actual.to_string()),
                        format!(
                            "Type mismatch: Expected {} {} but received {} {}",
                            type_of(expected),
                            value_of(expected),
                            type_of(actual),
                            value_of(actual)
                        ),
                        &location,
                    )
                    .with_diff(generate_json_diff(expected, actual)),
                )]
            }
            _ => self.compare_values(path, expected, actual, context),
        }
    }

    fn compare_values(
        &self,
        path: &[String],
        expected: &Value,
        actual: &Value,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let location = construct_path(path);
        if context.matcher_defined(path) {
            debug!("compare_values: Matcher defined for path {}", location);
            let mismatches = context.domatch(path, &MatchValue::Json(expected), &MatchValue::Json(actual));
            return vec![BodyItemMatchResult::new(
                location,
                mismatches.into_iter().map(BodyMismatch::from).collect(),
            )];
        }

        debug!("compare_values: No matcher defined for path {}, using equality", location);
        if values_equal(&MatchValue::Json(expected), &MatchValue::Json(actual)) {
            vec![BodyItemMatchResult::new(location, Vec::new())]
        } else {
            vec![BodyItemMatchResult::single(
                &location,
                BodyMismatch::new(
                    Some(expected.to_string()),
                    Some(actual.to_string()),
                    format!(
                        "Expected {} ({}) but received {} ({})",
                        value_of(expected),
                        type_of(expected),
                        value_of(actual),
                        type_of(actual)
                    ),
                    &location,
                ),
            )]
        }
    }

    fn compare_lists(
        &self,
        path: &[String],
        expected_value: &Value,
        actual_value: &Value,
        expected: &[Value],
        actual: &[Value],
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let diff = || generate_json_diff(expected_value, actual_value);
        let lists = Lists {
            path,
            expected,
            actual,
            expected_value: MatchValue::Json(expected_value),
            actual_value: MatchValue::Json(actual_value),
        };
        let location = construct_path(path);

        if context.matcher_defined(path) {
            debug!("compare_lists: Matcher defined for path {}", location);
            let group = context.select_best_matcher(path);
            return compare_lists_with_rules(&lists, &group, context, self, &diff);
        }

        if expected.is_empty() && !actual.is_empty() {
            if context.allow_unexpected_keys {
                debug!("compare_lists: Unexpected elements allowed at {}", location);
                return Vec::new();
            }
            return vec![BodyItemMatchResult::single(
                &location,
                BodyMismatch::new(
                    Some(expected_value.to_string()),
                    Some(actual_value.to_string()),
                    format!("Expected an empty List but received {}", value_of(actual_value)),
                    &location,
                )
                .with_diff(diff()),
            )];
        }

        let template: Vec<&Value> = expected.iter().collect();
        let mut result = compare_list_content(&lists, &template, context, self, &diff);
        if expected.len() != actual.len() {
            result.push(BodyItemMatchResult::single(
                &location,
                BodyMismatch::new(
                    Some(expected_value.to_string()),
                    Some(actual_value.to_string()),
                    format!(
                        "Expected a List with {} elements but received {} elements",
                        expected.len(),
                        actual.len()
                    ),
                    &location,
                )
                .with_diff(diff()),
            ));
        }
        result
    }

    fn compare_maps(
        &self,
        path: &[String],
        expected_value: &Value,
        actual_value: &Value,
        expected: &Map<String, Value>,
        actual: &Map<String, Value>,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let location = construct_path(path);
        let diff = || generate_json_diff(expected_value, actual_value);

        if expected.is_empty() && !actual.is_empty() && !context.allow_unexpected_keys {
            return vec![BodyItemMatchResult::single(
                &location,
                BodyMismatch::new(
                    Some(expected_value.to_string()),
                    Some(actual_value.to_string()),
                    format!("Expected an empty Map but received {}", value_of(actual_value)),
                    &location,
                )
                .with_diff(diff()),
            )];
        }

        let group = if context.matcher_defined(path) {
            debug!("compare_maps: Matcher defined for path {}", location);
            context.select_best_matcher(path)
        } else {
            Default::default()
        };

        let mut result = Vec::new();
        let values_rule = group
            .rules
            .iter()
            .any(|rule| matches!(rule, MatchingRule::Values | MatchingRule::EachValue(_)));
        if values_rule {
            let template = expected.values().next().unwrap_or(&Value::Null);
            for (key, actual_item) in actual {
                let item_path = child_path(path, key);
                let expected_item = expected.get(key).unwrap_or(template);
                for rule in &group.rules {
                    if let MatchingRule::EachValue(definition) = rule {
                        let mismatches: Vec<BodyMismatch> = definition
                            .rules
                            .iter()
                            .flat_map(|sub_rule| {
                                domatch_rule(
                                    sub_rule,
                                    &item_path,
                                    &MatchValue::Json(expected_item),
                                    &MatchValue::Json(actual_item),
                                    false,
                                    context.coerce_numbers,
                                )
                            })
                            .map(BodyMismatch::from)
                            .collect();
                        result.push(BodyItemMatchResult::new(construct_path(&item_path), mismatches));
                    }
                }
                result.extend(self.compare(&item_path, expected_item, actual_item, context));
            }
            return result;
        }

        let expected_keys: Vec<&str> = expected.keys().map(String::as_str).collect();
        let actual_keys: Vec<&str> = actual.keys().map(String::as_str).collect();
        result.extend(context.match_keys(
            path,
            &MatchValue::Json(expected_value),
            &MatchValue::Json(actual_value),
            &expected_keys,
            &actual_keys,
            diff,
        ));

        let keys_only = !group.rules.is_empty()
            && group
                .rules
                .iter()
                .all(|rule| matches!(rule, MatchingRule::EachKey(_)));
        if !keys_only {
            for (key, expected_item) in expected {
                if let Some(actual_item) = actual.get(key) {
                    result.extend(self.compare(&child_path(path, key), expected_item, actual_item, context));
                }
            }
        }
        result
    }
}

impl ElementComparator<Value> for JsonContentMatcher {
    fn compare_element(
        &self,
        path: &[String],
        expected: &Value,
        actual: &Value,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        self.compare(path, expected, actual, context)
    }

    fn describe_element(&self, element: &Value) -> String {
        value_of(element)
    }
}

fn parse(body: &OptionalBody, side: &'static str) -> Result<Value> {
    serde_json::from_slice(body.value()).map_err(|source| MatchError::InvalidJson { side, source })
}

impl ContentMatcher for JsonContentMatcher {
    fn name(&self) -> &'static str {
        "json"
    }

    fn match_body(
        &self,
        expected: &OptionalBody,
        actual: &OptionalBody,
        context: &MatchingContext<'_>,
    ) -> Result<BodyMatchResult> {
        if expected.is_missing() || (expected.is_empty() && actual.is_empty()) {
            return Ok(BodyMatchResult::ok());
        }
        if expected.is_null() {
            return Ok(if actual.is_present() {
                BodyMatchResult::root_mismatch(BodyMismatch::new(
                    None,
                    Some(actual.value_as_string()),
                    format!("Expected null body but received '{}'", actual.value_as_string()),
                    "$",
                ))
            } else {
                BodyMatchResult::ok()
            });
        }
        if actual.is_missing() || actual.is_null() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                expected.is_present().then(|| expected.value_as_string()),
                None,
                format!("Expected body '{}' but was missing", expected.value_as_string()),
                "$",
            )));
        }
        if actual.is_empty() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                Some(expected.value_as_string()),
                None,
                format!("Expected body '{}' but received an empty body", expected.value_as_string()),
                "$",
            )));
        }
        if expected.is_empty() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                None,
                Some(actual.value_as_string()),
                format!("Expected an empty body but received '{}'", actual.value_as_string()),
                "$",
            )));
        }

        let expected_json = parse(expected, "expected")?;
        let actual_json = parse(actual, "actual")?;
        let root = vec!["$".to_string()];
        Ok(BodyMatchResult::from_items(self.compare(
            &root,
            &expected_json,
            &actual_json,
            context,
        )))
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        InteractionContents::from_config_text(config, ContentType::json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ArrayContainsVariant, Category, MatchingRuleCategory, RuleDefinition};
    use serde_json::json;

    fn rules() -> MatchingRuleCategory {
        MatchingRuleCategory::new(Category::Body)
    }

    fn mismatches(
        expected: Value,
        actual: Value,
        rules: &MatchingRuleCategory,
        allow_unexpected_keys: bool,
    ) -> Vec<BodyMismatch> {
        let context = MatchingContext::new(rules, allow_unexpected_keys);
        JsonContentMatcher
            .match_body(&OptionalBody::json(&expected), &OptionalBody::json(&actual), &context)
            .unwrap()
            .body_mismatches()
            .cloned()
            .collect()
    }

    fn messages(found: &[BodyMismatch]) -> Vec<&str> {
        found.iter().map(|m| m.mismatch.as_str()).collect()
    }

    #[test]
    fn test_equal_documents_match() {
        let doc = json!({"a": [1, 2, {"b": "c"}], "d": null, "e": 1.5});
        assert!(mismatches(doc.clone(), doc, &rules(), false).is_empty());
    }

    #[test]
    fn test_unexpected_keys_policy() {
        let found = mismatches(json!({"a": 1}), json!({"a": 1, "b": 2}), &rules(), true);
        assert!(found.is_empty());

        let found = mismatches(json!({"a": 1}), json!({"a": 1, "b": 2}), &rules(), false);
        assert_eq!(
            messages(&found),
            vec!["Expected a Map with keys [a] but received one with keys [a, b]"]
        );
    }

    #[test]
    fn test_missing_key_with_unexpected_keys_allowed() {
        let found = mismatches(json!({"a": 1, "b": 2}), json!({"a": 1, "c": 3}), &rules(), true);
        assert_eq!(messages(&found), vec!["Actual map is missing the following keys: b"]);
        assert_eq!(found[0].path, "$");
    }

    #[test]
    fn test_scalar_mismatch_message() {
        let found = mismatches(json!({"a": "x"}), json!({"a": 2}), &rules(), false);
        assert_eq!(messages(&found), vec!["Expected 'x' (String) but received 2 (Number)"]);
        assert_eq!(found[0].path, "$.a");
    }

    #[test]
    fn test_type_mismatch_between_map_and_scalar() {
        let found = mismatches(json!({"a": {"b": 1}}), json!({"a": "b"}), &rules(), false);
        assert_eq!(
            messages(&found),
            vec!["Type mismatch: Expected Map {\"b\":1} but received String 'b'"]
        );
        assert!(found[0].diff.is_some());
    }

    #[test]
    fn test_list_without_rules_is_positional() {
        let found = mismatches(json!([1, 2, 3]), json!([1, 2]), &rules(), false);
        assert_eq!(
            messages(&found),
            vec![
                "Expected 3 but was missing",
                "Expected a List with 3 elements but received 2 elements"
            ]
        );

        let found = mismatches(json!([]), json!([1]), &rules(), false);
        assert_eq!(messages(&found), vec!["Expected an empty List but received [1]"]);
    }

    #[test]
    fn test_empty_list_accepts_elements_when_unexpected_allowed() {
        let found = mismatches(json!({"a": []}), json!({"a": [1]}), &rules(), true);
        assert!(found.is_empty(), "{found:?}");

        let found = mismatches(json!({"a": []}), json!({"a": [1]}), &rules(), false);
        assert_eq!(messages(&found), vec!["Expected an empty List but received [1]"]);
        assert_eq!(found[0].path, "$.a");
    }

    #[test]
    fn test_min_type_pads_with_first_element() {
        let rules = rules().with_rule("$.items", MatchingRule::MinType(1));
        let found = mismatches(
            json!({"items": [{"id": 1}]}),
            json!({"items": [{"id": 5}, {"id": 6}, {"id": 7}]}),
            &rules,
            false,
        );
        assert!(found.is_empty(), "{found:?}");

        let found = mismatches(
            json!({"items": [{"id": 1}]}),
            json!({"items": [{"id": 5}, {"id": "x"}]}),
            &rules,
            false,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "$.items[1].id");
    }

    #[test]
    fn test_min_type_size_failure() {
        let rules = rules().with_rule("$", MatchingRule::MinType(2));
        let found = mismatches(json!([1, 2]), json!([1]), &rules, false);
        assert_eq!(found.len(), 1);
        assert!(found[0].mismatch.contains("minimum size of 2"), "{}", found[0].mismatch);
    }

    #[test]
    fn test_ignore_order() {
        let rules = rules().with_rule("$", MatchingRule::EqualsIgnoreOrder);
        assert!(mismatches(json!([1, 2, 3]), json!([3, 1, 2]), &rules, false).is_empty());

        let found = mismatches(json!([1, 2, 3]), json!([3, 1, 4]), &rules, false);
        assert!(!found.is_empty());
        assert_eq!(
            found[0].mismatch,
            "Expected [1,2,3] to match [3,1,4] ignoring order of elements"
        );
    }

    #[test]
    fn test_ignore_order_needs_distinct_elements() {
        let rules = rules().with_rule("$", MatchingRule::EqualsIgnoreOrder);
        let found = mismatches(json!([1, 1]), json!([1, 2]), &rules, false);
        assert!(!found.is_empty());
    }

    #[test]
    fn test_ignore_order_with_many_interchangeable_elements() {
        let rules = rules().with_rule("$", MatchingRule::EqualsIgnoreOrder);
        let expected: Vec<Value> = (0..40).map(|_| json!("x")).chain([json!("y")]).collect();
        let mut actual: Vec<Value> = (0..40).map(|_| json!("x")).chain([json!("z")]).collect();
        let found = mismatches(Value::Array(expected.clone()), Value::Array(actual.clone()), &rules, false);
        assert!(!found.is_empty());
        assert!(found[0].mismatch.ends_with("ignoring order of elements"));

        actual.rotate_left(7);
        actual[33] = json!("y");
        assert!(mismatches(Value::Array(expected), Value::Array(actual), &rules, false).is_empty());
    }

    #[test]
    fn test_ignore_order_extra_element_needs_its_own_rule() {
        let rules = rules()
            .with_rule("$", MatchingRule::MinEqualsIgnoreOrder(2))
            .with_rule("$[2]", MatchingRule::Number(crate::rules::NumberKind::Integer));
        assert!(mismatches(json!([1, 2]), json!([2, 1, 7]), &rules, false).is_empty());
        assert!(!mismatches(json!([1, 2]), json!([2, 1, "x"]), &rules, false).is_empty());
    }

    #[test]
    fn test_array_contains() {
        let rules = rules().with_rule(
            "$",
            MatchingRule::ArrayContains(vec![ArrayContainsVariant {
                index: 0,
                rules: MatchingRuleCategory::new(Category::Body).with_rule("$.id", MatchingRule::Type),
            }]),
        );
        let found = mismatches(
            json!([{"id": 1}]),
            json!([{"name": "x", "id": 2}, {"id": 3}]),
            &rules,
            true,
        );
        assert!(found.is_empty(), "{found:?}");

        let found = mismatches(json!([{"id": 1}]), json!([{"id": "a"}]), &rules, false);
        assert_eq!(
            messages(&found),
            vec!["Variant at index 0 ({\"id\":1}) was not found in the actual list"]
        );
    }

    #[test]
    fn test_values_rule_compares_every_actual_key() {
        let rules = rules()
            .with_rule("$", MatchingRule::Values)
            .with_rule("$.*", MatchingRule::Type);
        let found = mismatches(json!({"a": 1}), json!({"x": 10, "y": 20}), &rules, false);
        assert!(found.is_empty(), "{found:?}");

        let found = mismatches(json!({"a": 1}), json!({"x": 10, "y": "z"}), &rules, false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "$.y");
    }

    #[test]
    fn test_each_key_rule() {
        let rules = rules().with_rule(
            "$",
            MatchingRule::EachKey(RuleDefinition {
                value: "a".into(),
                rules: vec![MatchingRule::regex("[a-z]+").unwrap()],
            }),
        );
        let found = mismatches(json!({"a": 1}), json!({"b": 1, "C1": 2}), &rules, false);
        assert_eq!(messages(&found), vec!["Expected 'C1' to match '[a-z]+'"]);
    }

    #[test]
    fn test_each_value_rule() {
        let rules = rules().with_rule(
            "$",
            MatchingRule::EachValue(RuleDefinition {
                value: "1".into(),
                rules: vec![MatchingRule::Type],
            }),
        );
        assert!(mismatches(json!({"a": 1}), json!({"b": 2, "c": 3}), &rules, false).is_empty());
        let found = mismatches(json!({"a": 1}), json!({"b": 2, "c": "3"}), &rules, false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "$.c");
    }

    #[test]
    fn test_body_presence_short_circuits() {
        let context_rules = rules();
        let context = MatchingContext::new(&context_rules, false);
        let present = OptionalBody::json(&json!({"a": 1}));
        let matcher = JsonContentMatcher;

        assert!(matcher
            .match_body(&OptionalBody::missing(), &present, &context)
            .unwrap()
            .matched_ok());
        assert!(matcher
            .match_body(&OptionalBody::empty(), &OptionalBody::empty(), &context)
            .unwrap()
            .matched_ok());
        assert!(matcher
            .match_body(&OptionalBody::null(), &OptionalBody::missing(), &context)
            .unwrap()
            .matched_ok());

        let result = matcher.match_body(&OptionalBody::null(), &present, &context).unwrap();
        assert_eq!(
            result.body_mismatches().next().unwrap().mismatch,
            "Expected null body but received '{\"a\":1}'"
        );
        let result = matcher.match_body(&present, &OptionalBody::missing(), &context).unwrap();
        assert_eq!(
            result.body_mismatches().next().unwrap().mismatch,
            "Expected body '{\"a\":1}' but was missing"
        );
    }

    #[test]
    fn test_invalid_json_is_an_input_error() {
        let context_rules = rules();
        let context = MatchingContext::new(&context_rules, false);
        let bad = OptionalBody::present("{nope", Some(ContentType::json()));
        let good = OptionalBody::json(&json!({}));
        let err = JsonContentMatcher.match_body(&good, &bad, &context).unwrap_err();
        assert!(matches!(err, MatchError::InvalidJson { side: "actual", .. }));
    }
}
