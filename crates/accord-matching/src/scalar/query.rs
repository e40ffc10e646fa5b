//! Query parameter comparison.

use crate::content::collections::distinct_assignment;
use crate::context::MatchingContext;
use crate::executor::domatch;
use crate::mismatch::QueryMismatch;
use crate::rules::MatchingRule;
use crate::value::MatchValue;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Mismatches for one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryMatchResult {
    pub key: String,
    pub result: Vec<QueryMismatch>,
}

fn query_path(parameter: &str) -> String {
    format!("$.query.{parameter}")
}

fn mismatch(parameter: &str, expected: String, actual: String, message: String) -> QueryMismatch {
    QueryMismatch {
        parameter: parameter.to_string(),
        expected,
        actual,
        mismatch: message,
        path: query_path(parameter),
    }
}

/// Size and ordering rules constrain the list of values. Everything else applies per value.
fn applies_to_value_list(rule: &MatchingRule) -> bool {
    matches!(
        rule,
        MatchingRule::MinType(_)
            | MatchingRule::MaxType(_)
            | MatchingRule::MinMaxType(_, _)
            | MatchingRule::EqualsIgnoreOrder
            | MatchingRule::MinEqualsIgnoreOrder(_)
            | MatchingRule::MaxEqualsIgnoreOrder(_)
            | MatchingRule::MinMaxEqualsIgnoreOrder(_, _)
    )
}

fn describe(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}

fn compare_value(
    parameter: &str,
    expected: &str,
    actual: &str,
    context: &MatchingContext<'_>,
) -> Vec<QueryMismatch> {
    let path = vec![parameter.to_string()];
    if context.matcher_defined(&path) {
        debug!("Matcher defined for query parameter '{}'", parameter);
        let mut group = context.select_best_matcher(&path);
        group.rules.retain(|rule| !rule.is_ignore_order());
        if !group.is_empty() {
            return domatch(
                &group,
                &path,
                &MatchValue::Str(expected),
                &MatchValue::Str(actual),
                context.coerce_numbers,
            )
            .into_iter()
            .map(|m| mismatch(parameter, expected.to_string(), actual.to_string(), m.message))
            .collect();
        }
    }

    debug!("No matcher defined for query parameter '{}', using equality", parameter);
    if expected == actual {
        Vec::new()
    } else {
        vec![mismatch(
            parameter,
            expected.to_string(),
            actual.to_string(),
            format!("Expected '{expected}' but received '{actual}' for query parameter '{parameter}'"),
        )]
    }
}

/// Each expected value must match a distinct actual value, in any order.
fn compare_values_ignoring_order(
    parameter: &str,
    expected: &[String],
    actual: &[String],
    context: &MatchingContext<'_>,
) -> Vec<QueryMismatch> {
    let owners = distinct_assignment(expected.len(), actual.len(), |e, a| {
        compare_value(parameter, &expected[e], &actual[a], context).is_empty()
    });
    expected
        .iter()
        .enumerate()
        .filter(|(index, _)| !owners.contains(&Some(*index)))
        .map(|(_, value)| {
            mismatch(
                parameter,
                describe(expected),
                describe(actual),
                format!(
                    "Expected query parameter '{parameter}' value '{value}' to match one of {} ignoring order",
                    describe(actual)
                ),
            )
        })
        .collect()
}

fn compare_values(
    parameter: &str,
    expected: &[String],
    actual: &[String],
    context: &MatchingContext<'_>,
) -> Vec<QueryMismatch> {
    let path = vec![parameter.to_string()];
    let rule_defined = context.matcher_defined(&path);
    if rule_defined
        && context
            .select_best_matcher(&path)
            .rules
            .iter()
            .any(MatchingRule::is_ignore_order)
    {
        debug!("Ignoring order of values for query parameter '{}'", parameter);
        return compare_values_ignoring_order(parameter, expected, actual, context);
    }
    expected
        .iter()
        .enumerate()
        .flat_map(|(index, value)| match actual.get(index) {
            Some(actual_value) => compare_value(parameter, value, actual_value, context),
            None if !rule_defined => vec![mismatch(
                parameter,
                describe(expected),
                describe(actual),
                format!("Expected query parameter '{parameter}' with value '{value}' but was missing"),
            )],
            None => Vec::new(),
        })
        .collect()
}

/// Compare the values of one query parameter present on both sides.
pub fn compare_query(
    parameter: &str,
    expected: &[String],
    actual: &[String],
    context: &MatchingContext<'_>,
) -> Vec<QueryMismatch> {
    let path = vec![parameter.to_string()];
    if context.matcher_defined(&path) {
        debug!("compare_query: Matcher defined for query parameter '{}'", parameter);
        let mut group = context.select_best_matcher(&path);
        group.rules.retain(applies_to_value_list);
        let mut result: Vec<QueryMismatch> = domatch(
            &group,
            &path,
            &MatchValue::List(expected),
            &MatchValue::List(actual),
            context.coerce_numbers,
        )
        .into_iter()
        .map(|m| mismatch(parameter, describe(expected), describe(actual), m.message))
        .collect();
        result.extend(compare_values(parameter, expected, actual, context));
        return result;
    }

    if expected.is_empty() && !actual.is_empty() {
        return vec![mismatch(
            parameter,
            describe(expected),
            describe(actual),
            format!(
                "Expected an empty parameter List for '{parameter}' but received {}",
                describe(actual)
            ),
        )];
    }

    let mut result = Vec::new();
    if expected.len() != actual.len() {
        result.push(mismatch(
            parameter,
            describe(expected),
            describe(actual),
            format!(
                "Expected query parameter '{parameter}' with {} values but received {} values",
                expected.len(),
                actual.len()
            ),
        ));
    }
    result.extend(compare_values(parameter, expected, actual, context));
    result
}

/// Compare query strings. Missing and unexpected parameters are both mismatches.
pub fn match_query(
    expected: &IndexMap<String, Vec<String>>,
    actual: &IndexMap<String, Vec<String>>,
    context: &MatchingContext<'_>,
) -> Vec<QueryMatchResult> {
    let mut results: Vec<QueryMatchResult> = expected
        .iter()
        .map(|(key, expected_values)| {
            let result = match actual.get(key) {
                Some(actual_values) => compare_query(key, expected_values, actual_values, context),
                None => vec![mismatch(
                    key,
                    expected_values.join(","),
                    String::new(),
                    format!("Expected query parameter '{key}' but was missing"),
                )],
            };
            QueryMatchResult {
                key: key.clone(),
                result,
            }
        })
        .collect();

    results.extend(
        actual
            .iter()
            .filter(|(key, _)| !expected.contains_key(*key))
            .map(|(key, actual_values)| QueryMatchResult {
                key: key.clone(),
                result: vec![mismatch(
                    key,
                    String::new(),
                    actual_values.join(","),
                    format!("Unexpected query parameter '{key}' received"),
                )],
            }),
    );
    results
}

/// Parse a raw query string into parameters, keeping repeated names together.
pub fn parse_query_string(query: &str) -> IndexMap<String, Vec<String>> {
    crate::content::form::parse_form(query.trim_start_matches('?'))
}
