//! Header comparison.

use super::pad_cycled;
use crate::context::MatchingContext;
use crate::mismatch::HeaderMismatch;
use crate::value::MatchValue;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static COMMA_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").expect("static regex"));

/// Headers whose values are media types with parameters.
const MEDIA_TYPE_HEADERS: [&str; 2] = ["content-type", "accept"];

/// Mismatches for one expected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderMatchResult {
    pub key: String,
    pub result: Vec<HeaderMismatch>,
}

fn value_mismatch(key: &str, expected: &str, actual: &str) -> HeaderMismatch {
    HeaderMismatch {
        key: key.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
        mismatch: format!("Expected header '{key}' to have value '{expected}' but was '{actual}'"),
    }
}

fn parse_parameters<'v>(parameters: impl Iterator<Item = &'v str>) -> IndexMap<String, String> {
    parameters
        .filter_map(|parameter| {
            let (name, value) = parameter.split_once('=')?;
            Some((
                name.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            ))
        })
        .collect()
}

/// Compare media-type header values. The type compares case-insensitively and every expected
/// parameter must be present in the actual value. Extra actual parameters are ignored.
pub fn match_content_type(key: &str, expected: &str, actual: &str) -> Option<HeaderMismatch> {
    debug!("Comparing media type header '{}': '{}' to '{}'", key, actual, expected);
    let mut expected_parts = expected.split(';').map(str::trim);
    let mut actual_parts = actual.split(';').map(str::trim);
    let expected_type = expected_parts.next().unwrap_or_default();
    let actual_type = actual_parts.next().unwrap_or_default();
    if !expected_type.eq_ignore_ascii_case(actual_type) {
        return Some(value_mismatch(key, expected, actual));
    }

    let expected_parameters = parse_parameters(expected_parts);
    let actual_parameters = parse_parameters(actual_parts);
    let all_present = expected_parameters.iter().all(|(name, value)| {
        actual_parameters
            .get(name)
            .is_some_and(|actual_value| actual_value.eq_ignore_ascii_case(value))
    });
    (!all_present).then(|| value_mismatch(key, expected, actual))
}

fn strip_whitespace_after_commas(value: &str) -> String {
    COMMA_WHITESPACE.replace_all(value, ",").into_owned()
}

/// Compare one header value.
pub fn compare_header(
    key: &str,
    expected: &str,
    actual: &str,
    context: &MatchingContext<'_>,
) -> Option<HeaderMismatch> {
    debug!("Comparing header '{}': '{}' to '{}'", key, actual, expected);
    let path = vec![key.to_string()];
    if context.matcher_defined(&path) {
        return context
            .domatch(&path, &MatchValue::Str(expected), &MatchValue::Str(actual))
            .into_iter()
            .next()
            .map(|mismatch| HeaderMismatch {
                key: key.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
                mismatch: mismatch.message,
            });
    }

    if MEDIA_TYPE_HEADERS
        .iter()
        .any(|name| key.eq_ignore_ascii_case(name))
    {
        return match_content_type(key, expected, actual);
    }

    if strip_whitespace_after_commas(expected) == strip_whitespace_after_commas(actual) {
        None
    } else {
        Some(value_mismatch(key, expected, actual))
    }
}

fn sorted_case_insensitive(headers: &IndexMap<String, Vec<String>>) -> Vec<(&String, &Vec<String>)> {
    let mut entries: Vec<_> = headers.iter().collect();
    entries.sort_by_key(|(key, _)| key.to_ascii_lowercase());
    entries
}

/// Compare every expected header against the actual headers. Header names are case-insensitive and
/// unexpected actual headers are ignored.
pub fn match_headers(
    expected: &IndexMap<String, Vec<String>>,
    actual: &IndexMap<String, Vec<String>>,
    context: &MatchingContext<'_>,
) -> Vec<HeaderMatchResult> {
    sorted_case_insensitive(expected)
        .into_iter()
        .map(|(key, expected_values)| {
            let actual_values = actual
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, values)| values);
            let result = match actual_values {
                Some(actual_values) => pad_cycled(expected_values, actual_values.len())
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, expected_value)| {
                        let actual_value = actual_values.get(index).map_or("", String::as_str);
                        compare_header(key, expected_value, actual_value, context)
                    })
                    .collect(),
                None => vec![HeaderMismatch {
                    key: key.clone(),
                    expected: expected_values.join(", "),
                    actual: String::new(),
                    mismatch: format!("Expected a header '{key}' but was missing"),
                }],
            };
            HeaderMatchResult {
                key: key.clone(),
                result,
            }
        })
        .collect()
}
