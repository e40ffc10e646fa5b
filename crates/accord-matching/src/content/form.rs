//! `application/x-www-form-urlencoded` bodies.

use super::{ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::Result;
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch};
use crate::path_expr::construct_path;
use crate::value::MatchValue;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Matcher for URL-encoded form posts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormContentMatcher;

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

/// Decode a form body into its parameters, keeping repeated names together in first-seen order.
pub fn parse_form(body: &str) -> IndexMap<String, Vec<String>> {
    let mut parameters: IndexMap<String, Vec<String>> = IndexMap::new();
    for pair in body.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters.entry(decode(name)).or_default().push(decode(value));
    }
    parameters
}

fn quoted(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    format!("[{}]", items.join(", "))
}

impl FormContentMatcher {
    fn compare_parameters(
        &self,
        expected: &IndexMap<String, Vec<String>>,
        actual: &IndexMap<String, Vec<String>>,
        context: &MatchingContext<'_>,
    ) -> Vec<BodyItemMatchResult> {
        let mut result = Vec::new();

        for (name, expected_values) in expected {
            let Some(actual_values) = actual.get(name) else {
                result.push(BodyItemMatchResult::single(
                    name,
                    BodyMismatch::new(
                        Some(name.clone()),
                        None,
                        format!("Expected form post parameter '{name}' but was missing"),
                        construct_path(&["$", name.as_str()]),
                    ),
                ));
                continue;
            };

            for (index, expected_value) in expected_values.iter().enumerate() {
                let path = vec!["$".to_string(), name.clone(), index.to_string()];
                let location = construct_path(&path);
                let actual_value = actual_values.get(index);
                if context.matcher_defined(&path) {
                    debug!("Matcher defined for form post parameter '{}'[{}]", name, index);
                    let actual_match = actual_value.map_or(MatchValue::Absent, |v| MatchValue::Text(v));
                    let mismatches = context.domatch(&path, &MatchValue::Text(expected_value), &actual_match);
                    result.push(BodyItemMatchResult::new(
                        location,
                        mismatches.into_iter().map(BodyMismatch::from).collect(),
                    ));
                    continue;
                }

                debug!(
                    "No matcher defined for form post parameter '{}'[{}], using equality",
                    name, index
                );
                match actual_value {
                    None => result.push(BodyItemMatchResult::single(
                        &location,
                        BodyMismatch::new(
                            Some(format!("{name}={expected_value}")),
                            None,
                            format!("Expected form post parameter '{name}'='{expected_value}' but was missing"),
                            &location,
                        ),
                    )),
                    Some(actual_value) if actual_value != expected_value => {
                        result.push(BodyItemMatchResult::single(
                            &location,
                            BodyMismatch::new(
                                Some(format!("{name}={expected_value}")),
                                Some(format!("{name}={actual_value}")),
                                format!(
                                    "Expected form post parameter '{name}'[{index}] with value '{expected_value}' but was '{actual_value}'"
                                ),
                                &location,
                            ),
                        ))
                    }
                    Some(_) => result.push(BodyItemMatchResult::new(location, Vec::new())),
                }
            }

            let parameter_path = vec!["$".to_string(), name.clone()];
            if actual_values.len() > expected_values.len() && !context.matcher_defined(&parameter_path) {
                let extra = &actual_values[expected_values.len()..];
                result.push(BodyItemMatchResult::single(
                    name,
                    BodyMismatch::new(
                        None,
                        Some(format!("{name}={}", quoted(extra))),
                        format!(
                            "Received unexpected values for form post parameter '{name}': {}",
                            quoted(extra)
                        ),
                        construct_path(&parameter_path),
                    ),
                ));
            }
        }

        if !context.allow_unexpected_keys {
            for (name, values) in actual {
                if !expected.contains_key(name) {
                    result.push(BodyItemMatchResult::single(
                        name,
                        BodyMismatch::new(
                            None,
                            Some(format!("{name}={}", quoted(values))),
                            format!("Received unexpected form post parameter '{name}'={}", quoted(values)),
                            construct_path(&["$", name.as_str()]),
                        ),
                    ));
                }
            }
        }

        result
    }
}

impl ContentMatcher for FormContentMatcher {
    fn name(&self) -> &'static str {
        "form"
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
        if expected.is_present() && !actual.is_present() {
            return Ok(BodyMatchResult::root_mismatch(BodyMismatch::new(
                Some(expected.value_as_string()),
                None,
                "Expected a form post body but was missing",
                "$",
            )));
        }
        if !expected.is_present() && !actual.is_present() {
            return Ok(BodyMatchResult::ok());
        }

        let expected_parameters = parse_form(&expected.value_as_string());
        let actual_parameters = parse_form(&actual.value_as_string());
        Ok(BodyMatchResult::from_items(self.compare_parameters(
            &expected_parameters,
            &actual_parameters,
            context,
        )))
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        InteractionContents::from_config_text(config, ContentType::form_urlencoded())
    }
}
