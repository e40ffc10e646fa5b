//! Rule executor.
//!
//! [`domatch`] applies a rule group to one expected/actual pair and returns every disagreement.
//! It is pure: content matchers decide *where* rules apply, this module decides *whether* a value
//! satisfies them.
//!
//! # Module Structure
//!
//! - `datetime` - date/time pattern translation and validation

mod datetime;

pub use datetime::validate as validate_date_time;

use crate::content_type::ContentType;
use crate::path_expr::construct_path;
use crate::rules::{HttpStatus, MatchingRule, MatchingRuleGroup, NumberKind, RuleLogic};
use crate::value::MatchValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("static regex"));
static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|-?\d+\.\d*)$").expect("static regex"));
static BOOLEAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(true|false)$").expect("static regex"));

/// One disagreement produced by a rule, before it is typed for its domain.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMismatch {
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub message: String,
    pub path: String,
}

impl RuleMismatch {
    pub fn new(
        expected: &MatchValue<'_>,
        actual: &MatchValue<'_>,
        message: impl Into<String>,
        path: &[String],
    ) -> Self {
        RuleMismatch {
            expected: expected.render(),
            actual: actual.render(),
            message: message.into(),
            path: construct_path(path),
        }
    }
}

/// Apply every rule in `group` and combine the results per the group's logic.
pub fn domatch(
    group: &MatchingRuleGroup,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    coerce_numbers: bool,
) -> Vec<RuleMismatch> {
    let results: Vec<Vec<RuleMismatch>> = group
        .rules
        .iter()
        .map(|rule| domatch_rule(rule, path, expected, actual, group.cascaded, coerce_numbers))
        .collect();

    match group.logic {
        RuleLogic::And => results.into_iter().flatten().collect(),
        RuleLogic::Or if results.iter().any(Vec::is_empty) => Vec::new(),
        RuleLogic::Or => results.into_iter().flatten().collect(),
    }
}

/// Apply a single rule.
///
/// `cascaded` marks rules inherited from an ancestor path; size bounds then degrade to a type check.
pub fn domatch_rule(
    rule: &MatchingRule,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    cascaded: bool,
    coerce_numbers: bool,
) -> Vec<RuleMismatch> {
    debug!("Matching value {} at {:?} with {}", actual.describe(), path, rule.name());
    match rule {
        MatchingRule::Equality => match_equality(path, expected, actual),
        MatchingRule::Regex(pattern) => {
            let matches = !actual.is_null() && pattern.is_full_match(&actual.to_text());
            let both_collections = (expected.is_array() && actual.is_array())
                || (expected.is_object() && actual.is_object());
            if matches || both_collections {
                Vec::new()
            } else {
                vec![RuleMismatch::new(
                    expected,
                    actual,
                    format!("Expected {} to match '{}'", actual.describe(), pattern),
                    path,
                )]
            }
        }
        MatchingRule::Type => match_type(path, expected, actual, true),
        MatchingRule::NotEmpty => match_type(path, expected, actual, false),
        MatchingRule::MinType(min) => match_min(*min, path, expected, actual, cascaded),
        MatchingRule::MaxType(max) => match_max(*max, path, expected, actual, cascaded),
        MatchingRule::MinMaxType(min, max) => {
            let mut result = match_min(*min, path, expected, actual, cascaded);
            result.extend(match_max(*max, path, expected, actual, cascaded));
            result
        }
        MatchingRule::Number(kind) => match_number(*kind, path, expected, actual, coerce_numbers),
        MatchingRule::Date(pattern) => match_date_time("date", pattern, path, expected, actual),
        MatchingRule::Time(pattern) => match_date_time("time", pattern, path, expected, actual),
        MatchingRule::Timestamp(pattern) => {
            let pattern = if pattern.ends_with('Z') {
                warn!(
                    "Found unsupported UTC designator in pattern '{}'. Replacing 'Z's with 'X's",
                    pattern
                );
                pattern.replace('Z', "X")
            } else {
                pattern.clone()
            };
            match_date_time("datetime", &pattern, path, expected, actual)
        }
        MatchingRule::Include(value) => {
            if actual.to_text().contains(value.as_str()) {
                Vec::new()
            } else {
                vec![RuleMismatch::new(
                    expected,
                    actual,
                    format!("Expected {} to include '{}'", actual.describe(), value),
                    path,
                )]
            }
        }
        MatchingRule::Null => match_null(path, actual),
        MatchingRule::EqualsIgnoreOrder => match (expected.collection_len(), actual.collection_len()) {
            (Some(expected_len), Some(actual_len)) if expected_len == actual_len => Vec::new(),
            (Some(expected_len), Some(_)) => vec![RuleMismatch::new(
                expected,
                actual,
                format!("Expected {} to have {} elements", actual.describe(), expected_len),
                path,
            )],
            _ => match_equality(path, expected, actual),
        },
        MatchingRule::MinEqualsIgnoreOrder(min) => {
            if actual.collection_len().is_some() {
                match_min(*min, path, expected, actual, false)
            } else {
                match_equality(path, expected, actual)
            }
        }
        MatchingRule::MaxEqualsIgnoreOrder(max) => {
            if actual.collection_len().is_some() {
                match_max(*max, path, expected, actual, false)
            } else {
                match_equality(path, expected, actual)
            }
        }
        MatchingRule::MinMaxEqualsIgnoreOrder(min, max) => {
            if actual.collection_len().is_some() {
                let mut result = match_min(*min, path, expected, actual, false);
                result.extend(match_max(*max, path, expected, actual, false));
                result
            } else {
                match_equality(path, expected, actual)
            }
        }
        MatchingRule::ContentType(content_type) => match_content_type(content_type, path, actual),
        MatchingRule::StatusCode(status) => match_status_code(status, path, expected, actual),
        MatchingRule::Boolean => match_boolean(path, expected, actual),
        MatchingRule::Semver => match_semver(path, expected, actual),
        MatchingRule::Values
        | MatchingRule::ArrayContains(_)
        | MatchingRule::EachKey(_)
        | MatchingRule::EachValue(_) => Vec::new(),
    }
}

fn json_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => {
            let (e, a) = (e.to_string(), a.to_string());
            e == a
                || match (e.parse::<f64>(), a.parse::<f64>()) {
                    (Ok(e), Ok(a)) => e == a,
                    _ => false,
                }
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| json_equal(e, a))
        }
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(key, e)| a.get(key).is_some_and(|a| json_equal(e, a)))
        }
        (e, a) => e == a,
    }
}

/// Structural equality as used by the equality rule.
pub fn values_equal(expected: &MatchValue<'_>, actual: &MatchValue<'_>) -> bool {
    use MatchValue::*;
    match (expected, actual) {
        (e, a) if e.is_null() && a.is_null() => true,
        (Element(e), Element(a)) => e.name == a.name,
        (Siblings(e), Siblings(a)) => {
            e.len() == a.len() && e.iter().zip(a.iter()).all(|(e, a)| e.name == a.name)
        }
        (Json(e), Json(a)) => json_equal(e, a),
        (Json(Value::String(e)), Str(a) | Text(a)) => e == a,
        (Str(e) | Text(e), Json(Value::String(a))) => e == a,
        (Str(e) | Text(e), Str(a) | Text(a)) => e == a,
        (List(e), List(a)) => e == a,
        (Status(e), Status(a)) => e == a,
        (Bytes(e), Bytes(a)) => e == a,
        _ => false,
    }
}

fn match_equality(
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> Vec<RuleMismatch> {
    let matches = values_equal(expected, actual);
    debug!(
        "comparing {} ({}) to {} ({}) at {:?} -> {}",
        actual.describe(),
        actual.type_name(),
        expected.describe(),
        expected.type_name(),
        path,
        matches
    );
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!(
                "Expected {} ({}) to be equal to {} ({})",
                actual.describe(),
                actual.type_name(),
                expected.describe(),
                expected.type_name()
            ),
            path,
        )]
    }
}

fn match_type(
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    allow_empty: bool,
) -> Vec<RuleMismatch> {
    let same_scalar_kind = (expected.is_number() && actual.is_number())
        || (expected.is_boolean() && actual.is_boolean())
        || matches!((expected, actual), (MatchValue::Element(e), MatchValue::Element(a)) if e.name == a.name);
    let same_container_kind = (expected.is_string() && actual.is_string())
        || (expected.is_array() && actual.is_array())
        || (expected.is_object() && actual.is_object())
        || matches!((expected, actual), (MatchValue::Bytes(_), MatchValue::Bytes(_)));

    if same_scalar_kind {
        Vec::new()
    } else if same_container_kind {
        if allow_empty || !actual.is_empty() {
            Vec::new()
        } else {
            vec![RuleMismatch::new(
                expected,
                actual,
                format!("Expected {} ({}) to not be empty", actual.describe(), actual.type_name()),
                path,
            )]
        }
    } else if expected.is_null() {
        if actual.is_null() {
            Vec::new()
        } else {
            vec![RuleMismatch::new(
                expected,
                actual,
                format!("Expected {} ({}) to be a null value", actual.describe(), actual.type_name()),
                path,
            )]
        }
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!(
                "Expected {} ({}) to be the same type as {} ({})",
                actual.describe(),
                actual.type_name(),
                expected.describe(),
                expected.type_name()
            ),
            path,
        )]
    }
}

fn size_mismatch(
    bound: &str,
    limit: usize,
    size: usize,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> RuleMismatch {
    RuleMismatch::new(
        expected,
        actual,
        format!(
            "Expected {} (size {}) to have {} size of {}",
            actual.describe(),
            size,
            bound,
            limit
        ),
        path,
    )
}

fn match_min(
    min: usize,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    cascaded: bool,
) -> Vec<RuleMismatch> {
    debug!("comparing {} with minimum {} at {:?}", actual.describe(), min, path);
    match actual.collection_len() {
        Some(size) if !cascaded => {
            if size < min {
                vec![size_mismatch("minimum", min, size, path, expected, actual)]
            } else {
                Vec::new()
            }
        }
        _ => match_type(path, expected, actual, true),
    }
}

fn match_max(
    max: usize,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    cascaded: bool,
) -> Vec<RuleMismatch> {
    debug!("comparing {} with maximum {} at {:?}", actual.describe(), max, path);
    match actual.collection_len() {
        Some(size) if !cascaded => {
            if size > max {
                vec![size_mismatch("maximum", max, size, path, expected, actual)]
            } else {
                Vec::new()
            }
        }
        _ => match_type(path, expected, actual, true),
    }
}

/// Whether `actual` reads as an integer.
pub fn is_integer(actual: &MatchValue<'_>, coerce_numbers: bool) -> bool {
    match actual {
        MatchValue::Json(Value::Number(n)) => INTEGER.is_match(&n.to_string()),
        MatchValue::Status(_) => true,
        MatchValue::Text(s) => INTEGER.is_match(s),
        MatchValue::Json(Value::String(s)) if coerce_numbers => INTEGER.is_match(s),
        MatchValue::Str(s) if coerce_numbers => INTEGER.is_match(s),
        _ => false,
    }
}

/// Whether `actual` reads as a decimal: a fractional or exponent form, or zero.
pub fn is_decimal(actual: &MatchValue<'_>, coerce_numbers: bool) -> bool {
    match actual {
        MatchValue::Json(Value::Number(n)) => {
            let repr = n.to_string();
            repr.contains(['.', 'e', 'E']) || repr.parse::<f64>().is_ok_and(|v| v == 0.0)
        }
        MatchValue::Text(s) => DECIMAL.is_match(s),
        MatchValue::Json(Value::String(s)) if coerce_numbers => DECIMAL.is_match(s),
        MatchValue::Str(s) if coerce_numbers => DECIMAL.is_match(s),
        _ => false,
    }
}

fn match_number(
    kind: NumberKind,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
    coerce_numbers: bool,
) -> Vec<RuleMismatch> {
    let (matches, description) = match kind {
        NumberKind::Number => (
            is_integer(actual, coerce_numbers) || is_decimal(actual, coerce_numbers),
            "a number",
        ),
        NumberKind::Integer => (is_integer(actual, coerce_numbers), "an integer"),
        NumberKind::Decimal => (is_decimal(actual, coerce_numbers), "a decimal number"),
    };
    debug!(
        "comparing type of {} ({}) to {} at {:?} -> {}",
        actual.describe(),
        actual.type_name(),
        description,
        path,
        matches
    );
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!("Expected {} ({}) to be {}", actual.describe(), actual.type_name(), description),
            path,
        )]
    }
}

fn match_date_time(
    label: &str,
    pattern: &str,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> Vec<RuleMismatch> {
    debug!("comparing {} to {} pattern {} at {:?}", actual.describe(), label, pattern, path);
    if actual.is_collection() {
        return Vec::new();
    }
    match datetime::validate(&actual.to_text(), pattern) {
        Ok(()) => Vec::new(),
        Err(reason) => vec![RuleMismatch::new(
            expected,
            actual,
            format!(
                "Expected {} to match a {} pattern of '{}': {}",
                actual.describe(),
                label,
                pattern,
                reason
            ),
            path,
        )],
    }
}

fn match_null(path: &[String], actual: &MatchValue<'_>) -> Vec<RuleMismatch> {
    let matches = actual.is_null();
    debug!("comparing {} to null at {:?} -> {}", actual.describe(), path, matches);
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            &MatchValue::Absent,
            actual,
            format!("Expected {} ({}) to be a null value", actual.describe(), actual.type_name()),
            path,
        )]
    }
}

fn match_boolean(
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> Vec<RuleMismatch> {
    let matches = (expected.is_null() && actual.is_null())
        || actual.is_boolean()
        || actual.is_collection()
        || (actual.is_string() && BOOLEAN.is_match(&actual.to_text()));
    debug!(
        "comparing type of {} ({}) to match a boolean at {:?} -> {}",
        actual.describe(),
        actual.type_name(),
        path,
        matches
    );
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!("Expected {} ({}) to match a boolean", actual.describe(), actual.type_name()),
            path,
        )]
    }
}

fn match_semver(
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> Vec<RuleMismatch> {
    let text = match actual {
        MatchValue::Element(element) => element.name.to_string(),
        other => other.to_text().into_owned(),
    };
    let matches = semver::Version::parse(&text).is_ok();
    debug!(
        "comparing {} ({}) as a semantic version at {:?} -> {}",
        actual.describe(),
        actual.type_name(),
        path,
        matches
    );
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!("{} is not a valid semantic version", actual.describe()),
            path,
        )]
    }
}

fn match_content_type(content_type: &str, path: &[String], actual: &MatchValue<'_>) -> Vec<RuleMismatch> {
    let bytes: Vec<u8> = match actual {
        MatchValue::Bytes(bytes) => bytes.to_vec(),
        other => other.to_text().into_owned().into_bytes(),
    };
    let expected_type = content_type.parse::<ContentType>().ok();
    let detected = ContentType::sniff(&bytes);
    let matches = match (&expected_type, &detected) {
        (Some(e), Some(d)) => e.base_type() == d.base_type(),
        _ => false,
    };
    debug!(
        "Matching binary contents by content type: expected '{}', detected '{:?}' -> {}",
        content_type, detected, matches
    );
    if matches {
        Vec::new()
    } else {
        let detected = detected
            .map(|d| d.base_type())
            .unwrap_or_else(|| "unknown".to_string());
        vec![RuleMismatch {
            expected: Some(content_type.to_string()),
            actual: actual.render(),
            message: format!(
                "Expected binary contents to have content type '{content_type}' but detected contents was '{detected}'"
            ),
            path: construct_path(path),
        }]
    }
}

fn match_status_code(
    status: &HttpStatus,
    path: &[String],
    expected: &MatchValue<'_>,
    actual: &MatchValue<'_>,
) -> Vec<RuleMismatch> {
    let code = match actual {
        MatchValue::Status(code) => Some(*code),
        other => other.to_text().trim().parse::<u16>().ok(),
    };
    let matches = code.is_some_and(|code| status.matches(code));
    debug!("Matching status {} with {} -> {}", actual.describe(), status, matches);
    if matches {
        Vec::new()
    } else {
        vec![RuleMismatch::new(
            expected,
            actual,
            format!("Expected status code {} to be {}", actual.describe(), status),
            path,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchingRuleGroup;
    use serde_json::json;

    fn root() -> Vec<String> {
        vec!["$".to_string()]
    }

    fn check(rule: MatchingRule, expected: &Value, actual: &Value) -> Vec<RuleMismatch> {
        domatch_rule(
            &rule,
            &root(),
            &MatchValue::Json(expected),
            &MatchValue::Json(actual),
            false,
            false,
        )
    }

    #[test]
    fn test_equality() {
        assert!(check(MatchingRule::Equality, &json!(1), &json!(1)).is_empty());
        assert!(check(MatchingRule::Equality, &json!(1.0), &json!(1)).is_empty());
        let result = check(MatchingRule::Equality, &json!("a"), &json!("b"));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].message, "Expected 'b' (String) to be equal to 'a' (String)");
        assert!(domatch_rule(
            &MatchingRule::Equality,
            &root(),
            &MatchValue::Absent,
            &MatchValue::Json(&Value::Null),
            false,
            false
        )
        .is_empty());
    }

    #[test]
    fn test_regex() {
        let rule = MatchingRule::regex("\\d+").unwrap();
        assert!(check(rule.clone(), &json!("1"), &json!("1234")).is_empty());
        let result = check(rule.clone(), &json!("1"), &json!("12a"));
        assert_eq!(result[0].message, "Expected '12a' to match '\\d+'");
        assert!(check(rule.clone(), &json!([1]), &json!(["x"])).is_empty());
        assert_eq!(check(rule, &json!("1"), &Value::Null).len(), 1);
    }

    #[test]
    fn test_type() {
        assert!(check(MatchingRule::Type, &json!(1), &json!(2.5)).is_empty());
        assert!(check(MatchingRule::Type, &json!("a"), &json!("")).is_empty());
        let result = check(MatchingRule::Type, &json!("a"), &json!(1));
        assert_eq!(
            result[0].message,
            "Expected 1 (Number) to be the same type as 'a' (String)"
        );
        let result = check(MatchingRule::Type, &Value::Null, &json!(1));
        assert_eq!(result[0].message, "Expected 1 (Number) to be a null value");
    }

    #[test]
    fn test_not_empty() {
        assert!(check(MatchingRule::NotEmpty, &json!("a"), &json!("b")).is_empty());
        let result = check(MatchingRule::NotEmpty, &json!([1]), &json!([]));
        assert_eq!(result[0].message, "Expected [] (Array) to not be empty");
    }

    #[test]
    fn test_min_max() {
        let result = check(MatchingRule::MinType(2), &json!([1]), &json!([1]));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].message, "Expected [1] (size 1) to have minimum size of 2");
        assert!(check(MatchingRule::MinType(2), &json!([1]), &json!([1, 2])).is_empty());
        assert!(check(MatchingRule::MinType(2), &json!([1]), &json!([1, 2, 3])).is_empty());
        let result = check(MatchingRule::MinMaxType(1, 2), &json!([1]), &json!([1, 2, 3]));
        assert_eq!(result[0].message, "Expected [1,2,3] (size 3) to have maximum size of 2");
        assert!(check(MatchingRule::MaxType(1), &json!(1), &json!(5)).is_empty());
    }

    #[test]
    fn test_cascaded_min_is_type_check() {
        let result = domatch_rule(
            &MatchingRule::MinType(3),
            &root(),
            &MatchValue::Json(&json!([1])),
            &MatchValue::Json(&json!([1])),
            true,
            false,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_numbers() {
        let integer = MatchingRule::Number(NumberKind::Integer);
        assert!(check(integer.clone(), &json!(1), &json!(0)).is_empty());
        assert!(check(integer.clone(), &json!(1), &json!(-5)).is_empty());
        let big: Value = serde_json::from_str("123456789012345678901234567890").unwrap();
        assert!(check(integer.clone(), &json!(1), &big).is_empty());
        assert_eq!(check(integer.clone(), &json!(1), &json!(1.5)).len(), 1);
        let result = check(integer, &json!(1), &json!("12"));
        assert_eq!(result[0].message, "Expected '12' (String) to be an integer");

        let decimal = MatchingRule::Number(NumberKind::Decimal);
        assert!(check(decimal.clone(), &json!(1.1), &json!(2.5)).is_empty());
        assert!(check(decimal.clone(), &json!(1.1), &json!(0)).is_empty());
        assert_eq!(check(decimal, &json!(1.1), &json!(2)).len(), 1);

        let number = MatchingRule::Number(NumberKind::Number);
        assert!(check(number.clone(), &json!(1), &json!(2.5)).is_empty());
        assert_eq!(check(number, &json!(1), &json!("x")).len(), 1);
    }

    #[test]
    fn test_numbers_coerce_strings_when_enabled() {
        let result = domatch_rule(
            &MatchingRule::Number(NumberKind::Integer),
            &root(),
            &MatchValue::Str("1"),
            &MatchValue::Str("42"),
            false,
            true,
        );
        assert!(result.is_empty());
        let result = domatch_rule(
            &MatchingRule::Number(NumberKind::Decimal),
            &root(),
            &MatchValue::Text("1.5"),
            &MatchValue::Text("2.25"),
            false,
            false,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_dates() {
        let rule = MatchingRule::Date("yyyy-MM-dd".into());
        assert!(check(rule.clone(), &json!("2020-01-01"), &json!("2021-12-31")).is_empty());
        let result = check(rule, &json!("2020-01-01"), &json!("31/12/2021"));
        assert!(result[0]
            .message
            .starts_with("Expected '31/12/2021' to match a date pattern of 'yyyy-MM-dd': "));
    }

    #[test]
    fn test_timestamp_with_utc_designator() {
        let rule = MatchingRule::Timestamp("yyyy-MM-dd'T'HH:mm:ssZ".into());
        assert!(check(rule, &json!(""), &json!("2021-01-01T10:00:00Z")).is_empty());
    }

    #[test]
    fn test_include() {
        let rule = MatchingRule::Include("ell".into());
        assert!(check(rule.clone(), &json!("hello"), &json!("yellow")).is_empty());
        let result = check(rule, &json!("hello"), &json!("world"));
        assert_eq!(result[0].message, "Expected 'world' to include 'ell'");
        let absent = domatch_rule(
            &MatchingRule::Include("x".into()),
            &root(),
            &MatchValue::Absent,
            &MatchValue::Absent,
            false,
            false,
        );
        assert_eq!(absent.len(), 1);
    }

    #[test]
    fn test_null() {
        assert!(check(MatchingRule::Null, &Value::Null, &Value::Null).is_empty());
        let result = check(MatchingRule::Null, &Value::Null, &json!(1));
        assert_eq!(result[0].message, "Expected 1 (Number) to be a null value");
        assert_eq!(result[0].expected, None);
    }

    #[test]
    fn test_boolean_and_semver() {
        assert!(check(MatchingRule::Boolean, &json!(true), &json!(false)).is_empty());
        assert!(check(MatchingRule::Boolean, &json!(true), &json!("true")).is_empty());
        assert_eq!(check(MatchingRule::Boolean, &json!(true), &json!("yes")).len(), 1);
        assert!(check(MatchingRule::Semver, &json!("1.0.0"), &json!("2.3.4-beta.1")).is_empty());
        let result = check(MatchingRule::Semver, &json!("1.0.0"), &json!("1.0"));
        assert_eq!(result[0].message, "'1.0' is not a valid semantic version");
    }

    #[test]
    fn test_ignore_order_sizes() {
        let result = check(MatchingRule::EqualsIgnoreOrder, &json!([1, 2]), &json!([2]));
        assert_eq!(result[0].message, "Expected [2] to have 2 elements");
        assert!(check(MatchingRule::MinEqualsIgnoreOrder(1), &json!([1]), &json!([3, 4])).is_empty());
        assert_eq!(check(MatchingRule::MaxEqualsIgnoreOrder(1), &json!([1]), &json!([3, 4])).len(), 1);
    }

    #[test]
    fn test_status_code() {
        let rule = MatchingRule::StatusCode(HttpStatus::Success);
        let ok = domatch_rule(&rule, &root(), &MatchValue::Status(200), &MatchValue::Status(204), false, false);
        assert!(ok.is_empty());
        let bad = domatch_rule(&rule, &root(), &MatchValue::Status(200), &MatchValue::Status(404), false, false);
        assert_eq!(bad.len(), 1);
    }

    #[test]
    fn test_content_type() {
        let rule = MatchingRule::ContentType("image/png".into());
        let png = b"\x89PNG\r\n\x1a\n0000";
        let ok = domatch_rule(&rule, &root(), &MatchValue::Absent, &MatchValue::Bytes(png), false, false);
        assert!(ok.is_empty());
        let bad = domatch_rule(&rule, &root(), &MatchValue::Absent, &MatchValue::Bytes(b"hello"), false, false);
        assert_eq!(
            bad[0].message,
            "Expected binary contents to have content type 'image/png' but detected contents was 'text/plain'"
        );
    }

    #[test]
    fn test_group_logic() {
        let group = MatchingRuleGroup::new(
            vec![MatchingRule::regex("\\d+").unwrap(), MatchingRule::Null],
            RuleLogic::Or,
        );
        let path = root();
        let null = Value::Null;
        let text = json!("abc");
        assert!(domatch(&group, &path, &MatchValue::Absent, &MatchValue::Json(&null), false).is_empty());
        assert_eq!(domatch(&group, &path, &MatchValue::Absent, &MatchValue::Json(&text), false).len(), 2);

        let and = MatchingRuleGroup::new(group.rules.clone(), RuleLogic::And);
        assert_eq!(domatch(&and, &path, &MatchValue::Absent, &MatchValue::Json(&null), false).len(), 1);
    }

    #[test]
    fn test_mismatch_path_is_rendered() {
        let path: Vec<String> = ["$", "items", "0", "id"].iter().map(|s| s.to_string()).collect();
        let result = domatch_rule(
            &MatchingRule::Type,
            &path,
            &MatchValue::Json(&json!(1)),
            &MatchValue::Json(&json!("x")),
            false,
            false,
        );
        assert_eq!(result[0].path, "$.items[0].id");
    }
}
