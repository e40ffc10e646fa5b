//! JSON wire format for matching rules.
//!
//! Per category, a map from path expression to `{"matchers": [...], "combine": "AND"|"OR"}`.
//! The reader also accepts single-rule objects without `matchers`, rule objects without `match`
//! keyed off a legacy field, and the flat `$.body.a` map form.

use super::{
    ArrayContainsVariant, Category, HttpStatus, MatchingRule, MatchingRuleCategory,
    MatchingRuleGroup, MatchingRules, NumberKind, RuleDefinition, RuleLogic, DEFAULT_DATE_FORMAT,
    DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIME_FORMAT,
};
use crate::error::{MatchError, Result};
use serde_json::{json, Map, Value};
use tracing::warn;

type Fields = Map<String, Value>;

fn string_field(fields: &Fields, name: &str) -> Option<String> {
    fields.get(name).map(|value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn usize_field(fields: &Fields, name: &str) -> Result<usize> {
    let value = fields
        .get(name)
        .ok_or_else(|| MatchError::rule(format!("missing '{name}' field")))?;
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| MatchError::rule(format!("'{name}' must be a non-negative integer, got {value}")))
}

fn bounded(
    fields: &Fields,
    plain: MatchingRule,
    min: fn(usize) -> MatchingRule,
    max: fn(usize) -> MatchingRule,
    min_max: fn(usize, usize) -> MatchingRule,
) -> Result<MatchingRule> {
    match (fields.contains_key("min"), fields.contains_key("max")) {
        (true, true) => Ok(min_max(usize_field(fields, "min")?, usize_field(fields, "max")?)),
        (true, false) => Ok(min(usize_field(fields, "min")?)),
        (false, true) => Ok(max(usize_field(fields, "max")?)),
        (false, false) => Ok(plain),
    }
}

/// `format`, then the field named after the kind, then the default.
fn format_field(fields: &Fields, kind: &str, default: &str) -> String {
    string_field(fields, "format")
        .or_else(|| string_field(fields, kind))
        .unwrap_or_else(|| default.to_string())
}

fn rule_definition(fields: &Fields) -> Result<RuleDefinition> {
    let value = string_field(fields, "value").unwrap_or_default();
    let rules = match fields.get("rules") {
        Some(Value::Array(items)) => items
            .iter()
            .map(MatchingRule::from_json)
            .collect::<Result<Vec<_>>>()?,
        Some(other) => {
            return Err(MatchError::rule(format!(
                "'rules' must be a list of matchers, got {other}"
            )))
        }
        None => Vec::new(),
    };
    Ok(RuleDefinition { value, rules })
}

fn status_field(fields: &Fields) -> Result<HttpStatus> {
    match fields.get("status") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|n| u16::try_from(n).ok())
                    .ok_or_else(|| {
                        MatchError::rule(format!(
                            "status code matcher of type StatusCodes must have an array of integers, got {item}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(HttpStatus::StatusCodes),
        Some(Value::String(name)) => HttpStatus::from_name(name)
            .ok_or_else(|| MatchError::rule(format!("'{name}' is not a valid HTTP status class"))),
        other => Err(MatchError::rule(format!(
            "status code matcher requires a 'status' field, got {other:?}"
        ))),
    }
}

fn array_contains_variants(fields: &Fields) -> Result<Vec<ArrayContainsVariant>> {
    let variants = match fields.get("variants") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(MatchError::rule(
                "array contains matchers should have a list of variants",
            ))
        }
    };
    variants
        .iter()
        .enumerate()
        .map(|(position, variant)| {
            let object = variant.as_object().ok_or_else(|| {
                MatchError::rule(format!(
                    "array contains matchers: variant {position} is incorrectly formed"
                ))
            })?;
            let index = usize_field(object, "index")?;
            let rules = match object.get("rules") {
                Some(rules) => MatchingRuleCategory::from_json(Category::Body, rules)?,
                None => MatchingRuleCategory::new(Category::Body),
            };
            Ok(ArrayContainsVariant { index, rules })
        })
        .collect()
}

impl MatchingRule {
    /// Parse one rule object.
    pub fn from_json(json: &Value) -> Result<MatchingRule> {
        let Some(fields) = json.as_object() else {
            warn!("Unrecognised matcher definition {}, defaulting to equality matching", json);
            return Ok(MatchingRule::Equality);
        };
        if let Some(kind) = fields.get("match") {
            let kind = match kind {
                Value::String(s) => s.as_str(),
                _ => return Err(MatchError::rule(format!("'match' must be a string, got {kind}"))),
            };
            return MatchingRule::create(kind, fields);
        }
        if let Some(regex) = string_field(fields, "regex") {
            MatchingRule::regex(&regex)
        } else if fields.contains_key("min") || fields.contains_key("max") {
            bounded(
                fields,
                MatchingRule::Type,
                MatchingRule::MinType,
                MatchingRule::MaxType,
                MatchingRule::MinMaxType,
            )
        } else if let Some(format) = string_field(fields, "timestamp") {
            Ok(MatchingRule::Timestamp(format))
        } else if let Some(format) = string_field(fields, "time") {
            Ok(MatchingRule::Time(format))
        } else if let Some(format) = string_field(fields, "date") {
            Ok(MatchingRule::Date(format))
        } else {
            warn!("Unrecognised matcher definition {}, defaulting to equality matching", json);
            Ok(MatchingRule::Equality)
        }
    }

    fn create(kind: &str, fields: &Fields) -> Result<MatchingRule> {
        let rule = match kind {
            "equality" => MatchingRule::Equality,
            "null" => MatchingRule::Null,
            "include" => MatchingRule::Include(string_field(fields, "value").unwrap_or_default()),
            "type" => bounded(
                fields,
                MatchingRule::Type,
                MatchingRule::MinType,
                MatchingRule::MaxType,
                MatchingRule::MinMaxType,
            )?,
            "number" => MatchingRule::Number(NumberKind::Number),
            "integer" => MatchingRule::Number(NumberKind::Integer),
            "decimal" => MatchingRule::Number(NumberKind::Decimal),
            "real" => {
                warn!("The 'real' type matcher is deprecated, use 'decimal' instead");
                MatchingRule::Number(NumberKind::Decimal)
            }
            "regex" => {
                let pattern = string_field(fields, "regex")
                    .ok_or_else(|| MatchError::rule("regex matcher requires a 'regex' field"))?;
                MatchingRule::regex(&pattern)?
            }
            "timestamp" | "datetime" => MatchingRule::Timestamp(format_field(
                fields,
                "timestamp",
                DEFAULT_TIMESTAMP_FORMAT,
            )),
            "time" => MatchingRule::Time(format_field(fields, "time", DEFAULT_TIME_FORMAT)),
            "date" => MatchingRule::Date(format_field(fields, "date", DEFAULT_DATE_FORMAT)),
            "values" => MatchingRule::Values,
            "ignore-order" => bounded(
                fields,
                MatchingRule::EqualsIgnoreOrder,
                MatchingRule::MinEqualsIgnoreOrder,
                MatchingRule::MaxEqualsIgnoreOrder,
                MatchingRule::MinMaxEqualsIgnoreOrder,
            )?,
            "contentType" | "content-type" => {
                MatchingRule::ContentType(string_field(fields, "value").unwrap_or_default())
            }
            "arrayContains" | "array-contains" => {
                MatchingRule::ArrayContains(array_contains_variants(fields)?)
            }
            "boolean" => MatchingRule::Boolean,
            "statusCode" | "status-code" => MatchingRule::StatusCode(status_field(fields)?),
            "notEmpty" | "not-empty" => MatchingRule::NotEmpty,
            "semver" => MatchingRule::Semver,
            "eachKey" | "each-key" => MatchingRule::EachKey(rule_definition(fields)?),
            "eachValue" | "each-value" => MatchingRule::EachValue(rule_definition(fields)?),
            other => {
                warn!("Unrecognised matcher {}, defaulting to equality matching", other);
                MatchingRule::Equality
            }
        };
        Ok(rule)
    }

    /// Serialize to a rule object.
    pub fn to_json(&self) -> Value {
        match self {
            MatchingRule::Equality => json!({"match": "equality"}),
            MatchingRule::Regex(pattern) => json!({"match": "regex", "regex": pattern.as_str()}),
            MatchingRule::Type => json!({"match": "type"}),
            MatchingRule::MinType(min) => json!({"match": "type", "min": min}),
            MatchingRule::MaxType(max) => json!({"match": "type", "max": max}),
            MatchingRule::MinMaxType(min, max) => json!({"match": "type", "min": min, "max": max}),
            MatchingRule::Number(kind) => json!({"match": kind.as_str()}),
            MatchingRule::Date(format) => json!({"match": "date", "format": format}),
            MatchingRule::Time(format) => json!({"match": "time", "format": format}),
            MatchingRule::Timestamp(format) => json!({"match": "timestamp", "format": format}),
            MatchingRule::Include(value) => json!({"match": "include", "value": value}),
            MatchingRule::Null => json!({"match": "null"}),
            MatchingRule::EqualsIgnoreOrder => json!({"match": "ignore-order"}),
            MatchingRule::MinEqualsIgnoreOrder(min) => json!({"match": "ignore-order", "min": min}),
            MatchingRule::MaxEqualsIgnoreOrder(max) => json!({"match": "ignore-order", "max": max}),
            MatchingRule::MinMaxEqualsIgnoreOrder(min, max) => {
                json!({"match": "ignore-order", "min": min, "max": max})
            }
            MatchingRule::ContentType(value) => json!({"match": "contentType", "value": value}),
            MatchingRule::StatusCode(status) => {
                let status = match status {
                    HttpStatus::StatusCodes(codes) => json!(codes),
                    other => json!(other.name()),
                };
                json!({"match": "statusCode", "status": status})
            }
            MatchingRule::Values => json!({"match": "values"}),
            MatchingRule::ArrayContains(variants) => {
                let variants: Vec<Value> = variants
                    .iter()
                    .map(|variant| json!({"index": variant.index, "rules": variant.rules.to_json()}))
                    .collect();
                json!({"match": "arrayContains", "variants": variants})
            }
            MatchingRule::Boolean => json!({"match": "boolean"}),
            MatchingRule::NotEmpty => json!({"match": "notEmpty"}),
            MatchingRule::Semver => json!({"match": "semver"}),
            MatchingRule::EachKey(definition) => definition_json("eachKey", definition),
            MatchingRule::EachValue(definition) => definition_json("eachValue", definition),
        }
    }
}

fn definition_json(kind: &str, definition: &RuleDefinition) -> Value {
    let rules: Vec<Value> = definition.rules.iter().map(MatchingRule::to_json).collect();
    json!({"match": kind, "value": definition.value, "rules": rules})
}

impl MatchingRuleGroup {
    /// Parse a group. An object without `matchers` is read as a single rule.
    pub fn from_json(json: &Value) -> Result<MatchingRuleGroup> {
        let Some(fields) = json.as_object() else {
            warn!("{} is not a valid matcher definition", json);
            return Ok(MatchingRuleGroup::default());
        };
        let Some(matchers) = fields.get("matchers") else {
            return Ok(MatchingRuleGroup::single(MatchingRule::from_json(json)?));
        };

        let logic = match fields.get("combine").and_then(Value::as_str) {
            Some("OR") => RuleLogic::Or,
            Some("AND") | None => RuleLogic::And,
            Some(other) => {
                warn!("{} is not a valid matcher rule logic value", other);
                RuleLogic::And
            }
        };
        let rules = match matchers {
            Value::Array(items) => items
                .iter()
                .filter(|item| item.is_object())
                .map(MatchingRule::from_json)
                .collect::<Result<Vec<_>>>()?,
            _ => {
                warn!("{} does not contain a list of matchers", json);
                Vec::new()
            }
        };
        Ok(MatchingRuleGroup::new(rules, logic))
    }

    pub fn to_json(&self) -> Value {
        let matchers: Vec<Value> = self.rules.iter().map(MatchingRule::to_json).collect();
        json!({"matchers": matchers, "combine": self.logic.as_str()})
    }
}

impl MatchingRuleCategory {
    /// Parse the rules of one category.
    pub fn from_json(name: Category, json: &Value) -> Result<MatchingRuleCategory> {
        let mut category = MatchingRuleCategory::new(name);
        match json {
            Value::Object(entries) if name.requires_subkeys() => {
                for (key, value) in entries {
                    if value.is_object() {
                        category.set_group(key.clone(), MatchingRuleGroup::from_json(value)?);
                    } else {
                        warn!("{} is not a valid matcher definition", value);
                    }
                }
            }
            Value::Object(entries) => {
                let group = match entries.get("") {
                    Some(inner) if entries.len() == 1 => MatchingRuleGroup::from_json(inner)?,
                    _ => MatchingRuleGroup::from_json(json)?,
                };
                category.set_group("", group);
            }
            Value::Array(items) if name == Category::Path => {
                for item in items {
                    category.add_rule("", MatchingRule::from_json(item)?);
                }
            }
            other => warn!("{} is not a valid matching rule category", other),
        }
        Ok(category)
    }

    pub fn to_json(&self) -> Value {
        if self.name.requires_subkeys() {
            let entries: Map<String, Value> = self
                .rules
                .iter()
                .filter(|(_, group)| !group.is_empty())
                .map(|(key, group)| (key.clone(), group.to_json()))
                .collect();
            Value::Object(entries)
        } else {
            self.rules
                .get("")
                .or_else(|| self.rules.values().next())
                .map(MatchingRuleGroup::to_json)
                .unwrap_or_else(|| json!({}))
        }
    }
}

impl MatchingRules {
    /// Parse a `matchingRules` object, in either the category-keyed or the flat `$.` form.
    pub fn from_json(json: &Value) -> Result<MatchingRules> {
        let mut rules = MatchingRules::new();
        let entries = match json {
            Value::Object(entries) if !entries.is_empty() => entries,
            Value::Object(_) | Value::Null => return Ok(rules),
            other => {
                warn!("{} is not valid matching rules format", other);
                return Ok(rules);
            }
        };

        let flat = entries.keys().next().is_some_and(|key| key.starts_with('$'));
        if flat {
            for (key, value) in entries {
                rules.add_flat_rule(key, value)?;
            }
        } else {
            for (key, value) in entries {
                match key.parse::<Category>() {
                    Ok(name) => {
                        let category = MatchingRuleCategory::from_json(name, value)?;
                        let target = rules.add_category(name);
                        target.rules.extend(category.rules);
                    }
                    Err(_) => warn!("Ignoring unknown matching rule category '{}'", key),
                }
            }
        }
        Ok(rules)
    }

    fn add_flat_rule(&mut self, key: &str, value: &Value) -> Result<()> {
        let group = MatchingRuleGroup::from_json(value)?;
        let (category, item) = if let Some(rest) = key.strip_prefix("$.body") {
            (Category::Body, format!("${rest}"))
        } else if let Some(rest) = key.strip_prefix("$.headers.") {
            (Category::Header, rest.split('.').next().unwrap_or_default().to_string())
        } else {
            let mut parts = key.split('.').skip(1);
            let Some(name) = parts.next() else {
                warn!("Ignoring matching rule with key '{}'", key);
                return Ok(());
            };
            match name.parse::<Category>() {
                Ok(category) => (category, parts.next().unwrap_or_default().to_string()),
                Err(_) => {
                    warn!("Ignoring matching rule with key '{}'", key);
                    return Ok(());
                }
            }
        };
        let target = self.add_category(category);
        for rule in group.rules {
            target.add_rule(item.clone(), rule);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let entries: Map<String, Value> = self
            .categories
            .iter()
            .filter(|(_, category)| !category.is_empty())
            .map(|(name, category)| (name.as_str().to_string(), category.to_json()))
            .collect();
        Value::Object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_with_or_logic() {
        let group = MatchingRuleGroup::from_json(&json!({
            "matchers": [{"match": "regex", "regex": "\\d+"}, {"match": "null"}],
            "combine": "OR"
        }))
        .unwrap();
        assert_eq!(group.logic, RuleLogic::Or);
        assert_eq!(group.rules.len(), 2);
        assert_eq!(group.rules[1], MatchingRule::Null);
    }

    #[test]
    fn test_type_with_bounds() {
        let rule = MatchingRule::from_json(&json!({"match": "type", "min": 1, "max": 3})).unwrap();
        assert_eq!(rule, MatchingRule::MinMaxType(1, 3));
        let rule = MatchingRule::from_json(&json!({"match": "type", "min": "2"})).unwrap();
        assert_eq!(rule, MatchingRule::MinType(2));
    }

    #[test]
    fn test_legacy_rule_objects() {
        assert_eq!(
            MatchingRule::from_json(&json!({"regex": "a+"})).unwrap(),
            MatchingRule::regex("a+").unwrap()
        );
        assert_eq!(
            MatchingRule::from_json(&json!({"max": 4})).unwrap(),
            MatchingRule::MaxType(4)
        );
        assert_eq!(
            MatchingRule::from_json(&json!({"date": "dd/MM/yyyy"})).unwrap(),
            MatchingRule::Date("dd/MM/yyyy".into())
        );
    }

    #[test]
    fn test_aliases_and_defaults() {
        assert_eq!(
            MatchingRule::from_json(&json!({"match": "datetime"})).unwrap(),
            MatchingRule::Timestamp(DEFAULT_TIMESTAMP_FORMAT.into())
        );
        assert_eq!(
            MatchingRule::from_json(&json!({"match": "real"})).unwrap(),
            MatchingRule::Number(NumberKind::Decimal)
        );
        assert_eq!(
            MatchingRule::from_json(&json!({"match": "time", "time": "HH:mm"})).unwrap(),
            MatchingRule::Time("HH:mm".into())
        );
        assert_eq!(
            MatchingRule::from_json(&json!({"match": "not-empty"})).unwrap(),
            MatchingRule::NotEmpty
        );
    }

    #[test]
    fn test_unknown_kind_is_equality() {
        let rule = MatchingRule::from_json(&json!({"match": "sparkle"})).unwrap();
        assert_eq!(rule, MatchingRule::Equality);
    }

    #[test]
    fn test_bad_shapes_are_errors() {
        assert!(MatchingRule::from_json(&json!({"match": "arrayContains"})).is_err());
        assert!(MatchingRule::from_json(&json!({"match": "type", "min": -1})).is_err());
        assert!(MatchingRule::from_json(&json!({"match": "regex", "regex": "("})).is_err());
        assert!(MatchingRule::from_json(&json!({"match": "statusCode", "status": "teapot"})).is_err());
    }

    #[test]
    fn test_status_code_forms() {
        let rule = MatchingRule::from_json(&json!({"match": "statusCode", "status": [200, 204]})).unwrap();
        assert_eq!(rule, MatchingRule::StatusCode(HttpStatus::StatusCodes(vec![200, 204])));
        assert_eq!(rule.to_json()["status"], json!([200, 204]));
    }

    #[test]
    fn test_unkeyed_categories() {
        let path = MatchingRuleCategory::from_json(
            Category::Path,
            &json!({"matchers": [{"match": "regex", "regex": "/a/\\d+"}]}),
        )
        .unwrap();
        assert_eq!(path.get("").unwrap().rules.len(), 1);

        let legacy = MatchingRuleCategory::from_json(
            Category::Path,
            &json!({"": {"matchers": [{"match": "type"}]}}),
        )
        .unwrap();
        assert_eq!(legacy.get("").unwrap().rules, vec![MatchingRule::Type]);

        let listed =
            MatchingRuleCategory::from_json(Category::Path, &json!([{"match": "type"}])).unwrap();
        assert_eq!(listed.get("").unwrap().rules, vec![MatchingRule::Type]);
    }

    #[test]
    fn test_flat_form() {
        let rules = MatchingRules::from_json(&json!({
            "$.body.items[*].id": {"match": "type"},
            "$.body": {"min": 1},
            "$.headers.Content-Type": {"regex": "application/.*"},
            "$.query.page": {"match": "integer"},
            "$.path": {"regex": "/orders/\\d+"}
        }))
        .unwrap();
        let body = rules.category(Category::Body).unwrap();
        assert!(body.get("$.items[*].id").is_some());
        assert_eq!(body.get("$").unwrap().rules, vec![MatchingRule::MinType(1)]);
        assert!(rules.category(Category::Header).unwrap().get("Content-Type").is_some());
        assert!(rules.category(Category::Query).unwrap().get("page").is_some());
        assert!(rules.category(Category::Path).unwrap().get("").is_some());
    }

    #[test]
    fn test_category_serialization_shape() {
        let category = MatchingRuleCategory::new(Category::Body).with_rule("$.a", MatchingRule::Type);
        assert_eq!(
            category.to_json(),
            json!({"$.a": {"matchers": [{"match": "type"}], "combine": "AND"}})
        );
        let status = MatchingRuleCategory::new(Category::Status)
            .with_rule("", MatchingRule::StatusCode(HttpStatus::Success));
        assert_eq!(
            status.to_json(),
            json!({"matchers": [{"match": "statusCode", "status": "success"}], "combine": "AND"})
        );
    }
}
