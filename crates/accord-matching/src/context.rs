//! Rule resolution for one comparison domain.
//!
//! A [`MatchingContext`] wraps the rule category for the part being compared (body, headers,
//! query, ...) together with the unexpected-keys policy. Content and scalar matchers ask it which
//! rule group governs a concrete path.

use crate::config::MatchingConfig;
use crate::executor::{domatch, domatch_rule, RuleMismatch};
use crate::mismatch::{BodyItemMatchResult, BodyMismatch};
use crate::path_expr::{
    calculate_path_weight_tokens, construct_path, matches_path_tokens, parse_path, PathToken,
};
use crate::rules::{Category, MatchingRule, MatchingRuleCategory, MatchingRuleGroup};
use crate::value::MatchValue;
use std::borrow::Cow;
use tracing::{debug, warn};

/// A rule group registered under `key`, with its parsed path tokens for body-like categories.
struct Resolved<'r> {
    key: &'r str,
    tokens: Vec<PathToken>,
    group: &'r MatchingRuleGroup,
}

#[derive(Debug, Clone)]
pub struct MatchingContext<'a> {
    pub matchers: Cow<'a, MatchingRuleCategory>,
    pub allow_unexpected_keys: bool,
    /// Lets number rules accept numeric strings.
    pub coerce_numbers: bool,
    pub config: Cow<'a, MatchingConfig>,
}

impl<'a> MatchingContext<'a> {
    pub fn new(matchers: &'a MatchingRuleCategory, allow_unexpected_keys: bool) -> Self {
        MatchingContext {
            matchers: Cow::Borrowed(matchers),
            allow_unexpected_keys,
            coerce_numbers: false,
            config: Cow::Owned(MatchingConfig::default()),
        }
    }

    pub fn owned(matchers: MatchingRuleCategory, allow_unexpected_keys: bool) -> MatchingContext<'static> {
        MatchingContext {
            matchers: Cow::Owned(matchers),
            allow_unexpected_keys,
            coerce_numbers: false,
            config: Cow::Owned(MatchingConfig::default()),
        }
    }

    pub fn with_config(mut self, config: &'a MatchingConfig) -> Self {
        self.config = Cow::Borrowed(config);
        self
    }

    pub fn with_coerce_numbers(mut self, coerce_numbers: bool) -> Self {
        self.coerce_numbers = coerce_numbers;
        self
    }

    /// A context sharing this one's policy but holding other rules.
    pub fn with_rules(&self, matchers: MatchingRuleCategory) -> MatchingContext<'a> {
        MatchingContext {
            matchers: Cow::Owned(matchers),
            allow_unexpected_keys: self.allow_unexpected_keys,
            coerce_numbers: self.coerce_numbers,
            config: self.config.clone(),
        }
    }

    /// A context holding the rules under `root_path`, re-rooted at `$`.
    pub fn extract_path(&self, root_path: &str) -> MatchingContext<'a> {
        self.with_rules(self.matchers.update_keys(root_path, "$"))
    }

    fn is_body_like(&self) -> bool {
        self.matchers.name.is_structured()
    }

    fn resolve(&self, path: &[String]) -> Vec<Resolved<'_>> {
        let name = self.matchers.name;
        self.matchers
            .rules
            .iter()
            .filter_map(|(key, group)| {
                if name.is_structured() {
                    let tokens = match parse_path(key) {
                        Ok(tokens) => tokens,
                        Err(err) => {
                            warn!("Ignoring matching rule with {}", err);
                            return None;
                        }
                    };
                    (matches_path_tokens(&tokens, path) > 0).then_some(Resolved {
                        key,
                        tokens,
                        group,
                    })
                } else {
                    let selected = match name {
                        Category::Header => path.iter().all(|p| p.eq_ignore_ascii_case(key)),
                        Category::Query | Category::Metadata => path.iter().all(|p| p == key),
                        _ => true,
                    };
                    selected.then_some(Resolved {
                        key,
                        tokens: Vec::new(),
                        group,
                    })
                }
            })
            .collect()
    }

    /// Whether any rule applies at `path`. A `values` rule only counts at its own path.
    pub fn matcher_defined(&self, path: &[String]) -> bool {
        let body_like = self.is_body_like();
        self.resolve(path).iter().any(|r| {
            !body_like || !r.group.has_values_rule() || r.tokens.len() == path.len()
        })
    }

    /// Whether a rule is registered at exactly `path`, ignoring ancestors.
    pub fn direct_matcher_defined(&self, path: &[String]) -> bool {
        self.direct_matcher_defined_for(path, |_| true)
    }

    /// Whether a rule accepted by `predicate` is registered at exactly `path`.
    pub fn direct_matcher_defined_for<F>(&self, path: &[String], predicate: F) -> bool
    where
        F: Fn(&MatchingRule) -> bool,
    {
        let body_like = self.is_body_like();
        self.resolve(path)
            .iter()
            .filter(|r| !body_like || r.tokens.len() == path.len())
            .any(|r| r.group.rules.iter().any(&predicate))
    }

    pub fn type_matcher_defined(&self, path: &[String]) -> bool {
        self.resolve(path)
            .iter()
            .any(|r| r.group.rules.iter().any(MatchingRule::is_type_matcher))
    }

    /// The rule group that governs `path`.
    ///
    /// For bodies the candidate with the highest path weight wins, ties going to the longer
    /// expression and then to the earlier registration. Other categories use the first registered
    /// group.
    pub fn select_best_matcher(&self, path: &[String]) -> MatchingRuleGroup {
        let resolved = self.resolve(path);
        if !self.is_body_like() {
            return resolved
                .first()
                .map(|r| r.group.clone())
                .unwrap_or_default();
        }

        let mut best: Option<(u32, &Resolved<'_>)> = None;
        for candidate in &resolved {
            let weight = if !candidate.group.has_values_rule() || candidate.tokens.len() == path.len() {
                calculate_path_weight_tokens(&candidate.tokens, path)
            } else {
                0
            };
            if weight == 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_weight, current)) => {
                    weight > best_weight
                        || (weight == best_weight && candidate.key.len() > current.key.len())
                }
            };
            if better {
                best = Some((weight, candidate));
            }
        }

        match best {
            Some((weight, selected)) => {
                debug!(
                    "Selected matcher '{}' (weight {}) for {}",
                    selected.key,
                    weight,
                    construct_path(path)
                );
                let mut group = selected.group.clone();
                group.cascaded = selected.tokens.len() < path.len();
                group
            }
            None => MatchingRuleGroup::default(),
        }
    }

    /// Apply the best rule group for `path`.
    pub fn domatch(
        &self,
        path: &[String],
        expected: &MatchValue<'_>,
        actual: &MatchValue<'_>,
    ) -> Vec<RuleMismatch> {
        domatch(
            &self.select_best_matcher(path),
            path,
            expected,
            actual,
            self.coerce_numbers,
        )
    }

    /// Compare the key sets of two maps.
    ///
    /// `expected` and `actual` are the maps themselves, used when rendering a mismatch. Key-set
    /// checks are skipped when a `values`, `eachKey` or `eachValue` rule sits on the map. Any
    /// `eachKey` rules on the map are applied to every actual key.
    pub fn match_keys<D>(
        &self,
        path: &[String],
        expected: &MatchValue<'_>,
        actual: &MatchValue<'_>,
        expected_keys: &[&str],
        actual_keys: &[&str],
        generate_diff: D,
    ) -> Vec<BodyItemMatchResult>
    where
        D: Fn() -> String,
    {
        let mut expected_sorted = expected_keys.to_vec();
        expected_sorted.sort_unstable();
        let mut actual_sorted = actual_keys.to_vec();
        actual_sorted.sort_unstable();
        let missing: Vec<&str> = expected_sorted
            .iter()
            .filter(|key| !actual_keys.contains(*key))
            .copied()
            .collect();

        let location = construct_path(path);
        let mut result = Vec::new();

        if !self.direct_matcher_defined_for(path, MatchingRule::is_collection_key_rule) {
            let message = if self.allow_unexpected_keys && !missing.is_empty() {
                Some(format!(
                    "Actual map is missing the following keys: {}",
                    missing.join(", ")
                ))
            } else if !self.allow_unexpected_keys && expected_sorted != actual_sorted {
                Some(format!(
                    "Expected a Map with keys [{}] but received one with keys [{}]",
                    expected_sorted.join(", "),
                    actual_sorted.join(", ")
                ))
            } else {
                None
            };
            if let Some(message) = message {
                let mismatch = BodyMismatch::new(expected.render(), actual.render(), message, &location)
                    .with_diff(generate_diff());
                result.push(BodyItemMatchResult::single(&location, mismatch));
            }
        }

        if self.direct_matcher_defined(path) {
            for rule in self.select_best_matcher(path).rules {
                if let MatchingRule::EachKey(definition) = rule {
                    for sub_rule in &definition.rules {
                        for key in actual_keys {
                            let mut key_path = path.to_vec();
                            key_path.push(key.to_string());
                            let mismatches = domatch_rule(
                                sub_rule,
                                &key_path,
                                &MatchValue::Str(""),
                                &MatchValue::Str(key),
                                false,
                                false,
                            );
                            result.push(BodyItemMatchResult::new(
                                construct_path(&key_path),
                                mismatches.into_iter().map(BodyMismatch::from).collect(),
                            ));
                        }
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleDefinition, RuleLogic};

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn body_rules() -> MatchingRuleCategory {
        MatchingRuleCategory::new(Category::Body)
            .with_rule("$.a[*]", MatchingRule::Type)
            .with_rule("$.a[1]", MatchingRule::Include("x".into()))
            .with_rule("$.b", MatchingRule::MinType(1))
    }

    #[test]
    fn test_exact_index_beats_wildcard() {
        let rules = body_rules();
        let context = MatchingContext::new(&rules, false);
        let group = context.select_best_matcher(&path(&["$", "a", "1"]));
        assert_eq!(group.rules, vec![MatchingRule::Include("x".into())]);
        assert!(!group.cascaded);

        let group = context.select_best_matcher(&path(&["$", "a", "0"]));
        assert_eq!(group.rules, vec![MatchingRule::Type]);
    }

    #[test]
    fn test_ancestor_rule_is_cascaded() {
        let rules = body_rules();
        let context = MatchingContext::new(&rules, false);
        let group = context.select_best_matcher(&path(&["$", "b", "0"]));
        assert_eq!(group.rules, vec![MatchingRule::MinType(1)]);
        assert!(group.cascaded);
        assert!(context.matcher_defined(&path(&["$", "b", "0"])));
        assert!(!context.direct_matcher_defined(&path(&["$", "b", "0"])));
        assert!(context.direct_matcher_defined(&path(&["$", "b"])));
        assert!(!context.matcher_defined(&path(&["$", "c"])));
    }

    #[test]
    fn test_values_rule_only_applies_at_its_own_path() {
        let rules = MatchingRuleCategory::new(Category::Body).with_rule("$.m", MatchingRule::Values);
        let context = MatchingContext::new(&rules, false);
        assert!(context.matcher_defined(&path(&["$", "m"])));
        assert!(!context.matcher_defined(&path(&["$", "m", "k"])));
        assert!(context.select_best_matcher(&path(&["$", "m", "k"])).is_empty());
    }

    #[test]
    fn test_header_rules_resolve_case_insensitively() {
        let mut rules = MatchingRuleCategory::new(Category::Header);
        rules.set_group(
            "X-Id",
            MatchingRuleGroup::new(vec![MatchingRule::Type], RuleLogic::Or),
        );
        rules.add_rule("x-id", MatchingRule::Equality);
        let context = MatchingContext::new(&rules, false);
        let group = context.select_best_matcher(&path(&["x-ID"]));
        assert_eq!(group.rules, vec![MatchingRule::Type]);
        assert_eq!(group.logic, RuleLogic::Or);
    }

    #[test]
    fn test_query_rules_resolve_exactly() {
        let rules = MatchingRuleCategory::new(Category::Query).with_rule("a", MatchingRule::Type);
        let context = MatchingContext::new(&rules, false);
        assert!(context.matcher_defined(&path(&["a"])));
        assert!(!context.matcher_defined(&path(&["A"])));
    }

    #[test]
    fn test_match_keys_policies() {
        let rules = MatchingRuleCategory::new(Category::Body);
        let strict = MatchingContext::new(&rules, false);
        let result = strict.match_keys(
            &path(&["$"]),
            &MatchValue::Absent,
            &MatchValue::Absent,
            &["b", "a"],
            &["a"],
            String::new,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].result[0].mismatch,
            "Expected a Map with keys [a, b] but received one with keys [a]"
        );

        let lenient = MatchingContext::new(&rules, true);
        let result = lenient.match_keys(
            &path(&["$"]),
            &MatchValue::Absent,
            &MatchValue::Absent,
            &["a", "b"],
            &["a", "c"],
            String::new,
        );
        assert_eq!(result[0].result[0].mismatch, "Actual map is missing the following keys: b");

        let result = lenient.match_keys(
            &path(&["$"]),
            &MatchValue::Absent,
            &MatchValue::Absent,
            &["a"],
            &["a", "c"],
            String::new,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn test_each_key_checks_every_actual_key() {
        let rules = MatchingRuleCategory::new(Category::Body).with_rule(
            "$",
            MatchingRule::EachKey(RuleDefinition {
                value: "key".into(),
                rules: vec![MatchingRule::regex("[a-z]+").unwrap()],
            }),
        );
        let context = MatchingContext::new(&rules, false);
        let result = context.match_keys(
            &path(&["$"]),
            &MatchValue::Absent,
            &MatchValue::Absent,
            &["a"],
            &["abc", "X1"],
            String::new,
        );
        assert_eq!(result.len(), 2);
        assert!(result[0].is_ok());
        assert_eq!(result[1].key, "$.X1");
        assert_eq!(result[1].result[0].mismatch, "Expected 'X1' to match '[a-z]+'");
    }

    #[test]
    fn test_extract_path_reroots_rules() {
        let rules = MatchingRuleCategory::new(Category::Body)
            .with_rule("$.part.name", MatchingRule::Type)
            .with_rule("$.partner", MatchingRule::Type);
        let context = MatchingContext::new(&rules, false);
        let extracted = context.extract_path("$.part");
        assert_eq!(extracted.matchers.rules.len(), 1);
        assert!(extracted.matchers.get("$.name").is_some());
    }
}
