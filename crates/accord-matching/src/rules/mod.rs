//! Matching rule model.
//!
//! A [`MatchingRule`] replaces plain equality at a location. Rules are grouped per location into a
//! [`MatchingRuleGroup`] (AND/OR), groups are keyed by path expression inside a
//! [`MatchingRuleCategory`] (one per comparison domain), and categories are collected into
//! [`MatchingRules`] for one expected interaction.
//!
//! # Module Structure
//!
//! - `wire` - JSON wire format (`{"matchers": [...], "combine": "AND"}`) in both directions

mod wire;

use crate::content_type::ContentType;
use crate::error::{MatchError, Result};
use indexmap::IndexMap;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default pattern for [`MatchingRule::Date`].
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";
/// Default pattern for [`MatchingRule::Time`].
pub const DEFAULT_TIME_FORMAT: &str = "HH:mm:ss";
/// Default pattern for [`MatchingRule::Timestamp`].
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "yyyy-MM-dd HH:mm:ssZZZZZ";

/// A regular expression compiled once, matched against the whole value.
#[derive(Debug, Clone)]
pub struct RegexPattern {
    source: String,
    anchored: Arc<Regex>,
}

impl RegexPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored =
            Regex::new(&format!("^(?:{pattern})$")).map_err(|source| MatchError::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(RegexPattern {
            source: pattern.to_string(),
            anchored: Arc::new(anchored),
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when the entire value matches.
    pub fn is_full_match(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }
}

impl PartialEq for RegexPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Numeric kinds for [`MatchingRule::Number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Number,
    Integer,
    Decimal,
}

impl NumberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberKind::Number => "number",
            NumberKind::Integer => "integer",
            NumberKind::Decimal => "decimal",
        }
    }
}

/// Status classes for [`MatchingRule::StatusCode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpStatus {
    Information,
    Success,
    Redirect,
    ClientError,
    ServerError,
    NonError,
    Error,
    StatusCodes(Vec<u16>),
}

impl HttpStatus {
    /// Whether `status` belongs to this class.
    pub fn matches(&self, status: u16) -> bool {
        match self {
            HttpStatus::Information => (100..=199).contains(&status),
            HttpStatus::Success => (200..=299).contains(&status),
            HttpStatus::Redirect => (300..=399).contains(&status),
            HttpStatus::ClientError => (400..=499).contains(&status),
            HttpStatus::ServerError => (500..=599).contains(&status),
            HttpStatus::NonError => status < 400,
            HttpStatus::Error => status >= 400,
            HttpStatus::StatusCodes(codes) => codes.contains(&status),
        }
    }

    /// Wire name of a status class. `StatusCodes` is written as an array instead.
    pub fn name(&self) -> &'static str {
        match self {
            HttpStatus::Information => "info",
            HttpStatus::Success => "success",
            HttpStatus::Redirect => "redirect",
            HttpStatus::ClientError => "clientError",
            HttpStatus::ServerError => "serverError",
            HttpStatus::NonError => "nonError",
            HttpStatus::Error => "error",
            HttpStatus::StatusCodes(_) => "statusCodes",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "info" | "information" => Some(HttpStatus::Information),
            "success" => Some(HttpStatus::Success),
            "redirect" => Some(HttpStatus::Redirect),
            "clientError" => Some(HttpStatus::ClientError),
            "serverError" => Some(HttpStatus::ServerError),
            "nonError" => Some(HttpStatus::NonError),
            "error" => Some(HttpStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpStatus::StatusCodes(codes) => write!(f, "one of {codes:?}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Rules and example value used by `eachKey`/`eachValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub value: String,
    pub rules: Vec<MatchingRule>,
}

/// One `arrayContains` variant: the expected element at `index` must be matched by some actual
/// element, using `rules` rooted at that element.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayContainsVariant {
    pub index: usize,
    pub rules: MatchingRuleCategory,
}

/// A single matching rule.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchingRule {
    Equality,
    Regex(RegexPattern),
    Type,
    MinType(usize),
    MaxType(usize),
    MinMaxType(usize, usize),
    Number(NumberKind),
    Date(String),
    Time(String),
    Timestamp(String),
    Include(String),
    Null,
    EqualsIgnoreOrder,
    MinEqualsIgnoreOrder(usize),
    MaxEqualsIgnoreOrder(usize),
    MinMaxEqualsIgnoreOrder(usize, usize),
    ContentType(String),
    StatusCode(HttpStatus),
    /// Wildcard keys: every actual key is compared against the expected template.
    Values,
    ArrayContains(Vec<ArrayContainsVariant>),
    Boolean,
    NotEmpty,
    Semver,
    EachKey(RuleDefinition),
    EachValue(RuleDefinition),
}

impl MatchingRule {
    /// Convenience constructor for [`MatchingRule::Regex`].
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(MatchingRule::Regex(RegexPattern::new(pattern)?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            MatchingRule::Equality => "equality",
            MatchingRule::Regex(_) => "regex",
            MatchingRule::Type => "type",
            MatchingRule::MinType(_) => "min-type",
            MatchingRule::MaxType(_) => "max-type",
            MatchingRule::MinMaxType(_, _) => "min-max-type",
            MatchingRule::Number(kind) => kind.as_str(),
            MatchingRule::Date(_) => "date",
            MatchingRule::Time(_) => "time",
            MatchingRule::Timestamp(_) => "timestamp",
            MatchingRule::Include(_) => "include",
            MatchingRule::Null => "null",
            MatchingRule::EqualsIgnoreOrder => "ignore-order",
            MatchingRule::MinEqualsIgnoreOrder(_) => "min-ignore-order",
            MatchingRule::MaxEqualsIgnoreOrder(_) => "max-ignore-order",
            MatchingRule::MinMaxEqualsIgnoreOrder(_, _) => "min-max-ignore-order",
            MatchingRule::ContentType(_) => "content-type",
            MatchingRule::StatusCode(_) => "status-code",
            MatchingRule::Values => "values",
            MatchingRule::ArrayContains(_) => "array-contains",
            MatchingRule::Boolean => "boolean",
            MatchingRule::NotEmpty => "not-empty",
            MatchingRule::Semver => "semver",
            MatchingRule::EachKey(_) => "each-key",
            MatchingRule::EachValue(_) => "each-value",
        }
    }

    pub fn is_values(&self) -> bool {
        matches!(self, MatchingRule::Values)
    }

    pub fn is_ignore_order(&self) -> bool {
        matches!(
            self,
            MatchingRule::EqualsIgnoreOrder
                | MatchingRule::MinEqualsIgnoreOrder(_)
                | MatchingRule::MaxEqualsIgnoreOrder(_)
                | MatchingRule::MinMaxEqualsIgnoreOrder(_, _)
        )
    }

    /// Rules that only constrain the shape of a value, not its content.
    pub fn is_type_matcher(&self) -> bool {
        matches!(
            self,
            MatchingRule::Type
                | MatchingRule::MinType(_)
                | MatchingRule::MaxType(_)
                | MatchingRule::MinMaxType(_, _)
                | MatchingRule::NotEmpty
        )
    }

    /// Rules that govern the key set of a map.
    pub fn is_collection_key_rule(&self) -> bool {
        matches!(
            self,
            MatchingRule::Values | MatchingRule::EachKey(_) | MatchingRule::EachValue(_)
        )
    }

    /// Whether this rule can be applied to a whole body of the given content type.
    pub fn can_match(&self, content_type: &ContentType) -> bool {
        match self {
            MatchingRule::ContentType(_) => true,
            MatchingRule::Equality | MatchingRule::Include(_) => !content_type.is_structured(),
            MatchingRule::Regex(_) => content_type.is_binary(),
            _ => false,
        }
    }
}

/// How the results of the rules in a group are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleLogic {
    /// Every rule's mismatches are kept.
    #[default]
    And,
    /// No mismatches if any single rule produces none.
    Or,
}

impl RuleLogic {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleLogic::And => "AND",
            RuleLogic::Or => "OR",
        }
    }
}

/// Ordered rules registered at one location.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchingRuleGroup {
    pub rules: Vec<MatchingRule>,
    pub logic: RuleLogic,
    /// Set when the group was selected through an ancestor path rather than directly.
    pub cascaded: bool,
}

impl MatchingRuleGroup {
    pub fn new(rules: Vec<MatchingRule>, logic: RuleLogic) -> Self {
        MatchingRuleGroup {
            rules,
            logic,
            cascaded: false,
        }
    }

    pub fn single(rule: MatchingRule) -> Self {
        MatchingRuleGroup::new(vec![rule], RuleLogic::And)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn has_values_rule(&self) -> bool {
        self.rules.iter().any(MatchingRule::is_values)
    }

    pub fn can_match(&self, content_type: &ContentType) -> bool {
        !self.rules.is_empty() && self.rules.iter().all(|r| r.can_match(content_type))
    }
}

/// Comparison domain a category of rules applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Body,
    Header,
    Query,
    Path,
    Status,
    Metadata,
    Contents,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Body => "body",
            Category::Header => "header",
            Category::Query => "query",
            Category::Path => "path",
            Category::Status => "status",
            Category::Metadata => "metadata",
            Category::Contents => "content",
        }
    }

    /// Categories whose rules are keyed by path or name. `path` and `status` hold one group.
    pub fn requires_subkeys(&self) -> bool {
        !matches!(self, Category::Path | Category::Status)
    }

    /// Categories whose keys are path expressions evaluated against structured bodies.
    pub fn is_structured(&self) -> bool {
        matches!(self, Category::Body | Category::Contents)
    }
}

impl FromStr for Category {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "body" => Ok(Category::Body),
            "header" | "headers" => Ok(Category::Header),
            "query" => Ok(Category::Query),
            "path" => Ok(Category::Path),
            "status" => Ok(Category::Status),
            "metadata" | "metaData" => Ok(Category::Metadata),
            "content" | "contents" => Ok(Category::Contents),
            other => Err(MatchError::rule(format!(
                "unknown matching rule category '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules for one comparison domain, keyed by path expression (body) or name (header, query).
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingRuleCategory {
    pub name: Category,
    pub rules: IndexMap<String, MatchingRuleGroup>,
}

impl MatchingRuleCategory {
    pub fn new(name: Category) -> Self {
        MatchingRuleCategory {
            name,
            rules: IndexMap::new(),
        }
    }

    pub fn empty(name: Category) -> Self {
        MatchingRuleCategory::new(name)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.values().all(MatchingRuleGroup::is_empty)
    }

    /// Append `rule` to the group at `key`, creating it with AND logic if needed.
    pub fn add_rule(&mut self, key: impl Into<String>, rule: MatchingRule) -> &mut Self {
        self.rules
            .entry(key.into())
            .or_default()
            .rules
            .push(rule);
        self
    }

    /// Replace the group at `key`.
    pub fn set_group(&mut self, key: impl Into<String>, group: MatchingRuleGroup) -> &mut Self {
        self.rules.insert(key.into(), group);
        self
    }

    pub fn with_rule(mut self, key: impl Into<String>, rule: MatchingRule) -> Self {
        self.add_rule(key, rule);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MatchingRuleGroup> {
        self.rules.get(key)
    }

    /// A copy holding only the entries accepted by `predicate`.
    pub fn filter<F>(&self, predicate: F) -> MatchingRuleCategory
    where
        F: Fn(&str, &MatchingRuleGroup) -> bool,
    {
        MatchingRuleCategory {
            name: self.name,
            rules: self
                .rules
                .iter()
                .filter(|(key, group)| predicate(key, group))
                .map(|(key, group)| (key.clone(), group.clone()))
                .collect(),
        }
    }

    /// A copy holding the rules registered under `prefix`, re-rooted at `new_root`.
    ///
    /// `$.part.name` with prefix `$.part` and root `$` becomes `$.name`.
    pub fn update_keys(&self, prefix: &str, new_root: &str) -> MatchingRuleCategory {
        let rules = self
            .rules
            .iter()
            .filter_map(|(key, group)| {
                let rest = key.strip_prefix(prefix)?;
                if rest.is_empty() || rest.starts_with('.') || rest.starts_with('[') {
                    Some((format!("{new_root}{rest}"), group.clone()))
                } else {
                    None
                }
            })
            .collect();
        MatchingRuleCategory {
            name: self.name,
            rules,
        }
    }

    /// All rules across every key.
    pub fn all_rules(&self) -> impl Iterator<Item = &MatchingRule> {
        self.rules.values().flat_map(|group| group.rules.iter())
    }
}

/// All rule categories of one expected interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchingRules {
    pub categories: IndexMap<Category, MatchingRuleCategory>,
}

impl MatchingRules {
    pub fn new() -> Self {
        MatchingRules::default()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(MatchingRuleCategory::is_empty)
    }

    pub fn category(&self, name: Category) -> Option<&MatchingRuleCategory> {
        self.categories.get(&name)
    }

    /// The category, or an empty one when none is defined.
    pub fn rules_for_category(&self, name: Category) -> Cow<'_, MatchingRuleCategory> {
        match self.categories.get(&name) {
            Some(category) => Cow::Borrowed(category),
            None => Cow::Owned(MatchingRuleCategory::empty(name)),
        }
    }

    pub fn add_category(&mut self, name: Category) -> &mut MatchingRuleCategory {
        self.categories
            .entry(name)
            .or_insert_with(|| MatchingRuleCategory::new(name))
    }

    pub fn add_rule(
        &mut self,
        category: Category,
        key: impl Into<String>,
        rule: MatchingRule,
    ) -> &mut Self {
        self.add_category(category).add_rule(key, rule);
        self
    }

    /// Builder form of [`MatchingRules::add_rule`].
    pub fn with_rule(mut self, category: Category, key: impl Into<String>, rule: MatchingRule) -> Self {
        self.add_rule(category, key, rule);
        self
    }
}
