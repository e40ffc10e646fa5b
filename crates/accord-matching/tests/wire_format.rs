//! Matching rules survive a trip through the JSON wire format.

use accord_matching::rules::{ArrayContainsVariant, RuleDefinition};
use accord_matching::{
    Category, HttpStatus, MatchingRule, MatchingRuleCategory, MatchingRuleGroup, MatchingRules,
    NumberKind, RuleLogic,
};
use serde_json::json;

fn every_rule_kind() -> Vec<MatchingRule> {
    vec![
        MatchingRule::Equality,
        MatchingRule::regex("\\d{3}-[a-z]+").unwrap(),
        MatchingRule::Type,
        MatchingRule::MinType(1),
        MatchingRule::MaxType(5),
        MatchingRule::MinMaxType(1, 5),
        MatchingRule::Number(NumberKind::Number),
        MatchingRule::Number(NumberKind::Integer),
        MatchingRule::Number(NumberKind::Decimal),
        MatchingRule::Date("yyyy-MM-dd".to_string()),
        MatchingRule::Time("HH:mm:ss".to_string()),
        MatchingRule::Timestamp("yyyy-MM-dd'T'HH:mm:ss".to_string()),
        MatchingRule::Include("needle".to_string()),
        MatchingRule::Null,
        MatchingRule::EqualsIgnoreOrder,
        MatchingRule::MinEqualsIgnoreOrder(2),
        MatchingRule::MaxEqualsIgnoreOrder(4),
        MatchingRule::MinMaxEqualsIgnoreOrder(2, 4),
        MatchingRule::ContentType("image/png".to_string()),
        MatchingRule::StatusCode(HttpStatus::ClientError),
        MatchingRule::StatusCode(HttpStatus::StatusCodes(vec![200, 202])),
        MatchingRule::Values,
        MatchingRule::ArrayContains(vec![
            ArrayContainsVariant {
                index: 0,
                rules: MatchingRuleCategory::new(Category::Body).with_rule("$.id", MatchingRule::Type),
            },
            ArrayContainsVariant {
                index: 1,
                rules: MatchingRuleCategory::new(Category::Body),
            },
        ]),
        MatchingRule::Boolean,
        MatchingRule::NotEmpty,
        MatchingRule::Semver,
        MatchingRule::EachKey(RuleDefinition {
            value: "key".to_string(),
            rules: vec![MatchingRule::regex("[a-z]+").unwrap()],
        }),
        MatchingRule::EachValue(RuleDefinition {
            value: "value".to_string(),
            rules: vec![MatchingRule::Type],
        }),
    ]
}

#[test]
fn every_rule_kind_round_trips() {
    for rule in every_rule_kind() {
        let wire = rule.to_json();
        let parsed = MatchingRule::from_json(&wire).unwrap();
        assert_eq!(parsed, rule, "wire form {wire}");
    }
}

#[test]
fn category_round_trips_with_paths_and_logic() {
    let mut category = MatchingRuleCategory::new(Category::Body);
    for (index, rule) in every_rule_kind().into_iter().enumerate() {
        category.add_rule(format!("$.items[{index}]"), rule);
    }
    category.set_group(
        "$.either",
        MatchingRuleGroup::new(vec![MatchingRule::Null, MatchingRule::Type], RuleLogic::Or),
    );

    let parsed = MatchingRuleCategory::from_json(Category::Body, &category.to_json()).unwrap();
    assert_eq!(parsed, category);
    assert_eq!(parsed.get("$.either").unwrap().logic, RuleLogic::Or);
}

#[test]
fn all_categories_round_trip() {
    let rules = MatchingRules::new()
        .with_rule(Category::Body, "$.id", MatchingRule::Number(NumberKind::Integer))
        .with_rule(Category::Header, "X-Request-Id", MatchingRule::regex("[0-9a-f-]+").unwrap())
        .with_rule(Category::Query, "page", MatchingRule::Number(NumberKind::Integer))
        .with_rule(Category::Path, "", MatchingRule::regex("/orders/\\d+").unwrap())
        .with_rule(Category::Status, "", MatchingRule::StatusCode(HttpStatus::Success))
        .with_rule(Category::Metadata, "topic", MatchingRule::Include("orders".to_string()));

    let wire = rules.to_json();
    assert_eq!(
        wire["path"],
        json!({"matchers": [{"match": "regex", "regex": "/orders/\\d+"}], "combine": "AND"})
    );
    let parsed = MatchingRules::from_json(&wire).unwrap();
    assert_eq!(parsed, rules);
}
