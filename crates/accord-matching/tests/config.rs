//! Configuration loaded from YAML changes how bodies are matched.

use accord_matching::{
    match_body, match_request_with_config, Category, ContentOverride, ContentType, HttpRequest,
    LogFormat, MatchingConfig, MatchingContext, MatchingRuleCategory, OptionalBody,
};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

fn thing_body(text: &str) -> OptionalBody {
    let content_type: ContentType = "application/x-thing".parse().unwrap();
    OptionalBody::present(text.to_string(), Some(content_type))
}

#[test]
fn yaml_config_is_loaded() {
    let file = write_config(
        "content_type_overrides:\n  application/x-thing: json\nrequest_allow_unexpected_keys: true\nlogging:\n  level: warn\n  format: json\n",
    );
    let config = MatchingConfig::from_file(file.path()).unwrap();
    assert!(config.request_allow_unexpected_keys);
    assert!(config.response_allow_unexpected_keys);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(
        config.content_type_overrides.get("application/x-thing"),
        Some(&ContentOverride::Json)
    );
}

#[test]
fn invalid_configs_are_rejected() {
    let bad_level = write_config("logging:\n  level: chatty\n");
    assert!(MatchingConfig::from_file(bad_level.path()).is_err());

    let with_parameters = write_config("content_type_overrides:\n  \"text/x-thing; charset=utf-8\": text\n");
    assert!(MatchingConfig::from_file(with_parameters.path()).is_err());

    let bad_kind = write_config("content_type_overrides:\n  application/x-thing: yaml\n");
    assert!(MatchingConfig::from_file(bad_kind.path()).is_err());
}

#[test]
fn override_selects_the_json_matcher() {
    let rules = MatchingRuleCategory::new(Category::Body);
    let expected = thing_body(r#"{"a": 1, "b": [1, 2]}"#);
    let actual = thing_body(r#"{"b": [1, 2], "a": 1}"#);

    let raw = MatchingContext::new(&rules, false);
    let result = match_body(&expected, &actual, &raw).unwrap();
    assert!(!result.matched_ok(), "raw bytes differ");

    let file = write_config("content_type_overrides:\n  application/x-thing: json\n");
    let config = MatchingConfig::from_file(file.path()).unwrap();
    let context = MatchingContext::new(&rules, false).with_config(&config);
    let result = match_body(&expected, &actual, &context).unwrap();
    assert!(result.matched_ok(), "{:?}", result.mismatches());
}

#[test]
fn request_policy_follows_config() {
    let expected = HttpRequest::from_json(&json!({
        "method": "POST",
        "path": "/things",
        "headers": {"Content-Type": "application/json"},
        "body": {"a": 1}
    }))
    .unwrap();
    let actual = HttpRequest::from_json(&json!({
        "method": "POST",
        "path": "/things",
        "headers": {"Content-Type": "application/json"},
        "body": {"a": 1, "extra": true}
    }))
    .unwrap();

    let strict = MatchingConfig::default();
    let result = match_request_with_config(&expected, &actual, &strict).unwrap();
    assert_eq!(result.mismatches().len(), 1);

    let file = write_config("request_allow_unexpected_keys: true\n");
    let lenient = MatchingConfig::from_file(file.path()).unwrap();
    let result = match_request_with_config(&expected, &actual, &lenient).unwrap();
    assert!(result.matched_ok(), "{:?}", result.mismatches());
}
