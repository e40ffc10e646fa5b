//! Request matching and candidate selection.
//!
//! [`match_request`] compares one actual request against one expected request, dimension by
//! dimension. [`match_interaction`] runs that comparison against every candidate interaction and
//! reduces the outcomes with [`RequestMatch::merge`] to pick the best one.

use crate::body::OptionalBody;
use crate::config::MatchingConfig;
use crate::content::match_body;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::{MatchError, Result};
use crate::mismatch::{
    BodyMatchResult, CookieMismatch, MethodMismatch, Mismatch, PathMismatch,
};
use crate::response::HttpResponse;
use crate::rules::{Category, MatchingRules};
use crate::scalar::query::parse_query_string;
use crate::scalar::{match_headers, match_query, HeaderMatchResult, QueryMatchResult};
use crate::value::MatchValue;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

static SCHEME_AND_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^/]*").expect("static regex"));

const COOKIE_HEADER: &str = "cookie";

/// An HTTP request, either the expected one from a contract or the one actually received.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: IndexMap<String, Vec<String>>,
    pub headers: IndexMap<String, Vec<String>>,
    pub body: OptionalBody,
    pub matching_rules: MatchingRules,
}

impl Default for HttpRequest {
    fn default() -> Self {
        HttpRequest {
            method: "GET".to_string(),
            path: "/".to_string(),
            query: IndexMap::new(),
            headers: IndexMap::new(),
            body: OptionalBody::missing(),
            matching_rules: MatchingRules::new(),
        }
    }
}

impl HttpRequest {
    /// Values of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&Vec<String>> {
        find_header(&self.headers, name)
    }

    /// The declared content type: the body's own, then the `Content-Type` header.
    pub fn content_type(&self) -> Option<ContentType> {
        self.body
            .content_type
            .clone()
            .or_else(|| declared_content_type(&self.headers))
    }

    /// Every `name=value` entry of the `Cookie` headers.
    pub fn cookies(&self) -> Vec<String> {
        self.header(COOKIE_HEADER)
            .map(|values| {
                values
                    .iter()
                    .flat_map(|value| value.split(';'))
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The headers without `Cookie`, which is compared on its own.
    pub fn headers_without_cookie(&self) -> IndexMap<String, Vec<String>> {
        self.headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case(COOKIE_HEADER))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect()
    }

    /// The body labelled with the declared content type.
    pub fn typed_body(&self) -> Cow<'_, OptionalBody> {
        typed_body(&self.body, &self.headers)
    }

    /// Read a request document:
    ///
    /// ```json
    /// {"method": "POST", "path": "/orders", "query": "a=1", "headers": {"Content-Type": "application/json"},
    ///  "body": {"id": 1}, "matchingRules": {"body": {"$.id": {"matchers": [{"match": "type"}]}}}}
    /// ```
    ///
    /// `query` may also be an object of names to a value or a list of values. Header values may be
    /// a string or a list of strings.
    pub fn from_json(json: &Value) -> Result<HttpRequest> {
        let mut request = HttpRequest::default();
        let Some(fields) = json.as_object() else {
            warn!("{} is not a valid request, using defaults", json);
            return Ok(request);
        };

        if let Some(method) = fields.get("method").and_then(Value::as_str) {
            request.method = method.to_uppercase();
        }
        if let Some(path) = fields.get("path").and_then(Value::as_str) {
            request.path = path.to_string();
        }
        request.query = match fields.get("query") {
            Some(Value::String(query)) => parse_query_string(query),
            Some(value) => multi_value_map(value, "query"),
            None => IndexMap::new(),
        };
        request.headers = fields
            .get("headers")
            .map(|value| multi_value_map(value, "headers"))
            .unwrap_or_default();
        request.body = OptionalBody::from_json_field(
            fields.get("body"),
            parse_declared_content_type(&request.headers)?,
        );
        request.matching_rules = fields
            .get("matchingRules")
            .map(MatchingRules::from_json)
            .transpose()?
            .unwrap_or_default();
        Ok(request)
    }
}

pub(crate) fn find_header<'h>(
    headers: &'h IndexMap<String, Vec<String>>,
    name: &str,
) -> Option<&'h Vec<String>> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, values)| values)
}

pub(crate) fn declared_content_type(headers: &IndexMap<String, Vec<String>>) -> Option<ContentType> {
    find_header(headers, "content-type")
        .and_then(|values| values.first())
        .and_then(|value| value.parse().ok())
}

fn parse_declared_content_type(headers: &IndexMap<String, Vec<String>>) -> Result<Option<ContentType>> {
    find_header(headers, "content-type")
        .and_then(|values| values.first())
        .map(|value| value.parse::<ContentType>())
        .transpose()
}

pub(crate) fn typed_body<'b>(
    body: &'b OptionalBody,
    headers: &IndexMap<String, Vec<String>>,
) -> Cow<'b, OptionalBody> {
    match (&body.content_type, declared_content_type(headers)) {
        (None, Some(content_type)) => Cow::Owned(body.clone().with_content_type(content_type)),
        _ => Cow::Borrowed(body),
    }
}

/// Read an object of names to a string or a list of strings.
pub(crate) fn multi_value_map(json: &Value, field: &str) -> IndexMap<String, Vec<String>> {
    let Some(entries) = json.as_object() else {
        warn!("'{}' must be an object, got {}", field, json);
        return IndexMap::new();
    };
    entries
        .iter()
        .map(|(name, value)| {
            let values = match value {
                Value::Array(items) => items.iter().map(scalar_text).collect(),
                other => vec![scalar_text(other)],
            };
            (name.clone(), values)
        })
        .collect()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An expected request with the response the provider should send back.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interaction {
    pub description: String,
    pub request: HttpRequest,
    pub response: Option<HttpResponse>,
}

impl Interaction {
    pub fn from_json(json: &Value) -> Result<Interaction> {
        Ok(Interaction {
            description: json
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            request: json
                .get("request")
                .map(HttpRequest::from_json)
                .transpose()?
                .unwrap_or_default(),
            response: json.get("response").map(HttpResponse::from_json).transpose()?,
        })
    }
}

/// Read a list of interactions, given either as an array or as `{"interactions": [...]}`.
pub fn interactions_from_json(json: &Value) -> Result<Vec<Interaction>> {
    let items = match json {
        Value::Array(items) => items,
        Value::Object(fields) => match fields.get("interactions") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(MatchError::Config(
                    "expected an 'interactions' array".to_string(),
                ))
            }
        },
        other => {
            return Err(MatchError::Config(format!(
                "expected a list of interactions, got {other}"
            )))
        }
    };
    items.iter().map(Interaction::from_json).collect()
}

/// Outcome of comparing one actual request with one expected request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RequestMatchResult {
    pub method: Option<MethodMismatch>,
    pub path: Option<PathMismatch>,
    pub query: Vec<QueryMatchResult>,
    pub cookie: Option<CookieMismatch>,
    pub headers: Vec<HeaderMatchResult>,
    pub body: BodyMatchResult,
}

impl RequestMatchResult {
    pub fn matched_ok(&self) -> bool {
        self.matched_method_and_path()
            && self.query.iter().all(|q| q.result.is_empty())
            && self.cookie.is_none()
            && self.headers.iter().all(|h| h.result.is_empty())
            && self.body.matched_ok()
    }

    pub fn matched_method_and_path(&self) -> bool {
        self.method.is_none() && self.path.is_none()
    }

    /// +1 for every dimension that matched and -1 for every one that did not. Query parameters,
    /// headers and body paths count individually. A body type mismatch counts once.
    pub fn calculate_score(&self) -> i32 {
        fn point(matched: bool) -> i32 {
            if matched {
                1
            } else {
                -1
            }
        }

        let mut score = point(self.method.is_none()) + point(self.path.is_none());
        score += self.query.iter().map(|q| point(q.result.is_empty())).sum::<i32>();
        score += point(self.cookie.is_none());
        score += self.headers.iter().map(|h| point(h.result.is_empty())).sum::<i32>();
        score += match self.body.type_mismatch {
            Some(_) => -1,
            None => self.body.body_results.iter().map(|b| point(b.is_ok())).sum(),
        };
        score
    }

    /// Every mismatch, in the order method, path, query, cookie, headers, body.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        let mut mismatches: Vec<Mismatch> = Vec::new();
        mismatches.extend(self.method.clone().map(Mismatch::from));
        mismatches.extend(self.path.clone().map(Mismatch::from));
        mismatches.extend(
            self.query
                .iter()
                .flat_map(|q| q.result.iter().cloned().map(Mismatch::from)),
        );
        mismatches.extend(self.cookie.clone().map(Mismatch::from));
        mismatches.extend(
            self.headers
                .iter()
                .flat_map(|h| h.result.iter().cloned().map(Mismatch::from)),
        );
        mismatches.extend(self.body.mismatches());
        mismatches
    }
}

/// One candidate interaction with the result of comparing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch<'a> {
    pub interaction: &'a Interaction,
    pub result: RequestMatchResult,
    pub score: i32,
}

/// Verdict of comparing an actual request against candidate interactions.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestMatch<'a> {
    /// Every dimension matched.
    Full(CandidateMatch<'a>),
    /// Method and path matched, something else did not.
    Partial(CandidateMatch<'a>),
    /// No candidate matched method and path. Holds every candidate that was compared.
    NoMatch(Vec<CandidateMatch<'a>>),
}

impl<'a> RequestMatch<'a> {
    /// Classify one comparison.
    pub fn from_result(interaction: &'a Interaction, result: RequestMatchResult) -> Self {
        let score = result.calculate_score();
        let candidate = CandidateMatch {
            interaction,
            result,
            score,
        };
        if candidate.result.matched_ok() {
            RequestMatch::Full(candidate)
        } else if candidate.result.matched_method_and_path() {
            RequestMatch::Partial(candidate)
        } else {
            RequestMatch::NoMatch(vec![candidate])
        }
    }

    /// Keep the better verdict. Full beats Partial beats NoMatch. Within a class the higher score
    /// wins and equal scores keep `self`. Associative, so candidates can be reduced in any grouping.
    pub fn merge(self, other: RequestMatch<'a>) -> RequestMatch<'a> {
        use RequestMatch::{Full, NoMatch, Partial};
        match (self, other) {
            (Full(a), Full(b)) => Full(if b.score > a.score { b } else { a }),
            (Full(a), _) | (_, Full(a)) => Full(a),
            (Partial(a), Partial(b)) => Partial(if b.score > a.score { b } else { a }),
            (Partial(a), NoMatch(_)) | (NoMatch(_), Partial(a)) => Partial(a),
            (NoMatch(mut a), NoMatch(b)) => {
                a.extend(b);
                NoMatch(a)
            }
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, RequestMatch::Full(_))
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, RequestMatch::Partial(_))
    }

    /// The selected candidate, if any reached at least a partial match.
    pub fn selected(&self) -> Option<&CandidateMatch<'a>> {
        match self {
            RequestMatch::Full(candidate) | RequestMatch::Partial(candidate) => Some(candidate),
            RequestMatch::NoMatch(_) => None,
        }
    }
}

/// Methods compare case-insensitively.
pub fn match_method(expected: &str, actual: &str) -> Option<MethodMismatch> {
    if expected.eq_ignore_ascii_case(actual) {
        None
    } else {
        Some(MethodMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Compare paths. A leading `scheme://host` on the actual path is ignored. Without a path rule,
/// the actual path must equal the expected one or fully match it read as a regular expression.
pub fn match_path(expected: &str, actual: &str, context: &MatchingContext<'_>) -> Option<PathMismatch> {
    let actual = SCHEME_AND_HOST.replace(actual, "");
    let path: Vec<String> = Vec::new();
    if context.matcher_defined(&path) {
        debug!("Path rule defined, matching '{}' against '{}'", actual, expected);
        return context
            .domatch(&path, &MatchValue::Str(expected), &MatchValue::Str(&actual))
            .into_iter()
            .next()
            .map(|mismatch| PathMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                mismatch: Some(mismatch.message),
            });
    }

    let matches = expected == actual
        || Regex::new(&format!("^(?:{expected})$")).is_ok_and(|regex| regex.is_match(&actual));
    if matches {
        None
    } else {
        Some(PathMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
            mismatch: None,
        })
    }
}

/// Every expected cookie must be present in the actual cookies, in any order.
pub fn match_cookies(expected: &[String], actual: &[String]) -> Option<CookieMismatch> {
    if expected.iter().all(|cookie| actual.contains(cookie)) {
        None
    } else {
        Some(CookieMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        })
    }
}

/// Compare an actual request with an expected one using the default configuration.
pub fn match_request(expected: &HttpRequest, actual: &HttpRequest) -> Result<RequestMatchResult> {
    match_request_with_config(expected, actual, &MatchingConfig::default())
}

pub fn match_request_with_config(
    expected: &HttpRequest,
    actual: &HttpRequest,
    config: &MatchingConfig,
) -> Result<RequestMatchResult> {
    debug!("Comparing request {} {} to expected {} {}", actual.method, actual.path, expected.method, expected.path);
    let rules = &expected.matching_rules;

    let path_rules = rules.rules_for_category(Category::Path);
    let path_context = MatchingContext::new(&path_rules, false).with_config(config);

    let query_rules = rules.rules_for_category(Category::Query);
    let query_context = MatchingContext::new(&query_rules, false)
        .with_config(config)
        .with_coerce_numbers(config.coerce_numbers_in_headers_and_query);

    let header_rules = rules.rules_for_category(Category::Header);
    let header_context = MatchingContext::new(&header_rules, false)
        .with_config(config)
        .with_coerce_numbers(config.coerce_numbers_in_headers_and_query);

    let body_rules = rules.rules_for_category(Category::Body);
    let body_context =
        MatchingContext::new(&body_rules, config.request_allow_unexpected_keys).with_config(config);

    Ok(RequestMatchResult {
        method: match_method(&expected.method, &actual.method),
        path: match_path(&expected.path, &actual.path, &path_context),
        query: match_query(&expected.query, &actual.query, &query_context),
        cookie: match_cookies(&expected.cookies(), &actual.cookies()),
        headers: match_headers(
            &expected.headers_without_cookie(),
            &actual.headers_without_cookie(),
            &header_context,
        ),
        body: match_body(&expected.typed_body(), &actual.typed_body(), &body_context)?,
    })
}

/// Compare the actual request against every interaction in parallel and keep the best verdict.
pub fn match_interaction<'a>(interactions: &'a [Interaction], actual: &HttpRequest) -> Result<RequestMatch<'a>> {
    match_interaction_with_config(interactions, actual, &MatchingConfig::default())
}

pub fn match_interaction_with_config<'a>(
    interactions: &'a [Interaction],
    actual: &HttpRequest,
    config: &MatchingConfig,
) -> Result<RequestMatch<'a>> {
    interactions
        .par_iter()
        .map(|interaction| -> Result<RequestMatch<'a>> {
            let result = match_request_with_config(&interaction.request, actual, config)?;
            debug!(
                "Interaction '{}' scored {}",
                interaction.description,
                result.calculate_score()
            );
            Ok(RequestMatch::from_result(interaction, result))
        })
        .try_reduce(|| RequestMatch::NoMatch(Vec::new()), |a, b| Ok(a.merge(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchingRule;
    use serde_json::json;

    fn request(json: Value) -> HttpRequest {
        HttpRequest::from_json(&json).unwrap()
    }

    #[test]
    fn test_from_json() {
        let req = request(json!({
            "method": "post",
            "path": "/orders",
            "query": "a=1&a=2",
            "headers": {"Content-Type": "application/json", "Accept": ["a", "b"]},
            "body": {"id": 1},
            "matchingRules": {"body": {"$.id": {"matchers": [{"match": "type"}]}}}
        }));
        assert_eq!(req.method, "POST");
        assert_eq!(req.query["a"], vec!["1", "2"]);
        assert_eq!(req.headers["Accept"], vec!["a", "b"]);
        assert!(req.content_type().unwrap().is_json());
        assert!(req
            .matching_rules
            .category(Category::Body)
            .unwrap()
            .get("$.id")
            .is_some());
    }

    #[test]
    fn test_match_method_is_case_insensitive() {
        assert!(match_method("GET", "get").is_none());
        assert_eq!(
            match_method("GET", "POST"),
            Some(MethodMismatch {
                expected: "GET".into(),
                actual: "POST".into()
            })
        );
    }

    #[test]
    fn test_match_path() {
        let rules = MatchingRules::new();
        let path_rules = rules.rules_for_category(Category::Path);
        let context = MatchingContext::new(&path_rules, false);
        assert!(match_path("/orders", "http://localhost:8080/orders", &context).is_none());
        assert!(match_path("/orders/\\d+", "/orders/12", &context).is_none());
        assert!(match_path("/orders", "/orders/12", &context).is_some());

        let rules = MatchingRules::new().with_rule(Category::Path, "", MatchingRule::regex("/items/[a-z]+").unwrap());
        let path_rules = rules.rules_for_category(Category::Path);
        let context = MatchingContext::new(&path_rules, false);
        assert!(match_path("/items/abc", "/items/xyz", &context).is_none());
        let mismatch = match_path("/items/abc", "/items/123", &context).unwrap();
        assert_eq!(mismatch.mismatch.as_deref(), Some("Expected '/items/123' to match '/items/[a-z]+'"));
    }

    #[test]
    fn test_cookies_are_contained_in_any_order() {
        let expected = request(json!({"headers": {"Cookie": "a=1; b=2"}}));
        let actual = request(json!({"headers": {"cookie": "b=2;c=3; a=1"}}));
        assert!(match_cookies(&expected.cookies(), &actual.cookies()).is_none());
        let result = match_request(&expected, &actual).unwrap();
        assert!(result.matched_ok(), "{:?}", result.mismatches());

        let actual = request(json!({"headers": {"Cookie": "a=1"}}));
        let result = match_request(&expected, &actual).unwrap();
        assert!(result.cookie.is_some());
    }

    #[test]
    fn test_full_request_match_and_score() {
        let expected = request(json!({
            "method": "POST",
            "path": "/orders",
            "query": {"page": "1"},
            "headers": {"Content-Type": "application/json"},
            "body": {"id": 1, "name": "Alice"},
            "matchingRules": {"body": {"$.id": {"matchers": [{"match": "integer"}]}}}
        }));
        let actual = request(json!({
            "method": "POST",
            "path": "/orders",
            "query": {"page": "1"},
            "headers": {"content-type": "application/json; charset=utf-8"},
            "body": {"id": 99, "name": "Alice"}
        }));
        let result = match_request(&expected, &actual).unwrap();
        assert!(result.matched_ok(), "{:?}", result.mismatches());
        assert!(result.calculate_score() > 4);
    }

    #[test]
    fn test_unexpected_body_keys_fail_requests_by_default() {
        let expected = request(json!({"method": "POST", "path": "/", "body": {"a": 1}}));
        let actual = request(json!({"method": "POST", "path": "/", "body": {"a": 1, "b": 2}}));
        let result = match_request(&expected, &actual).unwrap();
        assert!(result.matched_method_and_path());
        assert!(!result.matched_ok());
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].kind(), "BodyMismatch");

        let config = MatchingConfig {
            request_allow_unexpected_keys: true,
            ..MatchingConfig::default()
        };
        assert!(match_request_with_config(&expected, &actual, &config).unwrap().matched_ok());
    }

    #[test]
    fn test_body_type_mismatch_scores_once() {
        let expected = request(json!({
            "headers": {"Content-Type": "application/json"},
            "body": {"a": 1}
        }));
        let actual = request(json!({
            "headers": {"Content-Type": "application/xml"},
            "body": "<a>1</a>"
        }));
        let result = match_request(&expected, &actual).unwrap();
        assert!(result.body.type_mismatch.is_some());
        assert_eq!(result.mismatches().last().unwrap().kind(), "BodyTypeMismatch");
        // method, path and cookie match, the content type header and the body do not
        assert_eq!(result.calculate_score(), 3 - 1 - 1);
    }

    #[test]
    fn test_invalid_json_body_is_an_error() {
        let expected = request(json!({"headers": {"Content-Type": "application/json"}, "body": "{\"a\": 1}"}));
        let actual = request(json!({"headers": {"Content-Type": "application/json"}, "body": "{not json"}));
        assert!(matches!(
            match_request(&expected, &actual),
            Err(MatchError::InvalidJson { side: "actual", .. })
        ));
    }

    fn interaction(description: &str, json: Value) -> Interaction {
        Interaction {
            description: description.to_string(),
            request: request(json),
            response: None,
        }
    }

    #[test]
    fn test_full_match_beats_partial_match_regardless_of_score() {
        let interactions = vec![
            interaction(
                "partial with many headers",
                json!({"method": "GET", "path": "/a", "headers": {"A": "1", "B": "2", "C": "3", "D": "x"}}),
            ),
            interaction("full", json!({"method": "GET", "path": "/a"})),
        ];
        let actual = request(json!({"method": "GET", "path": "/a", "headers": {"A": "1", "B": "2", "C": "3", "D": "y"}}));
        let result = match_interaction(&interactions, &actual).unwrap();
        assert!(result.is_full());
        assert_eq!(result.selected().unwrap().interaction.description, "full");
    }

    #[test]
    fn test_no_match_keeps_every_candidate() {
        let interactions = vec![
            interaction("a", json!({"method": "GET", "path": "/a"})),
            interaction("b", json!({"method": "GET", "path": "/b"})),
        ];
        let actual = request(json!({"method": "DELETE", "path": "/c"}));
        match match_interaction(&interactions, &actual).unwrap() {
            RequestMatch::NoMatch(candidates) => {
                let names: Vec<&str> = candidates
                    .iter()
                    .map(|c| c.interaction.description.as_str())
                    .collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("expected no match, got {other:?}"),
        }
    }

    #[test]
    fn test_equal_scores_keep_the_earlier_candidate() {
        let interactions = vec![
            interaction("first", json!({"method": "GET", "path": "/a"})),
            interaction("second", json!({"method": "GET", "path": "/a"})),
        ];
        let actual = request(json!({"method": "GET", "path": "/a"}));
        let result = match_interaction(&interactions, &actual).unwrap();
        assert_eq!(result.selected().unwrap().interaction.description, "first");
    }

    #[test]
    fn test_interactions_from_json() {
        let interactions = interactions_from_json(&json!({
            "interactions": [
                {"description": "one", "request": {"path": "/1"}, "response": {"status": 201}},
                {"description": "two", "request": {"path": "/2"}}
            ]
        }))
        .unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0].response.as_ref().unwrap().status, 201);
        assert!(interactions[1].response.is_none());
        assert!(interactions_from_json(&json!("nope")).is_err());
    }
}
