//! Response and message matching.

use crate::body::OptionalBody;
use crate::config::MatchingConfig;
use crate::content::match_body;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::Result;
use crate::mismatch::{Mismatch, StatusMismatch};
use crate::request::{multi_value_map, typed_body};
use crate::rules::{Category, MatchingRules};
use crate::scalar::{compare_message_metadata, match_headers};
use crate::value::MatchValue;
use indexmap::IndexMap;
use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

/// An HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: IndexMap<String, Vec<String>>,
    pub body: OptionalBody,
    pub matching_rules: MatchingRules,
}

impl Default for HttpResponse {
    fn default() -> Self {
        HttpResponse {
            status: 200,
            headers: IndexMap::new(),
            body: OptionalBody::missing(),
            matching_rules: MatchingRules::new(),
        }
    }
}

impl HttpResponse {
    /// Read `{"status": 200, "headers": {...}, "body": ..., "matchingRules": {...}}`.
    pub fn from_json(json: &Value) -> Result<HttpResponse> {
        let mut response = HttpResponse::default();
        let Some(fields) = json.as_object() else {
            warn!("{} is not a valid response, using defaults", json);
            return Ok(response);
        };

        if let Some(status) = fields.get("status") {
            match status.as_u64().and_then(|s| u16::try_from(s).ok()) {
                Some(status) => response.status = status,
                None => warn!("Ignoring invalid response status {}", status),
            }
        }
        response.headers = fields
            .get("headers")
            .map(|value| multi_value_map(value, "headers"))
            .unwrap_or_default();
        let content_type = crate::request::find_header(&response.headers, "content-type")
            .and_then(|values| values.first())
            .map(|value| value.parse::<ContentType>())
            .transpose()?;
        response.body = OptionalBody::from_json_field(fields.get("body"), content_type);
        response.matching_rules = fields
            .get("matchingRules")
            .map(MatchingRules::from_json)
            .transpose()?
            .unwrap_or_default();
        Ok(response)
    }

    /// The body labelled with the declared content type.
    pub fn typed_body(&self) -> Cow<'_, OptionalBody> {
        typed_body(&self.body, &self.headers)
    }
}

/// Compare status codes. A `status` rule such as a status class replaces equality.
pub fn match_status(expected: u16, actual: u16, context: &MatchingContext<'_>) -> Option<StatusMismatch> {
    let path: Vec<String> = Vec::new();
    if context.matcher_defined(&path) {
        debug!("Status rule defined, matching {} against {}", actual, expected);
        return context
            .domatch(&path, &MatchValue::Status(expected), &MatchValue::Status(actual))
            .into_iter()
            .next()
            .map(|mismatch| StatusMismatch {
                expected,
                actual,
                mismatch: Some(mismatch.message),
            });
    }

    (expected != actual).then_some(StatusMismatch {
        expected,
        actual,
        mismatch: None,
    })
}

/// Compare an actual response with an expected one using the default configuration.
pub fn match_response(expected: &HttpResponse, actual: &HttpResponse) -> Result<Vec<Mismatch>> {
    match_response_with_config(expected, actual, &MatchingConfig::default())
}

/// Status, then headers, then body. Unexpected body keys follow
/// [`MatchingConfig::response_allow_unexpected_keys`].
pub fn match_response_with_config(
    expected: &HttpResponse,
    actual: &HttpResponse,
    config: &MatchingConfig,
) -> Result<Vec<Mismatch>> {
    let rules = &expected.matching_rules;
    let mut mismatches: Vec<Mismatch> = Vec::new();

    let status_rules = rules.rules_for_category(Category::Status);
    let status_context = MatchingContext::new(&status_rules, false).with_config(config);
    mismatches.extend(match_status(expected.status, actual.status, &status_context).map(Mismatch::from));

    let header_rules = rules.rules_for_category(Category::Header);
    let header_context = MatchingContext::new(&header_rules, false)
        .with_config(config)
        .with_coerce_numbers(config.coerce_numbers_in_headers_and_query);
    mismatches.extend(
        match_headers(&expected.headers, &actual.headers, &header_context)
            .into_iter()
            .flat_map(|header| header.result)
            .map(Mismatch::from),
    );

    let body_rules = rules.rules_for_category(Category::Body);
    let body_context =
        MatchingContext::new(&body_rules, config.response_allow_unexpected_keys).with_config(config);
    mismatches.extend(match_body(&expected.typed_body(), &actual.typed_body(), &body_context)?.mismatches());

    Ok(mismatches)
}

/// An asynchronous message: contents plus metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Message {
    pub description: String,
    pub contents: OptionalBody,
    pub metadata: IndexMap<String, Value>,
    pub matching_rules: MatchingRules,
}

impl Message {
    /// Read `{"description": ..., "contents": ..., "metadata": {...}, "matchingRules": {...}}`.
    /// The `contentType` metadata entry types the contents.
    pub fn from_json(json: &Value) -> Result<Message> {
        let mut message = Message::default();
        let Some(fields) = json.as_object() else {
            warn!("{} is not a valid message, using defaults", json);
            return Ok(message);
        };

        message.description = fields
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        message.metadata = match fields.get("metadata") {
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Some(other) => {
                warn!("'metadata' must be an object, got {}", other);
                IndexMap::new()
            }
            None => IndexMap::new(),
        };
        let content_type = message
            .metadata_content_type()
            .map(|value| value.parse::<ContentType>())
            .transpose()?;
        message.contents = OptionalBody::from_json_field(fields.get("contents"), content_type);
        message.matching_rules = fields
            .get("matchingRules")
            .map(MatchingRules::from_json)
            .transpose()?
            .unwrap_or_default();
        Ok(message)
    }

    fn metadata_content_type(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(key, _)| {
                key.eq_ignore_ascii_case("contentType") || key.eq_ignore_ascii_case("content-type")
            })
            .and_then(|(_, value)| value.as_str())
    }

    /// The contents labelled with the content type from the metadata, when they carry none.
    pub fn typed_contents(&self) -> Cow<'_, OptionalBody> {
        match (&self.contents.content_type, self.metadata_content_type()) {
            (None, Some(value)) => match value.parse::<ContentType>() {
                Ok(content_type) => Cow::Owned(self.contents.clone().with_content_type(content_type)),
                Err(_) => Cow::Borrowed(&self.contents),
            },
            _ => Cow::Borrowed(&self.contents),
        }
    }
}

/// Compare an actual message with an expected one using the default configuration.
pub fn match_message(expected: &Message, actual: &Message) -> Result<Vec<Mismatch>> {
    match_message_with_config(expected, actual, &MatchingConfig::default())
}

/// Metadata, then contents. Contents rules come from the `content` category, falling back to `body`.
pub fn match_message_with_config(
    expected: &Message,
    actual: &Message,
    config: &MatchingConfig,
) -> Result<Vec<Mismatch>> {
    let rules = &expected.matching_rules;
    let mut mismatches: Vec<Mismatch> = Vec::new();

    let metadata_rules = rules.rules_for_category(Category::Metadata);
    let metadata_context = MatchingContext::new(&metadata_rules, true).with_config(config);
    mismatches.extend(
        compare_message_metadata(&expected.metadata, &actual.metadata, &metadata_context)
            .into_iter()
            .map(Mismatch::from),
    );

    let contents_rules = match rules.category(Category::Contents) {
        Some(category) if !category.is_empty() => Cow::Borrowed(category),
        _ => rules.rules_for_category(Category::Body),
    };
    let contents_context =
        MatchingContext::new(&contents_rules, config.response_allow_unexpected_keys).with_config(config);
    mismatches.extend(
        match_body(&expected.typed_contents(), &actual.typed_contents(), &contents_context)?.mismatches(),
    );

    Ok(mismatches)
}
