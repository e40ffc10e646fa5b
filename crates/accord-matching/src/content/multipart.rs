//! `multipart/form-data` and `multipart/mixed` bodies.
//!
//! Parts are aligned by position. Each part's headers are compared, then its body is handed back
//! to content-type dispatch with the rules under `$.<part name>`.

use super::{match_body, ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::{MatchError, Result};
use crate::mismatch::{BodyItemMatchResult, BodyMatchResult, BodyMismatch};
use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Matcher for multipart bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartContentMatcher;

/// One decoded part.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyPart {
    /// Headers in order of appearance, names as received.
    pub headers: IndexMap<String, String>,
    pub body: Bytes,
}

impl BodyPart {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// The `name` parameter of the part's `Content-Disposition` header.
    pub fn name(&self) -> Option<String> {
        let disposition = self.header("Content-Disposition")?;
        disposition.split(';').skip(1).find_map(|parameter| {
            let (key, value) = parameter.split_once('=')?;
            (key.trim().eq_ignore_ascii_case("name"))
                .then(|| value.trim().trim_matches('"').to_string())
                .filter(|name| !name.is_empty())
        })
    }

    /// Declared content type, defaulting to `text/plain`.
    pub fn content_type(&self) -> ContentType {
        self.header("Content-Type")
            .and_then(|value| value.parse().ok())
            .unwrap_or_else(ContentType::text_plain)
    }

    fn to_body(&self) -> OptionalBody {
        OptionalBody::present(self.body.clone(), Some(self.content_type()))
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}

fn parse_part(raw: &[u8], side: &'static str) -> Result<BodyPart> {
    let (head, body) = if let Some(body) = raw.strip_prefix(b"\r\n") {
        (&raw[..0], body)
    } else if let Some(body) = raw.strip_prefix(b"\n") {
        (&raw[..0], body)
    } else if let Some(end) = find(raw, b"\r\n\r\n", 0) {
        (&raw[..end], &raw[end + 4..])
    } else if let Some(end) = find(raw, b"\n\n", 0) {
        (&raw[..end], &raw[end + 2..])
    } else if raw.is_empty() {
        (raw, raw)
    } else {
        return Err(MatchError::InvalidMultipart {
            side,
            message: "part has no header separator".to_string(),
        });
    };

    let mut headers = IndexMap::new();
    for line in String::from_utf8_lossy(head).lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (name, value) = line.split_once(':').ok_or_else(|| MatchError::InvalidMultipart {
            side,
            message: format!("malformed part header '{line}'"),
        })?;
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(BodyPart {
        headers,
        body: Bytes::copy_from_slice(body),
    })
}

/// Split a multipart body into its parts using the `boundary` parameter of `content_type`.
pub fn parse_multipart(body: &[u8], content_type: &ContentType, side: &'static str) -> Result<Vec<BodyPart>> {
    let boundary = content_type
        .parameter("boundary")
        .ok_or_else(|| MatchError::InvalidMultipart {
            side,
            message: format!("content type '{content_type}' has no boundary"),
        })?;
    let delimiter = format!("--{}", boundary.trim_matches('"'));
    let delimiter = delimiter.as_bytes();

    let mut position = find(body, delimiter, 0).ok_or_else(|| MatchError::InvalidMultipart {
        side,
        message: "boundary delimiter not found".to_string(),
    })?;
    let mut parts = Vec::new();
    loop {
        let mut start = position + delimiter.len();
        if body[start..].starts_with(b"--") {
            break;
        }
        if body[start..].starts_with(b"\r\n") {
            start += 2;
        } else if body[start..].starts_with(b"\n") {
            start += 1;
        }
        let next = find(body, delimiter, start).ok_or_else(|| MatchError::InvalidMultipart {
            side,
            message: "missing closing boundary".to_string(),
        })?;
        let mut end = next;
        if end >= start + 2 && &body[end - 2..end] == b"\r\n" {
            end -= 2;
        } else if end > start && body[end - 1] == b'\n' {
            end -= 1;
        }
        parts.push(parse_part(&body[start..end.max(start)], side)?);
        position = next;
    }
    Ok(parts)
}

impl MultipartContentMatcher {
    fn compare_headers(&self, path: &str, expected: &BodyPart, actual: &BodyPart) -> Vec<BodyMismatch> {
        let mut mismatches = Vec::new();
        for (name, expected_value) in &expected.headers {
            match actual.header(name) {
                Some(actual_value) if actual_value != expected_value.as_str() => mismatches.push(BodyMismatch::new(
                    Some(format!("{name}: {expected_value}")),
                    Some(format!("{name}: {actual_value}")),
                    format!(
                        "Expected a multipart header '{name}' with value '{expected_value}', but was '{actual_value}'"
                    ),
                    format!("{path}.{name}"),
                )),
                Some(_) => {}
                None if name.eq_ignore_ascii_case("Content-Type") => {
                    debug!("Ignoring missing Content-Type header");
                }
                None => mismatches.push(BodyMismatch::new(
                    Some(format!("{name}: {expected_value}")),
                    None,
                    format!("Expected a multipart header '{name}', but was missing"),
                    format!("{path}.{name}"),
                )),
            }
        }
        mismatches
    }

    fn compare_contents(
        &self,
        path: &str,
        expected: &BodyPart,
        actual: &BodyPart,
        context: &MatchingContext<'_>,
    ) -> Result<Vec<BodyMismatch>> {
        let expected_body = expected.to_body();
        let actual_body = actual.to_body();
        debug!(
            "Comparing multipart contents: {} -> {}",
            expected_body.determine_content_type(),
            actual_body.determine_content_type()
        );
        let part_context = context.extract_path(&format!("$.{path}"));
        let result = match_body(&expected_body, &actual_body, &part_context)?;
        let mut mismatches: Vec<BodyMismatch> = result
            .body_mismatches()
            .cloned()
            .map(|mut mismatch| {
                mismatch.path = format!("{path}{}", mismatch.path.strip_prefix('$').unwrap_or(&mismatch.path));
                mismatch
            })
            .collect();
        if let Some(type_mismatch) = result.type_mismatch {
            mismatches.push(BodyMismatch::new(
                Some(type_mismatch.expected.clone()),
                Some(type_mismatch.actual.clone()),
                format!(
                    "Expected a part with content type '{}' but the actual type was '{}'",
                    type_mismatch.expected, type_mismatch.actual
                ),
                path,
            ));
        }
        Ok(mismatches)
    }

    fn compare_parts(
        &self,
        expected: &[BodyPart],
        actual: &[BodyPart],
        context: &MatchingContext<'_>,
    ) -> Result<Vec<BodyItemMatchResult>> {
        debug!(
            "Comparing multiparts: expected has {} part(s), actual has {} part(s)",
            expected.len(),
            actual.len()
        );
        let mut result = Vec::new();
        if expected.len() != actual.len() {
            result.push(BodyItemMatchResult::single(
                "$",
                BodyMismatch::new(
                    Some(expected.len().to_string()),
                    Some(actual.len().to_string()),
                    format!(
                        "Expected a multipart message with {} part(s), but received one with {} part(s)",
                        expected.len(),
                        actual.len()
                    ),
                    "$",
                ),
            ));
        }

        for (index, (expected_part, actual_part)) in expected.iter().zip(actual).enumerate() {
            let path = expected_part.name().unwrap_or_else(|| index.to_string());
            let mut mismatches = self.compare_headers(&path, expected_part, actual_part);
            debug!("Comparing part {}: header mismatches {}", index, mismatches.len());
            let contents = self.compare_contents(&path, expected_part, actual_part, context)?;
            debug!("Comparing part {}: content mismatches {}", index, contents.len());
            mismatches.extend(contents);
            result.push(BodyItemMatchResult::new(path, mismatches));
        }
        Ok(result)
    }
}

impl ContentMatcher for MultipartContentMatcher {
    fn name(&self) -> &'static str {
        "multipart"
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
                "Expected a multipart body but was missing",
                "$",
            )));
        }
        if !expected.is_present() && !actual.is_present() {
            return Ok(BodyMatchResult::ok());
        }

        let expected_parts = parse_multipart(expected.value(), &expected.determine_content_type(), "expected")?;
        let actual_parts = parse_multipart(actual.value(), &actual.determine_content_type(), "actual")?;
        Ok(BodyMatchResult::from_items(self.compare_parts(
            &expected_parts,
            &actual_parts,
            context,
        )?))
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        let content_type: ContentType = match config.get("contentType").and_then(Value::as_str) {
            Some(value) => value.parse()?,
            None => "multipart/form-data".parse()?,
        };
        InteractionContents::from_config_text(config, content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Category, MatchingRule, MatchingRuleCategory};

    fn content_type() -> ContentType {
        "multipart/form-data; boundary=XYZ".parse().unwrap()
    }

    fn multipart(parts: &[(&str, &str, &str)]) -> OptionalBody {
        let mut body = String::new();
        for (name, part_type, contents) in parts {
            body.push_str("--XYZ\r\n");
            body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n"));
            body.push_str(&format!("Content-Type: {part_type}\r\n\r\n"));
            body.push_str(contents);
            body.push_str("\r\n");
        }
        body.push_str("--XYZ--\r\n");
        OptionalBody::present(body, Some(content_type()))
    }

    fn messages(expected: &OptionalBody, actual: &OptionalBody, rules: &MatchingRuleCategory) -> Vec<(String, String)> {
        let context = MatchingContext::new(rules, false);
        MultipartContentMatcher
            .match_body(expected, actual, &context)
            .unwrap()
            .body_mismatches()
            .map(|m| (m.path.clone(), m.mismatch.clone()))
            .collect()
    }

    #[test]
    fn test_parse_parts() {
        let body = multipart(&[("a", "text/plain", "hello"), ("b", "application/json", "{\"x\": 1}")]);
        let parts = parse_multipart(body.value(), &content_type(), "expected").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name().as_deref(), Some("a"));
        assert_eq!(&parts[0].body[..], b"hello");
        assert!(parts[1].content_type().is_json());
    }

    #[test]
    fn test_missing_boundary_is_an_input_error() {
        let err = parse_multipart(b"--XYZ\r\n", &"multipart/form-data".parse().unwrap(), "actual").unwrap_err();
        assert!(matches!(err, MatchError::InvalidMultipart { side: "actual", .. }));
    }

    #[test]
    fn test_part_count_mismatch() {
        let rules = MatchingRuleCategory::new(Category::Body);
        let expected = multipart(&[("a", "text/plain", "hello"), ("b", "text/plain", "x")]);
        let actual = multipart(&[("a", "text/plain", "hello")]);
        assert_eq!(
            messages(&expected, &actual, &rules),
            vec![(
                "$".to_string(),
                "Expected a multipart message with 2 part(s), but received one with 1 part(s)".to_string()
            )]
        );
    }

    #[test]
    fn test_part_contents_are_dispatched_by_content_type() {
        let rules = MatchingRuleCategory::new(Category::Body).with_rule("$.doc.id", MatchingRule::Type);
        let expected = multipart(&[("doc", "application/json", "{\"id\": 1}")]);
        let actual = multipart(&[("doc", "application/json", "{\"id\": 2}")]);
        assert!(messages(&expected, &actual, &rules).is_empty());

        let actual = multipart(&[("doc", "application/json", "{\"id\": \"2\"}")]);
        let found = messages(&expected, &actual, &rules);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "doc.id");
    }

    #[test]
    fn test_part_header_mismatch() {
        let rules = MatchingRuleCategory::new(Category::Body);
        let expected = multipart(&[("a", "text/plain", "hello")]);
        let actual = multipart(&[("a", "text/csv", "hello")]);
        let found = messages(&expected, &actual, &rules);
        assert_eq!(
            found[0].1,
            "Expected a multipart header 'Content-Type' with value 'text/plain', but was 'text/csv'"
        );
        assert_eq!(found[0].0, "a.Content-Type");
    }
}
