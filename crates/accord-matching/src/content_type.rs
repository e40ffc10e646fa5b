//! Content types: parsing, classification and sniffing.

use crate::error::{MatchError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static XML_DECLARATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*<\?xml\s*version").expect("static regex"));
static HTML_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*((?i)<!DOCTYPE html|<html)").expect("static regex"));
static JSON_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(true|false|null|-?[0-9]+|"\w*|\{\s*(\}|"\w+)|\[\s*)"#).expect("static regex")
});
static XML_ELEMENT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*<\w+\s*(:\w+=["”][^"”]+["”])?"#).expect("static regex"));

const SCHEMA_REGISTRY_JSON: &str = "vnd.schemaregistry.v1+json";

/// Magic prefixes for common binary formats.
const MAGIC_NUMBERS: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
];

/// A parsed `type/subtype; name=value` media type.
///
/// Type, subtype and parameter names are lower-cased. Parameter values keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    main_type: String,
    sub_type: String,
    parameters: IndexMap<String, String>,
}

impl ContentType {
    fn known(main_type: &str, sub_type: &str) -> ContentType {
        ContentType {
            main_type: main_type.to_string(),
            sub_type: sub_type.to_string(),
            parameters: IndexMap::new(),
        }
    }

    pub fn json() -> ContentType {
        ContentType::known("application", "json")
    }

    pub fn xml() -> ContentType {
        ContentType::known("application", "xml")
    }

    pub fn text_plain() -> ContentType {
        ContentType::known("text", "plain")
    }

    pub fn octet_stream() -> ContentType {
        ContentType::known("application", "octet-stream")
    }

    pub fn form_urlencoded() -> ContentType {
        ContentType::known("application", "x-www-form-urlencoded")
    }

    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// `type/subtype` without parameters.
    pub fn base_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// The generic type a specialised one falls back to, if any.
    pub fn supertype(&self) -> Option<ContentType> {
        match (self.main_type.as_str(), self.sub_type.as_str()) {
            (_, sub) if sub.ends_with("+json") => Some(ContentType::json()),
            (_, sub) if sub.ends_with("+xml") => Some(ContentType::xml()),
            ("application", "graphql") => Some(ContentType::json()),
            ("application", "x-www-form-urlencoded") => Some(ContentType::text_plain()),
            ("application", "protobuf") => Some(ContentType::octet_stream()),
            ("text", "javascript") => Some(ContentType::known("application", "javascript")),
            ("text", "plain") => None,
            ("text", _) => Some(ContentType::text_plain()),
            _ => None,
        }
    }

    pub fn is_json(&self) -> bool {
        if self.sub_type == SCHEMA_REGISTRY_JSON {
            return false;
        }
        self.sub_type.ends_with("json")
            || self
                .supertype()
                .is_some_and(|s| s.main_type == "application" && s.sub_type == "json")
    }

    pub fn is_schema_registry_json(&self) -> bool {
        self.sub_type == SCHEMA_REGISTRY_JSON
    }

    pub fn is_xml(&self) -> bool {
        self.sub_type.ends_with("xml")
    }

    pub fn is_form_urlencoded(&self) -> bool {
        self.main_type == "application" && self.sub_type == "x-www-form-urlencoded"
    }

    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    pub fn is_text(&self) -> bool {
        self.main_type == "text" || self.supertype().is_some_and(|s| s.main_type == "text")
    }

    /// Bodies whose content matcher walks a structure rather than comparing whole values.
    pub fn is_structured(&self) -> bool {
        self.is_json()
            || self.is_xml()
            || self.is_form_urlencoded()
            || self.is_multipart()
            || self.is_schema_registry_json()
    }

    pub fn is_binary(&self) -> bool {
        match self.main_type.as_str() {
            "text" => false,
            "image" | "audio" | "video" | "multipart" => true,
            "application" => !(self.is_json()
                || self.is_xml()
                || self.is_schema_registry_json()
                || self.is_text()
                || matches!(self.sub_type.as_str(), "javascript" | "graphql")),
            _ => false,
        }
    }

    /// Guess a content type from the leading bytes of a body.
    pub fn sniff(bytes: &[u8]) -> Option<ContentType> {
        if bytes.is_empty() {
            return None;
        }
        for (magic, content_type) in MAGIC_NUMBERS {
            if bytes.starts_with(magic) {
                return content_type.parse().ok();
            }
        }
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Some(ContentType::octet_stream());
        };
        let detected = if XML_DECLARATION.is_match(text) {
            ContentType::xml()
        } else if HTML_START.is_match(text) {
            ContentType::known("text", "html")
        } else if JSON_START.is_match(text) {
            ContentType::json()
        } else if XML_ELEMENT_START.is_match(text) {
            ContentType::xml()
        } else {
            ContentType::text_plain()
        };
        Some(detected)
    }
}

impl FromStr for ContentType {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        let (main_type, sub_type) = essence
            .split_once('/')
            .filter(|(main, sub)| !main.trim().is_empty() && !sub.trim().is_empty())
            .ok_or_else(|| MatchError::InvalidContentType(s.to_string()))?;

        let parameters = parts
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                let value = value.trim().trim_matches('"');
                Some((name.trim().to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Ok(ContentType {
            main_type: main_type.trim().to_ascii_lowercase(),
            sub_type: sub_type.trim().to_ascii_lowercase(),
            parameters,
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (name, value) in &self.parameters {
            write!(f, "; {name}={value}")?;
        }
        Ok(())
    }
}
