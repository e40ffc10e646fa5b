//! Bodies with presence state.

use crate::content_type::ContentType;
use bytes::Bytes;
use std::fmt;

/// Whether a body was given at all, and how.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyState {
    /// No body was specified.
    #[default]
    Missing,
    /// The body was explicitly null.
    Null,
    /// A zero-length body.
    Empty,
    Present(Bytes),
}

/// A request, response or message body together with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionalBody {
    pub state: BodyState,
    pub content_type: Option<ContentType>,
}

impl OptionalBody {
    pub fn missing() -> Self {
        OptionalBody::default()
    }

    pub fn null() -> Self {
        OptionalBody {
            state: BodyState::Null,
            content_type: None,
        }
    }

    pub fn empty() -> Self {
        OptionalBody {
            state: BodyState::Empty,
            content_type: None,
        }
    }

    /// A body holding `bytes`. Zero bytes make an empty body.
    pub fn present(bytes: impl Into<Bytes>, content_type: Option<ContentType>) -> Self {
        let bytes = bytes.into();
        let state = if bytes.is_empty() {
            BodyState::Empty
        } else {
            BodyState::Present(bytes)
        };
        OptionalBody {
            state,
            content_type,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        OptionalBody::present(value.to_string(), Some(ContentType::json()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        OptionalBody::present(text.into(), Some(ContentType::text_plain()))
    }

    /// Read the `body` field of an interaction document.
    ///
    /// An absent field is a missing body and `null` a null body. Strings are taken verbatim with
    /// the declared type (sniffed when none is declared). Other values are serialized JSON.
    pub fn from_json_field(field: Option<&serde_json::Value>, content_type: Option<ContentType>) -> Self {
        match field {
            None => OptionalBody::missing(),
            Some(serde_json::Value::Null) => OptionalBody::null(),
            Some(serde_json::Value::String(text)) => OptionalBody::present(text.clone(), content_type),
            Some(other) => OptionalBody::present(
                other.to_string(),
                Some(content_type.unwrap_or_else(ContentType::json)),
            ),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.state, BodyState::Missing)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.state, BodyState::Null)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, BodyState::Empty)
    }

    pub fn is_present(&self) -> bool {
        matches!(self.state, BodyState::Present(_))
    }

    /// The body bytes. Missing, null and empty bodies have none.
    pub fn value(&self) -> &[u8] {
        match &self.state {
            BodyState::Present(bytes) => bytes,
            _ => &[],
        }
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn value_as_string(&self) -> String {
        String::from_utf8_lossy(self.value()).into_owned()
    }

    /// The declared content type, falling back to sniffing the body.
    pub fn detect_content_type(&self) -> Option<ContentType> {
        self.content_type
            .clone()
            .or_else(|| ContentType::sniff(self.value()))
    }

    /// Like [`OptionalBody::detect_content_type`], defaulting to `text/plain`.
    pub fn determine_content_type(&self) -> ContentType {
        self.detect_content_type()
            .unwrap_or_else(ContentType::text_plain)
    }

    /// Short description used in byte-comparison mismatches: content type, size and the first
    /// 32 bytes, hex encoded for binary types.
    pub fn preview(&self) -> String {
        let content_type = self.determine_content_type();
        let bytes = self.value();
        let head = &bytes[..bytes.len().min(32)];
        let start = if content_type.is_binary() {
            head.iter().map(|b| format!("{b:02x}")).collect::<String>()
        } else {
            String::from_utf8_lossy(head).into_owned()
        };
        format!(
            "{}, {} bytes, starting with {}",
            content_type,
            bytes.len(),
            start
        )
    }
}

impl fmt::Display for OptionalBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            BodyState::Missing => f.write_str("Missing"),
            BodyState::Null => f.write_str("Null"),
            BodyState::Empty => f.write_str("Empty"),
            BodyState::Present(_) => f.write_str(&self.value_as_string()),
        }
    }
}
