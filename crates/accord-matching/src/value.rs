//! Borrowed view over the values rules are applied to.
//!
//! JSON nodes, header and query strings, XML elements and text, status codes and raw bytes all
//! pass through the same executor, so it sees them as one [`MatchValue`].

use crate::content::xml::XmlElement;
use serde_json::Value;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy)]
pub enum MatchValue<'a> {
    /// No value at this location.
    Absent,
    Json(&'a Value),
    /// Header, query, path and metadata values. Numeric rules accept these only when coercion is on.
    Str(&'a str),
    /// XML text and attribute values. Numeric rules always try to read these as numbers.
    Text(&'a str),
    List(&'a [String]),
    Element(&'a XmlElement),
    /// Every instance of one child element name under a parent.
    Siblings(&'a [&'a XmlElement]),
    Status(u16),
    Bytes(&'a [u8]),
}

impl<'a> MatchValue<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, MatchValue::Absent | MatchValue::Json(Value::Null))
    }

    /// The value as plain text. An absent value is the empty string.
    pub fn to_text(&self) -> Cow<'a, str> {
        match *self {
            MatchValue::Absent | MatchValue::Json(Value::Null) => Cow::Borrowed(""),
            MatchValue::Json(Value::String(s)) => Cow::Borrowed(s.as_str()),
            MatchValue::Json(other) => Cow::Owned(other.to_string()),
            MatchValue::Str(s) | MatchValue::Text(s) => Cow::Borrowed(s),
            MatchValue::List(items) => Cow::Owned(format!("[{}]", items.join(", "))),
            MatchValue::Element(element) => Cow::Owned(element.text_content()),
            MatchValue::Siblings(elements) => Cow::Owned(
                elements
                    .iter()
                    .map(|e| e.text_content())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            MatchValue::Status(status) => Cow::Owned(status.to_string()),
            MatchValue::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// The value as it appears in mismatch messages.
    pub fn describe(&self) -> String {
        match self {
            MatchValue::Absent => "null".to_string(),
            MatchValue::Json(Value::String(s)) => format!("'{s}'"),
            MatchValue::Json(other) => other.to_string(),
            MatchValue::Str(s) | MatchValue::Text(s) => format!("'{s}'"),
            MatchValue::List(items) => format!("[{}]", items.join(", ")),
            MatchValue::Element(element) => format!("<{}>", element.name),
            MatchValue::Siblings(elements) => describe_siblings(elements),
            MatchValue::Status(status) => status.to_string(),
            MatchValue::Bytes(bytes) => format!("{bytes:?}"),
        }
    }

    /// Rendering stored on a mismatch record. `None` for an absent value.
    pub fn render(&self) -> Option<String> {
        match self {
            MatchValue::Absent => None,
            MatchValue::Json(value) => Some(value.to_string()),
            MatchValue::Element(element) => Some(format!("<{}>", element.name)),
            MatchValue::Siblings(elements) => Some(describe_siblings(elements)),
            other => Some(other.to_text().into_owned()),
        }
    }

    pub fn type_name(&self) -> String {
        let name = match self {
            MatchValue::Absent | MatchValue::Json(Value::Null) => "Null",
            MatchValue::Json(Value::Bool(_)) => "Boolean",
            MatchValue::Json(Value::Number(_)) => "Number",
            MatchValue::Json(Value::String(_)) | MatchValue::Str(_) => "String",
            MatchValue::Json(Value::Array(_)) | MatchValue::List(_) | MatchValue::Siblings(_) => "Array",
            MatchValue::Json(Value::Object(_)) => "Object",
            MatchValue::Text(_) => "XmlText",
            MatchValue::Element(_) => "Element",
            MatchValue::Status(_) => "Integer",
            MatchValue::Bytes(bytes) => return format!("{} bytes", bytes.len()),
        };
        name.to_string()
    }

    /// Size of list-like values. Sibling XML elements count their instances.
    pub fn collection_len(&self) -> Option<usize> {
        match self {
            MatchValue::Json(Value::Array(items)) => Some(items.len()),
            MatchValue::List(items) => Some(items.len()),
            MatchValue::Siblings(elements) => Some(elements.len()),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            MatchValue::Json(Value::Array(_))
                | MatchValue::Json(Value::Object(_))
                | MatchValue::List(_)
                | MatchValue::Siblings(_)
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            MatchValue::Json(Value::String(_)) | MatchValue::Str(_) | MatchValue::Text(_)
        )
    }

    pub fn is_number(&self) -> bool {
        matches!(self, MatchValue::Json(Value::Number(_)) | MatchValue::Status(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, MatchValue::Json(Value::Bool(_)))
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            MatchValue::Json(Value::Array(_)) | MatchValue::List(_) | MatchValue::Siblings(_)
        )
    }

    pub fn is_object(&self) -> bool {
        matches!(self, MatchValue::Json(Value::Object(_)))
    }

    /// Whether an empty string, list, map or byte sequence.
    pub fn is_empty(&self) -> bool {
        match self {
            MatchValue::Json(Value::String(s)) => s.is_empty(),
            MatchValue::Json(Value::Array(items)) => items.is_empty(),
            MatchValue::Json(Value::Object(map)) => map.is_empty(),
            MatchValue::Str(s) | MatchValue::Text(s) => s.is_empty(),
            MatchValue::List(items) => items.is_empty(),
            MatchValue::Siblings(elements) => elements.is_empty(),
            MatchValue::Bytes(bytes) => bytes.is_empty(),
            _ => false,
        }
    }
}

fn describe_siblings(elements: &[&XmlElement]) -> String {
    let names: Vec<String> = elements.iter().map(|e| format!("<{}>", e.name)).collect();
    format!("[{}]", names.join(", "))
}

impl<'a> From<&'a Value> for MatchValue<'a> {
    fn from(value: &'a Value) -> Self {
        MatchValue::Json(value)
    }
}

impl<'a> From<Option<&'a Value>> for MatchValue<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map_or(MatchValue::Absent, MatchValue::Json)
    }
}

impl<'a> From<&'a str> for MatchValue<'a> {
    fn from(value: &'a str) -> Self {
        MatchValue::Str(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe_quotes_strings() {
        let value = json!("abc");
        assert_eq!(MatchValue::Json(&value).describe(), "'abc'");
        assert_eq!(MatchValue::Str("x").describe(), "'x'");
        assert_eq!(MatchValue::Absent.describe(), "null");
        let number = json!(12);
        assert_eq!(MatchValue::Json(&number).describe(), "12");
    }

    #[test]
    fn test_to_text_of_absent_is_empty() {
        assert_eq!(MatchValue::Absent.to_text(), "");
        let value = json!(true);
        assert_eq!(MatchValue::Json(&value).to_text(), "true");
    }

    #[test]
    fn test_type_names() {
        let list = json!([1]);
        assert_eq!(MatchValue::Json(&list).type_name(), "Array");
        assert_eq!(MatchValue::Bytes(&[1, 2]).type_name(), "2 bytes");
        assert_eq!(MatchValue::Absent.type_name(), "Null");
    }

    #[test]
    fn test_collection_len() {
        let list = json!([1, 2, 3]);
        assert_eq!(MatchValue::Json(&list).collection_len(), Some(3));
        let values = vec!["a".to_string()];
        assert_eq!(MatchValue::List(&values).collection_len(), Some(1));
        assert_eq!(MatchValue::Str("a").collection_len(), None);
    }
}
