//! Mismatch taxonomy and per-part match results.
//!
//! Every disagreement found while comparing an interaction is reported as one [`Mismatch`]
//! variant. The body matchers group theirs by path into a [`BodyMatchResult`].

use crate::executor::RuleMismatch;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodMismatch {
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMismatch {
    pub expected: String,
    pub actual: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMismatch {
    pub expected: u16,
    pub actual: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMismatch {
    pub parameter: String,
    pub expected: String,
    pub actual: String,
    pub mismatch: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMismatch {
    pub key: String,
    pub expected: String,
    pub actual: String,
    pub mismatch: String,
}

impl HeaderMismatch {
    /// Combine two mismatches for the same header into one description.
    pub fn merge(self, other: HeaderMismatch) -> HeaderMismatch {
        let mismatch = if self.mismatch.is_empty() {
            other.mismatch
        } else {
            format!("{}, {}", self.mismatch, other.mismatch)
        };
        HeaderMismatch { mismatch, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CookieMismatch {
    pub expected: Vec<String>,
    pub actual: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyMismatch {
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub mismatch: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl BodyMismatch {
    pub fn new(
        expected: Option<String>,
        actual: Option<String>,
        mismatch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        BodyMismatch {
            expected,
            actual,
            mismatch: mismatch.into(),
            path: path.into(),
            diff: None,
        }
    }

    pub fn with_diff(mut self, diff: String) -> Self {
        self.diff = Some(diff);
        self
    }
}

impl From<RuleMismatch> for BodyMismatch {
    fn from(m: RuleMismatch) -> Self {
        BodyMismatch::new(m.expected, m.actual, m.message, m.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyTypeMismatch {
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataMismatch {
    pub key: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub mismatch: String,
}

impl MetadataMismatch {
    pub fn merge(self, other: MetadataMismatch) -> MetadataMismatch {
        MetadataMismatch {
            mismatch: format!("{}, {}", self.mismatch, other.mismatch),
            ..self
        }
    }
}

/// A disagreement between an expected and an actual interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Mismatch {
    #[serde(rename = "MethodMismatch")]
    Method(MethodMismatch),
    #[serde(rename = "PathMismatch")]
    Path(PathMismatch),
    #[serde(rename = "StatusMismatch")]
    Status(StatusMismatch),
    #[serde(rename = "QueryMismatch")]
    Query(QueryMismatch),
    #[serde(rename = "HeaderMismatch")]
    Header(HeaderMismatch),
    #[serde(rename = "CookieMismatch")]
    Cookie(CookieMismatch),
    #[serde(rename = "BodyMismatch")]
    Body(BodyMismatch),
    #[serde(rename = "BodyTypeMismatch")]
    BodyType(BodyTypeMismatch),
    #[serde(rename = "MetadataMismatch")]
    Metadata(MetadataMismatch),
}

impl Mismatch {
    /// Human readable description.
    pub fn description(&self) -> String {
        match self {
            Mismatch::Method(m) => format!(
                "Expected a request method of '{}' but received '{}'",
                m.expected, m.actual
            ),
            Mismatch::Path(m) => match &m.mismatch {
                Some(mismatch) => mismatch.clone(),
                None => format!("Expected path '{}' but received '{}'", m.expected, m.actual),
            },
            Mismatch::Status(m) => match &m.mismatch {
                Some(mismatch) => mismatch.clone(),
                None => format!("expected status of {} but was {}", m.expected, m.actual),
            },
            Mismatch::Query(m) => m.mismatch.clone(),
            Mismatch::Header(m) => m.mismatch.clone(),
            Mismatch::Cookie(m) => format!(
                "Expected cookies '{}' but received '{}'",
                m.expected.join(", "),
                m.actual.join(", ")
            ),
            Mismatch::Body(m) => m.mismatch.clone(),
            Mismatch::BodyType(m) => format!(
                "Expected a response type of '{}' but the actual type was '{}'",
                m.expected, m.actual
            ),
            Mismatch::Metadata(m) => m.mismatch.clone(),
        }
    }

    /// Short name of the variant, e.g. `BodyMismatch`.
    pub fn kind(&self) -> &'static str {
        match self {
            Mismatch::Method(_) => "MethodMismatch",
            Mismatch::Path(_) => "PathMismatch",
            Mismatch::Status(_) => "StatusMismatch",
            Mismatch::Query(_) => "QueryMismatch",
            Mismatch::Header(_) => "HeaderMismatch",
            Mismatch::Cookie(_) => "CookieMismatch",
            Mismatch::Body(_) => "BodyMismatch",
            Mismatch::BodyType(_) => "BodyTypeMismatch",
            Mismatch::Metadata(_) => "MetadataMismatch",
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

macro_rules! mismatch_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(impl From<$ty> for Mismatch {
            fn from(m: $ty) -> Self {
                Mismatch::$variant(m)
            }
        })*
    };
}

mismatch_from! {
    Method => MethodMismatch,
    Path => PathMismatch,
    Status => StatusMismatch,
    Query => QueryMismatch,
    Header => HeaderMismatch,
    Cookie => CookieMismatch,
    Body => BodyMismatch,
    BodyType => BodyTypeMismatch,
    Metadata => MetadataMismatch,
}

/// Mismatches found at one body path. An empty list records a location that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BodyItemMatchResult {
    pub key: String,
    pub result: Vec<BodyMismatch>,
}

impl BodyItemMatchResult {
    pub fn new(key: impl Into<String>, result: Vec<BodyMismatch>) -> Self {
        BodyItemMatchResult {
            key: key.into(),
            result,
        }
    }

    pub fn single(key: impl Into<String>, mismatch: BodyMismatch) -> Self {
        BodyItemMatchResult::new(key, vec![mismatch])
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_empty()
    }
}

/// Outcome of comparing two bodies.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyMatchResult {
    pub type_mismatch: Option<BodyTypeMismatch>,
    pub body_results: Vec<BodyItemMatchResult>,
}

impl BodyMatchResult {
    pub fn ok() -> Self {
        BodyMatchResult::default()
    }

    pub fn from_items(body_results: Vec<BodyItemMatchResult>) -> Self {
        BodyMatchResult {
            type_mismatch: None,
            body_results,
        }
    }

    /// A single mismatch at the body root.
    pub fn root_mismatch(mismatch: BodyMismatch) -> Self {
        BodyMatchResult::from_items(vec![BodyItemMatchResult::single("$", mismatch)])
    }

    pub fn type_mismatch(mismatch: BodyTypeMismatch) -> Self {
        BodyMatchResult {
            type_mismatch: Some(mismatch),
            body_results: Vec::new(),
        }
    }

    /// Group loose mismatches by path, keeping first-seen order.
    pub fn grouped(mismatches: Vec<BodyMismatch>) -> Self {
        let mut groups: IndexMap<String, Vec<BodyMismatch>> = IndexMap::new();
        for mismatch in mismatches {
            groups.entry(mismatch.path.clone()).or_default().push(mismatch);
        }
        BodyMatchResult::from_items(
            groups
                .into_iter()
                .map(|(key, result)| BodyItemMatchResult::new(key, result))
                .collect(),
        )
    }

    pub fn matched_ok(&self) -> bool {
        self.type_mismatch.is_none() && self.body_results.iter().all(BodyItemMatchResult::is_ok)
    }

    pub fn body_mismatches(&self) -> impl Iterator<Item = &BodyMismatch> {
        self.body_results.iter().flat_map(|item| item.result.iter())
    }

    /// The type mismatch if there is one, otherwise every body mismatch.
    pub fn mismatches(&self) -> Vec<Mismatch> {
        match &self.type_mismatch {
            Some(type_mismatch) => vec![Mismatch::BodyType(type_mismatch.clone())],
            None => self.body_mismatches().cloned().map(Mismatch::Body).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(path: &str, message: &str) -> BodyMismatch {
        BodyMismatch::new(None, None, message, path)
    }

    #[test]
    fn test_header_merge() {
        let first = HeaderMismatch {
            key: "X".into(),
            expected: "a".into(),
            actual: "b".into(),
            mismatch: "one".into(),
        };
        let second = HeaderMismatch {
            mismatch: "two".into(),
            ..first.clone()
        };
        assert_eq!(first.merge(second).mismatch, "one, two");
    }

    #[test]
    fn test_descriptions() {
        let status = Mismatch::from(StatusMismatch {
            expected: 200,
            actual: 404,
            mismatch: None,
        });
        assert_eq!(status.description(), "expected status of 200 but was 404");
        let body_type = Mismatch::from(BodyTypeMismatch {
            expected: "application/json".into(),
            actual: "text/plain".into(),
        });
        assert_eq!(
            body_type.to_string(),
            "Expected a response type of 'application/json' but the actual type was 'text/plain'"
        );
    }

    #[test]
    fn test_grouping_preserves_order() {
        let result = BodyMatchResult::grouped(vec![
            body("$.b", "1"),
            body("$.a", "2"),
            body("$.b", "3"),
        ]);
        let keys: Vec<&str> = result.body_results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["$.b", "$.a"]);
        assert_eq!(result.body_results[0].result.len(), 2);
        assert!(!result.matched_ok());
    }

    #[test]
    fn test_type_mismatch_hides_body_results() {
        let mut result = BodyMatchResult::root_mismatch(body("$", "x"));
        result.type_mismatch = Some(BodyTypeMismatch {
            expected: "a/b".into(),
            actual: "c/d".into(),
        });
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].kind(), "BodyTypeMismatch");
    }

    #[test]
    fn test_serialized_tag() {
        let mismatch = Mismatch::from(body("$.a", "boom"));
        let json = serde_json::to_value(&mismatch).unwrap();
        assert_eq!(json["type"], "BodyMismatch");
        assert_eq!(json["mismatch"], "boom");
        assert_eq!(json["path"], "$.a");
    }

    #[test]
    fn test_empty_items_still_match() {
        let result = BodyMatchResult::from_items(vec![BodyItemMatchResult::new("$.a", vec![])]);
        assert!(result.matched_ok());
        assert!(result.mismatches().is_empty());
    }
}
