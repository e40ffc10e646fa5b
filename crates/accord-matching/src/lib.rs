//! Rule-driven matching engine for consumer-driven contract tests.
//!
//! Given an expected interaction (example values plus path-scoped matching rules) and an actual
//! one observed at runtime, this crate decides whether the actual conforms and reports every
//! disagreement as a path-addressed [`Mismatch`]. It can be used as a library or through the
//! `accord-match` CLI binary.
//!
//! # Example
//!
//! ```
//! use accord_matching::{match_request, HttpRequest};
//! use serde_json::json;
//!
//! let expected = HttpRequest::from_json(&json!({
//!     "method": "POST",
//!     "path": "/orders",
//!     "headers": {"Content-Type": "application/json"},
//!     "body": {"id": 1, "name": "Alice"},
//!     "matchingRules": {"body": {"$.id": {"matchers": [{"match": "integer"}]}}}
//! }))
//! .unwrap();
//! let actual = HttpRequest::from_json(&json!({
//!     "method": "POST",
//!     "path": "/orders",
//!     "headers": {"Content-Type": "application/json"},
//!     "body": {"id": 42, "name": "Alice"}
//! }))
//! .unwrap();
//!
//! let result = match_request(&expected, &actual).unwrap();
//! assert!(result.matched_ok());
//! ```
//!
//! # Module Structure
//!
//! - `path_expr` - Path expressions and their weighting against concrete paths
//! - `rules` - Matching rule model and its JSON wire format
//! - `context` - Rule resolution for one comparison domain
//! - `executor` - Applies a rule group to one expected/actual pair
//! - `content` - Body matchers per content type, and body dispatch
//! - `scalar` - Header, query and metadata matchers
//! - `request` - Request matching, scoring and candidate selection
//! - `response` - Response and message matching
//! - `mismatch` - Mismatch types and per-part results
//! - `config` - YAML configuration
//! - `error` - Input errors

pub mod body;
pub mod config;
pub mod content;
pub mod content_type;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod mismatch;
pub mod path_expr;
pub mod request;
pub mod response;
pub mod rules;
pub mod scalar;
pub mod value;

pub use body::OptionalBody;
pub use config::{ContentOverride, LogFormat, LoggingConfig, MatchingConfig};
pub use content::{match_body, ContentMatcher, InteractionContents};
pub use content_type::ContentType;
pub use context::MatchingContext;
pub use error::{MatchError, Result};
pub use executor::domatch;
pub use mismatch::{
    BodyItemMatchResult, BodyMatchResult, BodyMismatch, BodyTypeMismatch, CookieMismatch,
    HeaderMismatch, MetadataMismatch, MethodMismatch, Mismatch, PathMismatch, QueryMismatch,
    StatusMismatch,
};
pub use request::{
    interactions_from_json, match_interaction, match_interaction_with_config, match_request,
    match_request_with_config, CandidateMatch, HttpRequest, Interaction, RequestMatch,
    RequestMatchResult,
};
pub use response::{
    match_message, match_message_with_config, match_response, match_response_with_config,
    match_status, HttpResponse, Message,
};
pub use rules::{
    Category, HttpStatus, MatchingRule, MatchingRuleCategory, MatchingRuleGroup, MatchingRules,
    NumberKind, RuleLogic,
};
pub use value::MatchValue;
