//! Header, query parameter and message metadata comparison.
//!
//! These parts are flat maps from a name to one or more string values. Rules are looked up by
//! the name alone: headers case-insensitively, query parameters and metadata keys exactly.
//!
//! # Module Structure
//!
//! - `headers` - Headers, with parameter-aware `Content-Type`/`Accept` comparison
//! - `query` - Query parameters, where unexpected parameters are mismatches
//! - `metadata` - Message metadata

pub mod headers;
pub mod metadata;
pub mod query;

pub use headers::{compare_header, match_content_type, match_headers, HeaderMatchResult};
pub use metadata::{compare_message_metadata, compare_metadata_value};
pub use query::{compare_query, match_query, QueryMatchResult};

/// Repeat the expected values in order until there is one per actual value.
pub(crate) fn pad_cycled(expected: &[String], len: usize) -> Vec<&str> {
    if expected.is_empty() {
        return Vec::new();
    }
    (0..expected.len().max(len))
        .map(|index| expected[index % expected.len()].as_str())
        .collect()
}
