//! JSON wrapped in a schema-registry wire frame.
//!
//! Producers that use a schema registry prefix each JSON payload with a zero magic byte and a
//! four byte big-endian schema id. The frame is removed and the rest compared as JSON.

use super::json::JsonContentMatcher;
use super::{ContentMatcher, InteractionContents};
use crate::body::OptionalBody;
use crate::content_type::ContentType;
use crate::context::MatchingContext;
use crate::error::Result;
use crate::mismatch::BodyMatchResult;
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

const MAGIC_BYTE: u8 = 0;
const FRAME_LEN: usize = 5;

/// Matcher for `application/vnd.schemaregistry.v1+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramedJsonContentMatcher;

/// The schema id carried by a framed payload.
pub fn schema_id(bytes: &[u8]) -> Option<u32> {
    if bytes.len() >= FRAME_LEN && bytes[0] == MAGIC_BYTE {
        let mut id = [0u8; 4];
        id.copy_from_slice(&bytes[1..FRAME_LEN]);
        Some(u32::from_be_bytes(id))
    } else {
        None
    }
}

/// The body without its frame, as JSON. Unframed bodies pass through unchanged.
fn unwrap(body: &OptionalBody) -> OptionalBody {
    if !body.is_present() {
        return body.clone();
    }
    let bytes = body.value();
    let payload = match schema_id(bytes) {
        Some(id) => {
            debug!("Stripping schema registry frame for schema id {}", id);
            Bytes::copy_from_slice(&bytes[FRAME_LEN..])
        }
        None => Bytes::copy_from_slice(bytes),
    };
    OptionalBody::present(payload, Some(ContentType::json()))
}

impl ContentMatcher for FramedJsonContentMatcher {
    fn name(&self) -> &'static str {
        "framed-json"
    }

    fn match_body(
        &self,
        expected: &OptionalBody,
        actual: &OptionalBody,
        context: &MatchingContext<'_>,
    ) -> Result<BodyMatchResult> {
        JsonContentMatcher.match_body(&unwrap(expected), &unwrap(actual), context)
    }

    fn setup_body_from_config(&self, config: &Value) -> Result<InteractionContents> {
        let content_type: ContentType = "application/vnd.schemaregistry.v1+json".parse()?;
        InteractionContents::from_config_text(config, content_type)
    }
}
