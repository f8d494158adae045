//! # Batch Wire Format
//!
//! One batch per line, encoded as a JSON array of parts:
//!
//! ```json
//! [{"content": "hello", "metadata": {"status": "ok"}}, {"content": "bye"}]
//! ```
//!
//! Content is carried as a UTF-8 string; invalid bytes are replaced on
//! output.

use serde::{Deserialize, Serialize};
use sieve_core::{Message, Part, SieveError};
use std::collections::BTreeMap;

/// Maximum size of a single input line (16 MiB).
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// JSON form of a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePart {
    /// Payload.
    pub content: String,
    /// Per-part metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl From<WirePart> for Part {
    fn from(wire: WirePart) -> Self {
        let mut part = Part::new(wire.content);
        for (k, v) in wire.metadata {
            part.metadata_set(k, v);
        }
        part
    }
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        Self {
            content: part.as_str().into_owned(),
            metadata: part.metadata().clone(),
        }
    }
}

/// Decode one input line into a batch.
pub fn decode_batch(line: &str) -> Result<Message, SieveError> {
    if line.len() > MAX_LINE_BYTES {
        return Err(SieveError::InvalidBatch(format!(
            "line of {} bytes exceeds maximum allowed {} bytes",
            line.len(),
            MAX_LINE_BYTES
        )));
    }
    let parts: Vec<WirePart> =
        serde_json::from_str(line).map_err(|e| SieveError::InvalidBatch(e.to_string()))?;
    Ok(parts.into_iter().map(Part::from).collect())
}

/// Encode a batch as one output line (no trailing newline).
pub fn encode_batch(msg: &Message) -> Result<String, SieveError> {
    let parts: Vec<WirePart> = msg.iter().map(WirePart::from).collect();
    serde_json::to_string(&parts).map_err(|e| SieveError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_content_and_metadata() {
        let msg = decode_batch(r#"[{"content":"a","metadata":{"k":"v"}},{"content":"b"}]"#)
            .expect("decode");
        assert_eq!(msg.len(), 2);
        assert_eq!(msg.get(0).and_then(|p| p.metadata_get("k")), Some("v"));
        assert_eq!(msg.get(1).map(|p| p.content()), Some(&b"b"[..]));
    }

    #[test]
    fn encode_omits_empty_metadata() {
        let msg = Message::from_parts(vec![Part::new("x"), Part::new("y").with_metadata("a", "1")]);
        assert_eq!(
            encode_batch(&msg).expect("encode"),
            r#"[{"content":"x"},{"content":"y","metadata":{"a":"1"}}]"#
        );
    }

    #[test]
    fn empty_array_is_empty_batch() {
        assert!(decode_batch("[]").expect("decode").is_empty());
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            decode_batch(r#"{"content":"x"}"#),
            Err(SieveError::InvalidBatch(_))
        ));
    }
}
