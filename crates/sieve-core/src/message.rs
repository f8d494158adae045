//! # Message Model
//!
//! Batched messages as seen by a pipeline stage.
//!
//! - `Part`: payload bytes plus per-part metadata
//! - `Message`: an ordered batch of parts
//! - `Locked`: a read-only single-part view handed to conditions
//!
//! Cloning a `Part` duplicates its payload and metadata; a clone never
//! aliases the original's buffers.

use std::collections::BTreeMap;

// =============================================================================
// PART
// =============================================================================

/// Smallest unit of payload within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Part {
    content: Vec<u8>,
    metadata: BTreeMap<String, String>,
}

impl Part {
    /// Create a part with no metadata.
    #[must_use]
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style metadata setter.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Payload decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Replace the payload.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }

    /// Look up a metadata value.
    #[must_use]
    pub fn metadata_get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Set a metadata value, replacing any previous one.
    pub fn metadata_set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// All metadata in key order.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

// =============================================================================
// MESSAGE (BATCH)
// =============================================================================

/// An ordered batch of parts. Insertion order is processing order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a message from existing parts, keeping their order.
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self { parts }
    }

    /// Append a part to the end of the batch.
    pub fn append(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the batch has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get a part by index. Negative indexes count back from the end,
    /// so `-1` is the last part.
    #[must_use]
    pub fn get(&self, index: i64) -> Option<&Part> {
        resolve_index(index, self.parts.len()).and_then(|i| self.parts.get(i))
    }

    /// Mutable access to a part by (non-negative) position.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Part> {
        self.parts.get_mut(index)
    }

    /// Iterate parts in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    /// Consume the message, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

impl FromIterator<Part> for Message {
    fn from_iter<I: IntoIterator<Item = Part>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

// =============================================================================
// LOCKED VIEW
// =============================================================================

/// A read-only view of one part of a batch, presented as a single-part
/// message.
///
/// Conditions receive this instead of the batch: they can only see the
/// part under evaluation and can never mutate it or its siblings.
#[derive(Debug, Clone, Copy)]
pub struct Locked<'a> {
    part: &'a Part,
}

impl<'a> Locked<'a> {
    /// Lock a single part directly.
    #[must_use]
    pub const fn new(part: &'a Part) -> Self {
        Self { part }
    }

    /// A locked view always holds exactly one part.
    #[must_use]
    pub const fn len(&self) -> usize {
        1
    }

    /// Always false; present for parity with `Message`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Index the view as a one-part message: `0` and `-1` resolve to the
    /// part, anything else is out of range.
    #[must_use]
    pub fn get(&self, index: i64) -> Option<&'a Part> {
        match index {
            0 | -1 => Some(self.part),
            _ => None,
        }
    }

    /// The part under evaluation.
    #[must_use]
    pub const fn part(&self) -> &'a Part {
        self.part
    }
}

/// Lock the part at `index` of a message.
#[must_use]
pub fn lock(msg: &Message, index: i64) -> Option<Locked<'_>> {
    msg.get(index).map(Locked::new)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Message {
        Message::from_parts(vec![Part::new("a"), Part::new("b"), Part::new("c")])
    }

    #[test]
    fn negative_index_counts_from_end() {
        let msg = batch();
        assert_eq!(msg.get(-1).map(|p| p.content()), Some(&b"c"[..]));
        assert_eq!(msg.get(-3).map(|p| p.content()), Some(&b"a"[..]));
        assert!(msg.get(-4).is_none());
        assert!(msg.get(3).is_none());
    }

    #[test]
    fn clone_does_not_alias() {
        let original = Part::new("payload").with_metadata("k", "v");
        let mut copy = original.clone();
        copy.set_content("changed");
        copy.metadata_set("k", "other");

        assert_eq!(original.content(), b"payload");
        assert_eq!(original.metadata_get("k"), Some("v"));
    }

    #[test]
    fn locked_view_is_single_part() {
        let msg = batch();
        let locked = lock(&msg, 1).expect("lock");
        assert_eq!(locked.len(), 1);
        assert_eq!(locked.get(0).map(|p| p.content()), Some(&b"b"[..]));
        assert_eq!(locked.get(-1).map(|p| p.content()), Some(&b"b"[..]));
        assert!(locked.get(1).is_none());
    }
}
