use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::SinkError;

/// One opaque payload unit within a batch.
///
/// The payload is reference-counted, so cloning a part is cheap and never
/// copies the underlying bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    data: Bytes,
}

impl Part {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Build a part from a JSON record, serialized as one NDJSON line.
    pub fn from_json(record: &JsonValue) -> Result<Self, SinkError> {
        let data = serde_json::to_vec(record).map_err(|e| SinkError::Serialize(e.to_string()))?;
        Ok(Self::new(data))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Part {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

/// An ordered batch of parts dispatched together.
///
/// Order is significant: the dispatch layer visits parts by ascending index
/// and attributes failures to those indices. The batch itself is never
/// mutated by a send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
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

impl<'a> IntoIterator for &'a Message {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}
