//! Data types for documents, segments, index entries and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata and no source location.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }
}

/// A contiguous slice of a [`Document`]'s text produced by a chunker.
///
/// Offsets count characters, not bytes: `text` is exactly the characters
/// `start..end` of the parent document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this segment among its siblings, starting at zero.
    pub ordinal: usize,
    /// Character offset of the first character (inclusive).
    pub start: usize,
    /// Character offset one past the last character (exclusive).
    pub end: usize,
    /// The segment text.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
}

impl Segment {
    /// The identifier this segment is stored under.
    ///
    /// Derived only from the document ID and ordinal, so ingesting the same
    /// document again overwrites its entries instead of duplicating them.
    pub fn stable_id(&self) -> String {
        segment_id(&self.document_id, self.ordinal)
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the segment covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Build the stable identifier for the `ordinal`-th segment of a document.
pub fn segment_id(document_id: &str, ordinal: usize) -> String {
    format!("{document_id}_{ordinal}")
}

/// An index entry: a segment's text with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, see [`Segment::stable_id`].
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Key-value metadata inherited from the parent document plus chunk-specific fields.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

impl Chunk {
    /// Attach an embedding to a segment.
    pub fn from_segment(segment: Segment, embedding: Vec<f32>) -> Self {
        Self {
            id: segment.stable_id(),
            text: segment.text,
            embedding,
            metadata: segment.metadata,
            document_id: segment.document_id,
        }
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
