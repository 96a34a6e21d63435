//! Document chunking.
//!
//! This module provides the [`Chunker`] trait, the [`split`] function and
//! [`FixedSizeChunker`], which splits by character count with a fixed overlap
//! between neighbours.

use crate::document::{Document, Segment};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into segments.
///
/// Implementations validate their parameters at construction, so chunking
/// itself cannot fail. Output is deterministic for a given document.
pub trait Chunker: Send + Sync {
    /// Split a document into segments ordered by ordinal.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Segment>;
}

/// Splits text into fixed-size segments by character count with configurable overlap.
///
/// Every segment except the last is exactly `max_length` characters long and
/// shares its final `overlap` characters with the next one. Each segment
/// inherits the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let segments = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    max_length: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_length` - maximum number of characters per segment
    /// * `overlap` - number of characters shared by consecutive segments
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidParameters`] unless `0 <= overlap < max_length`.
    pub fn new(max_length: usize, overlap: usize) -> Result<Self> {
        validate(max_length, overlap)?;
        Ok(Self { max_length, overlap })
    }

    /// Maximum segment length in characters.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Characters shared by consecutive segments.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Segment> {
        split_unchecked(document, self.max_length, self.overlap)
    }
}

/// Split `document` into segments of at most `max_length` characters,
/// consecutive segments sharing `overlap` characters.
///
/// # Errors
///
/// Returns [`RagError::InvalidParameters`] if `max_length == 0` or
/// `overlap >= max_length`.
pub fn split(document: &Document, max_length: usize, overlap: usize) -> Result<Vec<Segment>> {
    validate(max_length, overlap)?;
    Ok(split_unchecked(document, max_length, overlap))
}

fn validate(max_length: usize, overlap: usize) -> Result<()> {
    if max_length == 0 {
        return Err(RagError::InvalidParameters("max_length must be greater than zero".into()));
    }
    if overlap >= max_length {
        return Err(RagError::InvalidParameters(format!(
            "overlap ({overlap}) must be less than max_length ({max_length})"
        )));
    }
    Ok(())
}

fn split_unchecked(document: &Document, max_length: usize, overlap: usize) -> Vec<Segment> {
    let text = &document.text;
    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, including the end of the string.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = max_length - overlap;

    let mut segments = Vec::with_capacity(char_count / step + 1);
    let mut start = 0;
    loop {
        let end = (start + max_length).min(char_count);
        let ordinal = segments.len();

        let mut metadata = document.metadata.clone();
        metadata.insert("chunk_index".to_string(), ordinal.to_string());

        segments.push(Segment {
            document_id: document.id.clone(),
            ordinal,
            start,
            end,
            text: text[boundaries[start]..boundaries[end]].to_string(),
            metadata,
        });

        if end == char_count {
            break;
        }
        start += step;
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(segments: &[Segment], overlap: usize) -> String {
        let mut out = String::new();
        for (i, segment) in segments.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            out.extend(segment.text.chars().skip(skip));
        }
        out
    }

    #[test]
    fn sky_and_grass_scenario() {
        let doc = Document::new("doc", "The sky is blue. Grass is green.");
        let segments = split(&doc, 20, 5).unwrap();

        assert!(segments.len() >= 2);
        for segment in &segments {
            assert!(segment.text.chars().count() <= 20);
        }
        for pair in segments.windows(2) {
            let tail: String = pair[0].text.chars().skip(20 - 5).collect();
            let head: String = pair[1].text.chars().take(5).collect();
            assert_eq!(tail, head);
        }
        assert_eq!(reconstruct(&segments, 5), doc.text);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_max_length() {
        let doc = Document::new("doc", "text");
        assert!(matches!(split(&doc, 10, 10), Err(RagError::InvalidParameters(_))));
        assert!(matches!(split(&doc, 0, 0), Err(RagError::InvalidParameters(_))));
        assert!(FixedSizeChunker::new(5, 7).is_err());
    }

    #[test]
    fn empty_document_yields_no_segments() {
        let doc = Document::new("doc", "");
        assert!(split(&doc, 10, 2).unwrap().is_empty());
    }

    #[test]
    fn short_document_is_a_single_segment() {
        let doc = Document::new("doc", "short");
        let segments = split(&doc, 10, 2).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "short");
        assert_eq!((segments[0].start, segments[0].end), (0, 5));
    }

    #[test]
    fn exact_fit_does_not_emit_trailing_overlap_segment() {
        let doc = Document::new("doc", "abcdefghij");
        let segments = split(&doc, 10, 3).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let doc = Document::new("doc", "héllo wörld ünïcode");
        let segments = split(&doc, 6, 2).unwrap();
        for segment in &segments {
            let expected: String =
                doc.text.chars().skip(segment.start).take(segment.len()).collect();
            assert_eq!(segment.text, expected);
        }
        assert_eq!(reconstruct(&segments, 2), doc.text);
    }

    #[test]
    fn segments_carry_ids_and_metadata() {
        let mut doc = Document::new("guide", "0123456789abcdef");
        doc.metadata.insert("topic".into(), "numbers".into());
        let segments = FixedSizeChunker::new(8, 2).unwrap().chunk(&doc);

        assert_eq!(segments[1].stable_id(), "guide_1");
        assert_eq!(segments[1].metadata.get("chunk_index").map(String::as_str), Some("1"));
        assert_eq!(segments[1].metadata.get("topic").map(String::as_str), Some("numbers"));
    }

    #[test]
    fn chunking_is_deterministic() {
        let doc = Document::new("doc", "The quick brown fox jumps over the lazy dog.");
        let chunker = FixedSizeChunker::new(12, 4).unwrap();
        assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }
}
