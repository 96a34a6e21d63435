//! Property tests for fixed-size chunking.

use docchat_rag::{Document, split};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Dropping the shared prefix of every segment after the first gives back
    /// the document text exactly, and every boundary respects the limits.
    #[test]
    fn segments_reconstruct_document(
        text in "\\PC{0,200}",
        max_length in 1usize..40,
        overlap_seed in 0usize..40,
    ) {
        let overlap = overlap_seed % max_length;
        let doc = Document::new("doc", text.clone());
        let segments = split(&doc, max_length, overlap).unwrap();

        let mut rebuilt = String::new();
        for (i, segment) in segments.iter().enumerate() {
            prop_assert_eq!(segment.ordinal, i);
            let len = segment.text.chars().count();
            prop_assert_eq!(len, segment.len());
            prop_assert!(len <= max_length);
            if i + 1 < segments.len() {
                prop_assert_eq!(len, max_length);
                prop_assert_eq!(segments[i + 1].start, segment.end - overlap);
            }
            let skip = if i == 0 { 0 } else { overlap };
            rebuilt.extend(segment.text.chars().skip(skip));
        }
        prop_assert_eq!(rebuilt, text);
    }
}
