//! Segment compaction
//!
//! Merging two segments yields a fresh segment that holds every distinct
//! document (by URL) of both sources, renumbered from 1, with its postings
//! rebuilt from the sources' indexes.

use super::{Segment, SegmentId, SegmentManager};
use crate::error::{QuarryError, Result};
use crate::index::DocId;
use std::collections::HashSet;

impl SegmentManager {
    /// Build the merge of segments `a` and `b` under `target_id`
    ///
    /// Documents of `a` come first (ascending local id), then those of `b`.
    /// A document whose URL was already taken is dropped. The live set is
    /// not modified: the caller persists the result and then calls
    /// [`SegmentManager::replace`].
    pub fn merge(&self, a: SegmentId, b: SegmentId, target_id: SegmentId) -> Result<Segment> {
        if a == b {
            return Err(QuarryError::InvalidMerge(format!(
                "cannot merge segment {} with itself",
                a
            )));
        }

        let first = self.get_segment(a)?;
        let second = self.get_segment(b)?;

        if self.contains(target_id) {
            return Err(QuarryError::InvalidMerge(format!(
                "target segment id {} is already live",
                target_id
            )));
        }

        let mut merged = Segment::new(target_id);
        let mut seen_urls: HashSet<&str> = HashSet::new();
        let mut next_doc_id: DocId = 1;
        let mut dropped = 0usize;

        for source in [first, second] {
            for (&doc_id, document) in source.documents() {
                if !seen_urls.insert(document.url.as_str()) {
                    dropped += 1;
                    continue;
                }

                let tokens = source.index().reconstruct_tokens(doc_id);
                merged.add_document(next_doc_id, document.clone(), &tokens);
                next_doc_id += 1;
            }
        }

        tracing::info!(
            "Merged segments {} + {} into {}: {} documents, {} duplicates dropped",
            a,
            b,
            target_id,
            merged.len(),
            dropped
        );

        Ok(merged)
    }
}
