//! Storage layer for Quarry
//!
//! The engine reads and writes through the repository traits below. The
//! SQLite implementation ([`SqliteRepository`]) works over a pooled
//! connection or an open transaction, so multi-step sequences such as
//! seeding or committing a merge can be applied atomically with
//! [`Database::transaction`].

pub mod database;
pub mod repository;

pub use database::{Database, DbPool, DbStats};
pub use repository::SqliteRepository;

use crate::error::Result;
use crate::index::{DocId, InvertedIndex};
use crate::segment::{Document, SegmentId};
use crate::text::Token;
use std::collections::{BTreeMap, HashMap};

/// Canonical documents and their placement in segments
pub trait DocumentRepository {
    /// Save documents, deduplicated by URL
    ///
    /// Returns the canonical id of every input URL, whether it was inserted
    /// now or already present.
    fn save_canonical_documents(&self, documents: &[Document]) -> Result<HashMap<String, i64>>;

    /// Every canonical document keyed by id
    fn load_canonical_documents(&self) -> Result<BTreeMap<i64, Document>>;

    /// Give each canonical id the next local id of `segment_id`
    ///
    /// Local ids are assigned sequentially in input order, starting at 1 for
    /// an empty segment. Returns (canonical id, local id) pairs in input
    /// order.
    fn map_to_segment(&self, segment_id: SegmentId, canonical_ids: &[i64])
        -> Result<Vec<(i64, DocId)>>;

    /// Local id -> canonical id for one segment
    fn load_segment_documents(&self, segment_id: SegmentId) -> Result<BTreeMap<DocId, i64>>;
}

/// Persisted postings, per segment
pub trait IndexRepository {
    /// Append one document's tokens to a segment's postings
    fn append_document(&self, segment_id: SegmentId, doc_id: DocId, tokens: &[Token])
        -> Result<()>;

    /// Rebuild the full inverted index of a segment
    fn load_index(&self, segment_id: SegmentId) -> Result<InvertedIndex>;
}

/// Segment lifecycle records
pub trait SegmentRepository {
    /// Allocate a new, active segment id
    fn create_segment(&self) -> Result<SegmentId>;

    /// Active segment ids in ascending order
    fn load_active_segment_ids(&self) -> Result<Vec<SegmentId>>;

    /// Retire an active segment, optionally recording the merge result that
    /// replaced it. Rows are kept for audit.
    fn deactivate_segment(&self, segment_id: SegmentId, merged_into: Option<SegmentId>)
        -> Result<()>;

    /// Whether some active segment already holds this canonical document
    fn is_canonical_doc_in_active_segment(&self, canonical_id: i64) -> Result<bool>;
}
