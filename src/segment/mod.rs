//! Segments: immutable-once-built shards of the corpus
//!
//! A segment pairs a subset of documents with its own inverted index. New
//! documents always form a new segment; old segments are only retired by a
//! merge that produces their replacement.

mod manager;
mod merge;

pub use manager::SegmentManager;

use crate::index::{DocId, InvertedIndex};
use crate::text::Token;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Segment identifier, allocated by the segment repository
pub type SegmentId = i64;

/// A source document, identified canonically by its URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    id: SegmentId,
    documents: BTreeMap<DocId, Document>,
    index: InvertedIndex,
}

impl Segment {
    /// Create an empty segment
    pub fn new(id: SegmentId) -> Self {
        Self {
            id,
            documents: BTreeMap::new(),
            index: InvertedIndex::new(),
        }
    }

    /// Register a document and index its tokens
    pub fn add_document(&mut self, doc_id: DocId, document: Document, tokens: &[Token]) {
        self.documents.insert(doc_id, document);
        self.index.add_document(doc_id, tokens);
    }

    /// Register a document without touching the index
    ///
    /// Only used when rebuilding a segment from storage, where the index is
    /// loaded separately and attached with [`Segment::set_index`].
    pub fn register_document(&mut self, doc_id: DocId, document: Document) {
        self.documents.insert(doc_id, document);
    }

    pub fn set_index(&mut self, index: InvertedIndex) {
        self.index = index;
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Documents keyed by local id, in ascending id order
    pub fn documents(&self) -> &BTreeMap<DocId, Document> {
        &self.documents
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.documents.get(&doc_id)
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_document_indexes_tokens() {
        let mut segment = Segment::new(4);
        let doc = Document::new("https://example.org/a", "A", "alpha beta");
        segment.add_document(1, doc.clone(), &[Token::new("alpha", 0, 0), Token::new("beta", 1, 6)]);

        assert_eq!(segment.id(), 4);
        assert_eq!(segment.len(), 1);
        assert_eq!(segment.document(1), Some(&doc));
        assert!(segment.index().get_postings("beta").contains_key(&1));
    }

    #[test]
    fn test_register_then_set_index() {
        let mut segment = Segment::new(1);
        segment.register_document(1, Document::new("u", "t", "gamma"));
        assert!(segment.index().is_empty());

        let mut index = InvertedIndex::new();
        index.add_term("gamma", 1, 0, 0);
        segment.set_index(index);

        assert_eq!(segment.index().document_frequency("gamma"), 1);
    }
}
