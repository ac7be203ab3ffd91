//! In-memory view of the canonical document store

use crate::segment::Document;
use std::collections::{BTreeMap, HashMap};

/// Canonical documents by id, with a URL index for resolving segment-local
/// documents to their canonical identity
#[derive(Debug, Clone, Default)]
pub struct CanonicalCatalog {
    by_id: BTreeMap<i64, Document>,
    by_url: HashMap<String, i64>,
}

impl CanonicalCatalog {
    pub fn new(documents: BTreeMap<i64, Document>) -> Self {
        let by_url = documents
            .iter()
            .map(|(id, doc)| (doc.url.clone(), *id))
            .collect();

        Self {
            by_id: documents,
            by_url,
        }
    }

    pub fn insert(&mut self, canonical_id: i64, document: Document) {
        self.by_url.insert(document.url.clone(), canonical_id);
        self.by_id.insert(canonical_id, document);
    }

    pub fn get(&self, canonical_id: i64) -> Option<&Document> {
        self.by_id.get(&canonical_id)
    }

    /// Canonical id of the document stored under `url`
    pub fn id_for_url(&self, url: &str) -> Option<i64> {
        self.by_url.get(url).copied()
    }

    pub fn documents(&self) -> &BTreeMap<i64, Document> {
        &self.by_id
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
