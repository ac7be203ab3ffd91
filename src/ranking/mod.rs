//! Relevance scoring
//!
//! - [`Ranker`] scores documents of one index for a list of query terms
//! - [`TfIdfRanker`] is the default (and currently only) keyword scorer
//! - [`cosine_similarity`] compares embedding vectors for semantic search

mod similarity;
mod tfidf;

pub use similarity::{cosine_similarity, SimilarityError};
pub use tfidf::TfIdfRanker;

use crate::index::{DocId, InvertedIndex};
use std::collections::HashMap;

/// Scores candidate documents of one index
///
/// The result is sparse: documents matching none of the terms are absent and
/// callers treat them as scoring `0.0`.
pub trait Ranker: Send + Sync {
    fn rank(&self, terms: &[String], index: &InvertedIndex, total_docs: usize)
        -> HashMap<DocId, f64>;

    /// Short identifier used in configuration and logs
    fn name(&self) -> &'static str;
}

/// Look up a ranker by its configured name
pub fn ranker_by_name(name: &str) -> Option<Box<dyn Ranker>> {
    match name {
        "tfidf" | "tf-idf" => Some(Box::new(TfIdfRanker)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranker_by_name() {
        assert_eq!(ranker_by_name("tfidf").unwrap().name(), "tfidf");
        assert!(ranker_by_name("bm25").is_none());
    }
}
