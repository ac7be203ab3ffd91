//! Semantic ranking over stored document embeddings

use crate::embedding::{EmbeddingService, EmbeddingStore};
use crate::ranking::cosine_similarity;
use crate::retrieval::SearchError;
use serde::Serialize;
use std::sync::Arc;

/// A canonical document with a similarity score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub canonical_id: i64,
    pub score: f64,
}

/// Produces a semantic ranking of canonical documents for a query
///
/// Any error makes the hybrid engine fall back to keyword-only results.
pub trait SemanticRanker: Send + Sync {
    /// Ranked documents, best first
    fn rank(&self, query: &str) -> Result<Vec<ScoredDocument>, SearchError>;
}

/// Brute-force cosine ranking of the query embedding against every stored
/// document embedding
pub struct SemanticQueryEngine {
    embedder: Arc<dyn EmbeddingService>,
    store: Arc<dyn EmbeddingStore + Send + Sync>,
}

impl SemanticQueryEngine {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        store: Arc<dyn EmbeddingStore + Send + Sync>,
    ) -> Self {
        Self { embedder, store }
    }
}

impl SemanticRanker for SemanticQueryEngine {
    fn rank(&self, query: &str) -> Result<Vec<ScoredDocument>, SearchError> {
        let query_embedding = self.embedder.embed(query)?;

        let embeddings = self
            .store
            .all_embeddings()
            .map_err(|e| SearchError::Storage(e.to_string()))?;

        let mut results = Vec::with_capacity(embeddings.len());
        for (canonical_id, embedding) in &embeddings {
            let score = cosine_similarity(&query_embedding, embedding)?;
            results.push(ScoredDocument {
                canonical_id: *canonical_id,
                score,
            });
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.canonical_id.cmp(&b.canonical_id))
        });

        tracing::debug!("Semantic phase ranked {} documents", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::error::Result;
    use std::collections::BTreeMap;

    struct AxisEmbedder;

    impl EmbeddingService for AxisEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            match text {
                "x" => Ok(vec![1.0, 0.0]),
                "y" => Ok(vec![0.0, 1.0]),
                _ => Err(EmbeddingError::InvalidInput(text.to_string())),
            }
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    struct MemoryStore(BTreeMap<i64, Vec<f32>>);

    impl EmbeddingStore for MemoryStore {
        fn store_embedding(&self, _: i64, _: &str, _: &[f32]) -> Result<()> {
            Ok(())
        }

        fn get_embedding(&self, canonical_id: i64) -> Result<Option<Vec<f32>>> {
            Ok(self.0.get(&canonical_id).cloned())
        }

        fn all_embeddings(&self) -> Result<BTreeMap<i64, Vec<f32>>> {
            Ok(self.0.clone())
        }
    }

    fn engine(vectors: BTreeMap<i64, Vec<f32>>) -> SemanticQueryEngine {
        SemanticQueryEngine::new(Arc::new(AxisEmbedder), Arc::new(MemoryStore(vectors)))
    }

    #[test]
    fn test_ranks_by_similarity() {
        let engine = engine(BTreeMap::from([
            (1, vec![0.0, 1.0]),
            (2, vec![1.0, 0.1]),
            (3, vec![1.0, 1.0]),
        ]));

        let ranked = engine.rank("x").unwrap();
        let ids: Vec<i64> = ranked.iter().map(|d| d.canonical_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(ranked[2].score.abs() < 1e-9);
    }

    #[test]
    fn test_ties_break_by_canonical_id() {
        let engine = engine(BTreeMap::from([(5, vec![2.0, 0.0]), (3, vec![1.0, 0.0])]));
        let ids: Vec<i64> = engine.rank("x").unwrap().iter().map(|d| d.canonical_id).collect();
        assert_eq!(ids, vec![3, 5]);
    }

    #[test]
    fn test_dimension_mismatch_fails() {
        let engine = engine(BTreeMap::from([(1, vec![1.0, 0.0, 0.0])]));
        assert!(matches!(engine.rank("x"), Err(SearchError::Similarity(_))));
    }

    #[test]
    fn test_embedding_failure_propagates() {
        let engine = engine(BTreeMap::new());
        assert!(matches!(engine.rank("z"), Err(SearchError::Embedding(_))));
    }
}
