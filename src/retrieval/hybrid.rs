//! Hybrid search combining cross-segment keyword ranking and semantic ranking

use crate::embedding::EmbeddingError;
use crate::index::DocId;
use crate::query::{QueryExecutor, QueryParser};
use crate::ranking::{Ranker, SimilarityError};
use crate::retrieval::{
    deduplicate_by_canonical, reciprocal_rank_fusion, CanonicalCatalog, FusionConfig,
    SemanticRanker,
};
use crate::segment::{SegmentId, SegmentManager};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Similarity computation failed: {0}")]
    Similarity(#[from] SimilarityError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Document {url} of segment {segment_id} has no canonical document")]
    MissingCanonicalDocument { segment_id: SegmentId, url: String },

    #[error("Unknown canonical document {0}")]
    UnknownCanonicalDocument(i64),

    #[error("Segment {segment_id} indexes unregistered document {doc_id}")]
    UnregisteredDocument { segment_id: SegmentId, doc_id: DocId },
}

/// One keyword hit, resolved to its canonical document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordResult {
    pub canonical_id: i64,
    pub score: f64,
    pub title: String,
    pub url: String,
    pub segment_id: SegmentId,
    pub doc_id: DocId,
}

/// Where a result was found by the keyword phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentLocation {
    pub segment_id: SegmentId,
    pub doc_id: DocId,
}

/// Final search result
///
/// `location` is `None` for documents found only by the semantic phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResult {
    pub canonical_id: i64,
    pub score: f64,
    pub title: String,
    pub url: String,
    pub location: Option<SegmentLocation>,
}

impl From<KeywordResult> for HybridResult {
    fn from(result: KeywordResult) -> Self {
        Self {
            canonical_id: result.canonical_id,
            score: result.score,
            title: result.title,
            url: result.url,
            location: Some(SegmentLocation {
                segment_id: result.segment_id,
                doc_id: result.doc_id,
            }),
        }
    }
}

/// Hybrid searcher combining semantic and keyword search
pub struct HybridQueryEngine {
    parser: QueryParser,
    ranker: Box<dyn Ranker>,
    semantic: Option<Box<dyn SemanticRanker>>,
    fusion: FusionConfig,
}

impl HybridQueryEngine {
    /// Create a keyword-only engine; see [`Self::with_semantic`]
    pub fn new(parser: QueryParser, ranker: Box<dyn Ranker>, fusion: FusionConfig) -> Self {
        Self {
            parser,
            ranker,
            semantic: None,
            fusion,
        }
    }

    pub fn with_semantic(mut self, semantic: Box<dyn SemanticRanker>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn has_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Perform hybrid search
    ///
    /// Returns every matching document, best first. A failing semantic phase
    /// is logged and the keyword ranking is returned on its own. Query text
    /// without terms yields no keyword hits, never an error.
    ///
    /// The keyword list holds one entry per canonical document before
    /// fusion, so a document live in several segments contributes a single
    /// keyword rank.
    pub fn search(
        &self,
        query: &str,
        segments: &SegmentManager,
        catalog: &CanonicalCatalog,
    ) -> Result<Vec<HybridResult>, SearchError> {
        // Step 1: Keyword phase across every live segment
        let terms = self.parser.parse(query);
        let keyword_results =
            deduplicate_by_canonical(self.keyword_search(&terms, segments, catalog)?);

        // Step 2: Semantic phase
        let semantic = match &self.semantic {
            Some(semantic) => semantic.rank(query),
            None => return Ok(keyword_results.into_iter().map(HybridResult::from).collect()),
        };

        let semantic_results = match semantic {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("Semantic search failed, using keyword results only: {}", e);
                return Ok(keyword_results.into_iter().map(HybridResult::from).collect());
            }
        };

        // Step 3: Reciprocal Rank Fusion
        let keyword_ids: Vec<i64> = keyword_results.iter().map(|r| r.canonical_id).collect();
        let semantic_ids: Vec<i64> = semantic_results.iter().map(|r| r.canonical_id).collect();
        let fused = reciprocal_rank_fusion(
            &[keyword_ids.as_slice(), semantic_ids.as_slice()],
            &self.fusion,
        );

        tracing::debug!(
            "Fused {} keyword and {} semantic results into {}",
            keyword_ids.len(),
            semantic_ids.len(),
            fused.len()
        );

        // Step 4: Hydrate
        let mut by_id: HashMap<i64, KeywordResult> = keyword_results
            .into_iter()
            .map(|r| (r.canonical_id, r))
            .collect();

        fused
            .into_iter()
            .map(|(canonical_id, score)| match by_id.remove(&canonical_id) {
                Some(keyword) => Ok(HybridResult {
                    score,
                    ..HybridResult::from(keyword)
                }),
                None => {
                    let doc = catalog
                        .get(canonical_id)
                        .ok_or(SearchError::UnknownCanonicalDocument(canonical_id))?;
                    Ok(HybridResult {
                        canonical_id,
                        score,
                        title: doc.title.clone(),
                        url: doc.url.clone(),
                        location: None,
                    })
                }
            })
            .collect()
    }

    /// Boolean AND match plus ranking in every live segment
    ///
    /// Results are ordered by score descending, then canonical id, segment id
    /// and local id ascending. A document live in several segments appears
    /// once per segment.
    pub fn keyword_search(
        &self,
        terms: &[String],
        segments: &SegmentManager,
        catalog: &CanonicalCatalog,
    ) -> Result<Vec<KeywordResult>, SearchError> {
        let mut results = Vec::new();
        if terms.is_empty() {
            return Ok(results);
        }

        for segment in segments.segments() {
            let index = segment.index();
            let matches = QueryExecutor::new(index).execute(terms);
            if matches.is_empty() {
                continue;
            }

            let scores = self.ranker.rank(terms, index, segment.len());
            tracing::debug!(
                "Segment {}: {} documents match {:?}",
                segment.id(),
                matches.len(),
                terms
            );

            for doc_id in matches {
                let doc = segment
                    .document(doc_id)
                    .ok_or(SearchError::UnregisteredDocument {
                        segment_id: segment.id(),
                        doc_id,
                    })?;

                let canonical_id =
                    catalog
                        .id_for_url(&doc.url)
                        .ok_or_else(|| SearchError::MissingCanonicalDocument {
                            segment_id: segment.id(),
                            url: doc.url.clone(),
                        })?;

                results.push(KeywordResult {
                    canonical_id,
                    score: scores.get(&doc_id).copied().unwrap_or(0.0),
                    title: doc.title.clone(),
                    url: doc.url.clone(),
                    segment_id: segment.id(),
                    doc_id,
                });
            }
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.canonical_id.cmp(&b.canonical_id))
                .then(a.segment_id.cmp(&b.segment_id))
                .then(a.doc_id.cmp(&b.doc_id))
        });

        Ok(results)
    }
}
