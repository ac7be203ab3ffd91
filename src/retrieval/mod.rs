//! Hybrid retrieval
//!
//! Keyword search across every live segment, optionally fused with a semantic
//! ranking through Reciprocal Rank Fusion.

mod catalog;
mod deduplication;
mod fusion;
mod hybrid;
mod semantic;

pub use catalog::CanonicalCatalog;
pub use deduplication::deduplicate_by_canonical;
pub use fusion::{reciprocal_rank_fusion, FusionConfig, FusionError, DEFAULT_RRF_K};
pub use hybrid::{HybridQueryEngine, HybridResult, KeywordResult, SearchError, SegmentLocation};
pub use semantic::{ScoredDocument, SemanticQueryEngine, SemanticRanker};
