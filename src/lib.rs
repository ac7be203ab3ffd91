//! Quarry - segmented full-text search
//!
//! Documents are indexed into immutable segments, each holding its own
//! inverted index. Queries are boolean AND over terms, ranked with TF-IDF per
//! segment, optionally fused with semantic similarity through Reciprocal Rank
//! Fusion. Segments are compacted by merging two into one, and questions can
//! be answered by an LLM from the best matching documents.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod rag;
pub mod ranking;
pub mod retrieval;
pub mod segment;
pub mod storage;
pub mod text;

pub use engine::SearchEngine;
pub use error::{QuarryError, Result};
