//! Embedding generation and storage
//!
//! - [`EmbeddingService`] turns text into a fixed-length vector
//! - [`FastEmbedProvider`] is the local FastEmbed backend
//! - [`EmbeddingStore`] persists one vector per canonical document
mod provider;

pub use provider::{truncate_to_words, EmbeddingError, EmbeddingService, FastEmbedProvider};

use crate::error::Result;
use std::collections::BTreeMap;

/// Persistence for document embeddings, keyed by canonical document id
pub trait EmbeddingStore {
    /// Store (or replace) the vector of a canonical document
    fn store_embedding(&self, canonical_id: i64, model: &str, vector: &[f32]) -> Result<()>;

    fn get_embedding(&self, canonical_id: i64) -> Result<Option<Vec<f32>>>;

    /// Every stored vector
    fn all_embeddings(&self) -> Result<BTreeMap<i64, Vec<f32>>>;
}
