//! Search engine facade
//!
//! [`SearchEngine`] owns the database, the live segment set and the
//! canonical catalog, and drives seeding, searching, merging and answering
//! on top of them. Every multi-step write runs in one database transaction
//! and the in-memory state only changes after that transaction commits.

use crate::config::Config;
use crate::embedding::{EmbeddingService, EmbeddingStore, FastEmbedProvider};
use crate::error::{QuarryError, Result};
use crate::query::{QueryParser, SnippetGenerator};
use crate::rag::{ChatCompletionsClient, ContextAssembler, LlmClient, RagAnswer, RagPipeline};
use crate::ranking::ranker_by_name;
use crate::retrieval::{
    CanonicalCatalog, FusionConfig, HybridQueryEngine, HybridResult, SemanticQueryEngine,
};
use crate::segment::{Document, Segment, SegmentId, SegmentManager};
use crate::storage::{Database, DbStats, DocumentRepository, IndexRepository, SegmentRepository};
use crate::text::TextProcessor;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

const EMBEDDING_BATCH_SIZE: usize = 32;

/// Outcome of [`SearchEngine::seed`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// New segment, if any document was indexed
    pub segment_id: Option<SegmentId>,
    pub indexed: usize,
    /// Documents already live in some segment, or repeated within the batch
    pub skipped: usize,
    pub embedded: usize,
}

/// Outcome of [`SearchEngine::merge`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub sources: (SegmentId, SegmentId),
    pub merged_id: SegmentId,
    pub documents: usize,
    pub duplicates_dropped: usize,
}

/// Per-segment summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub id: SegmentId,
    pub documents: usize,
    pub terms: usize,
}

/// One term occurrence shown in context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub term: String,
    /// 1-based occurrence number of `term` in the document
    pub occurrence: usize,
    pub text: String,
}

pub struct SearchEngine {
    database: Arc<Database>,
    config: Config,
    processor: Arc<TextProcessor>,
    segments: SegmentManager,
    catalog: CanonicalCatalog,
    query_engine: HybridQueryEngine,
    embedder: Option<Arc<dyn EmbeddingService>>,
    rag: Option<RagPipeline>,
    snippets: SnippetGenerator,
}

impl SearchEngine {
    /// Open the configured database, start the configured embedding model
    /// and LLM client, and load every active segment
    ///
    /// An embedding model or LLM client that cannot be started is logged and
    /// left out; keyword search keeps working without them.
    pub fn open(config: &Config) -> Result<Self> {
        let database = Database::new(
            &config.storage.database_path()?,
            config.storage.compression_threshold,
        )?;

        let embedder: Option<Arc<dyn EmbeddingService>> = if config.embedding.enabled {
            match FastEmbedProvider::new(&config.embedding.model, config.embedding.max_words) {
                Ok(provider) => Some(Arc::new(provider)),
                Err(e) => {
                    tracing::warn!("Semantic search disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut engine = Self::with_components(database, config.clone(), embedder)?;

        if config.llm.enabled {
            match ChatCompletionsClient::from_config(&config.llm) {
                Ok(client) => engine = engine.with_llm(Box::new(client)),
                Err(e) => tracing::warn!("LLM answers disabled: {}", e),
            }
        }

        Ok(engine)
    }

    /// Build an engine from explicit parts and load its state from `database`
    pub fn with_components(
        database: Database,
        config: Config,
        embedder: Option<Arc<dyn EmbeddingService>>,
    ) -> Result<Self> {
        let database = Arc::new(database);
        let processor = Arc::new(TextProcessor::from_config(&config.text)?);

        let ranker = ranker_by_name(&config.search.ranker).ok_or_else(|| {
            QuarryError::InvalidConfigValue {
                path: "search.ranker".to_string(),
                message: format!("Unknown ranker '{}'", config.search.ranker),
            }
        })?;
        let fusion =
            FusionConfig::new(config.search.rrf_k).map_err(|e| QuarryError::InvalidConfigValue {
                path: "search.rrf_k".to_string(),
                message: e.to_string(),
            })?;

        let mut query_engine =
            HybridQueryEngine::new(QueryParser::new(processor.clone()), ranker, fusion);
        if let Some(embedder) = &embedder {
            let store: Arc<dyn EmbeddingStore + Send + Sync> = database.clone();
            query_engine =
                query_engine.with_semantic(Box::new(SemanticQueryEngine::new(embedder.clone(), store)));
        }

        let mut engine = Self {
            database,
            config,
            processor,
            segments: SegmentManager::new(),
            catalog: CanonicalCatalog::default(),
            query_engine,
            embedder,
            rag: None,
            snippets: SnippetGenerator::default(),
        };

        engine.load()?;
        Ok(engine)
    }

    /// Enable [`Self::ask`] with the given LLM client
    pub fn with_llm(mut self, llm: Box<dyn LlmClient>) -> Self {
        self.rag = Some(RagPipeline::new(
            llm,
            ContextAssembler::new(self.config.rag.max_words_per_doc),
            self.config.rag.top_k,
        ));
        self
    }

    /// Rebuild the canonical catalog and every active segment from storage
    ///
    /// A segment that references a canonical document missing from storage
    /// fails the whole load with [`QuarryError::MissingCanonicalDocument`];
    /// a posting for a document the segment does not hold fails it with
    /// [`QuarryError::Corrupt`].
    pub fn load(&mut self) -> Result<()> {
        let repo = self.database.repository()?;
        let catalog = CanonicalCatalog::new(repo.load_canonical_documents()?);

        let mut segments = SegmentManager::new();
        for segment_id in repo.load_active_segment_ids()? {
            let mut segment = Segment::new(segment_id);

            for (doc_id, canonical_id) in repo.load_segment_documents(segment_id)? {
                let document = catalog.get(canonical_id).ok_or(
                    QuarryError::MissingCanonicalDocument {
                        segment_id,
                        canonical_id,
                    },
                )?;
                segment.register_document(doc_id, document.clone());
            }

            let index = repo.load_index(segment_id)?;
            for (term, postings) in index.iter() {
                if let Some(doc_id) = postings.keys().find(|id| segment.document(**id).is_none()) {
                    return Err(QuarryError::Corrupt(format!(
                        "segment {} has a posting for '{}' in unregistered document {}",
                        segment_id, term, doc_id
                    )));
                }
            }

            segment.set_index(index);
            segments.add_segment(segment)?;
        }

        tracing::info!(
            "Loaded {} segments, {} canonical documents",
            segments.len(),
            catalog.len()
        );

        self.segments = segments;
        self.catalog = catalog;
        Ok(())
    }

    /// Index `documents` as one new segment
    ///
    /// Documents are saved canonically (deduplicated by URL). Those already
    /// live in a segment, or repeated within `documents`, are skipped; when
    /// nothing is left no segment is created. Content of a URL that was
    /// stored before is indexed in its stored version.
    pub fn seed(&mut self, documents: &[Document]) -> Result<SeedReport> {
        if documents.is_empty() {
            return Ok(SeedReport::default());
        }

        let processor = self.processor.clone();
        let (segment, catalog, skipped) = self.database.transaction(|repo| {
            let ids = repo.save_canonical_documents(documents)?;
            let stored = repo.load_canonical_documents()?;

            let mut seen = HashSet::new();
            let mut fresh = Vec::new();
            let mut skipped = 0usize;

            for doc in documents {
                let canonical_id = ids.get(&doc.url).copied().ok_or_else(|| {
                    QuarryError::Corrupt(format!("no canonical id returned for {}", doc.url))
                })?;

                if !seen.insert(canonical_id) || repo.is_canonical_doc_in_active_segment(canonical_id)? {
                    skipped += 1;
                    continue;
                }
                fresh.push(canonical_id);
            }

            if fresh.is_empty() {
                return Ok((None, CanonicalCatalog::new(stored), skipped));
            }

            let segment_id = repo.create_segment()?;
            let mut segment = Segment::new(segment_id);

            for (canonical_id, doc_id) in repo.map_to_segment(segment_id, &fresh)? {
                let document = stored.get(&canonical_id).cloned().ok_or(
                    QuarryError::MissingCanonicalDocument {
                        segment_id,
                        canonical_id,
                    },
                )?;

                let tokens = processor.process(&document.content);
                repo.append_document(segment_id, doc_id, &tokens)?;
                segment.add_document(doc_id, document, &tokens);
            }

            Ok((Some(segment), CanonicalCatalog::new(stored), skipped))
        })?;

        self.catalog = catalog;

        let Some(segment) = segment else {
            tracing::info!("Nothing new to index ({} documents skipped)", skipped);
            return Ok(SeedReport {
                skipped,
                ..SeedReport::default()
            });
        };

        let segment_id = segment.id();
        let new_ids: Vec<i64> = segment
            .documents()
            .values()
            .filter_map(|doc| self.catalog.id_for_url(&doc.url))
            .collect();
        let indexed = segment.len();

        self.segments.add_segment(segment)?;
        tracing::info!(
            "Created segment {} with {} documents ({} skipped)",
            segment_id,
            indexed,
            skipped
        );

        let embedded = self.embed_documents(&new_ids);

        Ok(SeedReport {
            segment_id: Some(segment_id),
            indexed,
            skipped,
            embedded,
        })
    }

    /// Hybrid search, at most `limit` results, best first
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<HybridResult>> {
        let mut results = self
            .query_engine
            .search(query, &self.segments, &self.catalog)?;
        results.truncate(limit);
        Ok(results)
    }

    /// Query terms as the index sees them
    pub fn query_terms(&self, query: &str) -> Vec<String> {
        self.query_engine.parser().parse(query)
    }

    /// Context snippets for each query term occurrence in a keyword hit
    ///
    /// At most `search.snippets_per_term` per term. Semantic-only results
    /// have no snippets.
    pub fn snippets(&self, terms: &[String], result: &HybridResult) -> Result<Vec<Snippet>> {
        let Some(location) = result.location else {
            return Ok(Vec::new());
        };

        let segment = self.segments.get_segment(location.segment_id)?;
        let Some(document) = segment.document(location.doc_id) else {
            return Ok(Vec::new());
        };

        let mut snippets = Vec::new();
        for term in terms {
            let Some(posting) = segment.index().posting(term, location.doc_id) else {
                continue;
            };

            for (i, &offset) in posting
                .offsets()
                .iter()
                .take(self.config.search.snippets_per_term)
                .enumerate()
            {
                snippets.push(Snippet {
                    term: term.clone(),
                    occurrence: i + 1,
                    text: self
                        .snippets
                        .generate(&document.content, offset as usize, term),
                });
            }
        }

        Ok(snippets)
    }

    /// Merge two live segments into a new one and retire them
    pub fn merge(&mut self, a: SegmentId, b: SegmentId) -> Result<MergeReport> {
        if a == b {
            return Err(QuarryError::InvalidMerge(format!(
                "cannot merge segment {} with itself",
                a
            )));
        }

        let source_documents = self.segments.get_segment(a)?.len() + self.segments.get_segment(b)?.len();

        let segments = &self.segments;
        let catalog = &self.catalog;
        let merged = self.database.transaction(|repo| {
            let target_id = repo.create_segment()?;
            let merged = segments.merge(a, b, target_id)?;

            let mut canonical_ids = Vec::with_capacity(merged.len());
            for document in merged.documents().values() {
                let canonical_id = catalog.id_for_url(&document.url).ok_or_else(|| {
                    QuarryError::Corrupt(format!(
                        "merged document {} has no canonical entry",
                        document.url
                    ))
                })?;
                canonical_ids.push(canonical_id);
            }

            let mapping = repo.map_to_segment(target_id, &canonical_ids)?;
            for ((_, assigned), &expected) in mapping.iter().zip(merged.documents().keys()) {
                if *assigned != expected {
                    return Err(QuarryError::Corrupt(format!(
                        "segment {} assigned local id {} where {} was expected",
                        target_id, assigned, expected
                    )));
                }
            }

            for &doc_id in merged.documents().keys() {
                let tokens = merged.index().reconstruct_tokens(doc_id);
                repo.append_document(target_id, doc_id, &tokens)?;
            }

            repo.deactivate_segment(a, Some(target_id))?;
            repo.deactivate_segment(b, Some(target_id))?;

            Ok(merged)
        })?;

        let report = MergeReport {
            sources: (a, b),
            merged_id: merged.id(),
            documents: merged.len(),
            duplicates_dropped: source_documents - merged.len(),
        };

        self.segments.replace(a, b, merged)?;
        Ok(report)
    }

    /// Embed every canonical document that has no stored embedding
    ///
    /// Returns the number of documents embedded.
    pub fn backfill_embeddings(&self) -> Result<usize> {
        if self.embedder.is_none() {
            return Err(QuarryError::Config(
                "Embeddings are disabled (embedding.enabled = false)".to_string(),
            ));
        }

        let existing = self.database.all_embeddings()?;
        let missing: Vec<i64> = self
            .catalog
            .documents()
            .keys()
            .filter(|id| !existing.contains_key(id))
            .copied()
            .collect();

        tracing::info!("{} documents need embeddings", missing.len());
        Ok(self.embed_documents(&missing))
    }

    /// Answer a question from the best matching documents
    pub fn ask(&self, question: &str) -> Result<RagAnswer> {
        let rag = self.rag.as_ref().ok_or_else(|| {
            QuarryError::Config("LLM answers are disabled (llm.enabled = false)".to_string())
        })?;

        rag.ask(
            question,
            |q| self.search(q, usize::MAX),
            &self.catalog,
        )
    }

    /// Live segments in live-set order
    pub fn segment_stats(&self) -> Vec<SegmentStats> {
        self.segments
            .segments()
            .iter()
            .map(|segment| SegmentStats {
                id: segment.id(),
                documents: segment.len(),
                terms: segment.index().term_count(),
            })
            .collect()
    }

    pub fn database_stats(&self) -> Result<DbStats> {
        self.database.stats()
    }

    pub fn segments(&self) -> &SegmentManager {
        &self.segments
    }

    pub fn catalog(&self) -> &CanonicalCatalog {
        &self.catalog
    }

    pub fn has_semantic_search(&self) -> bool {
        self.query_engine.has_semantic()
    }

    /// Embed and store the given canonical documents in batches
    ///
    /// Failures are logged and the affected batch is skipped.
    fn embed_documents(&self, canonical_ids: &[i64]) -> usize {
        let Some(embedder) = &self.embedder else {
            return 0;
        };

        let mut embedded = 0;
        for batch in canonical_ids.chunks(EMBEDDING_BATCH_SIZE) {
            let texts: Vec<String> = batch
                .iter()
                .filter_map(|id| self.catalog.get(*id))
                .map(embedding_text)
                .collect();
            if texts.len() != batch.len() {
                tracing::warn!("Skipping embedding batch with unknown documents");
                continue;
            }

            let vectors = match embedder.embed_batch(&texts) {
                Ok(vectors) => vectors,
                Err(e) => {
                    tracing::warn!("Failed to embed {} documents: {}", batch.len(), e);
                    continue;
                }
            };

            for (id, vector) in batch.iter().zip(&vectors) {
                match self
                    .database
                    .store_embedding(*id, embedder.model_name(), vector)
                {
                    Ok(()) => embedded += 1,
                    Err(e) => tracing::warn!("Failed to store embedding for {}: {}", id, e),
                }
            }
        }

        embedded
    }
}

fn embedding_text(document: &Document) -> String {
    format!("{}\n{}", document.title, document.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use tempfile::TempDir;

    /// Embeds into a 2-d space by counting two marker words
    struct MarkerEmbedder;

    impl EmbeddingService for MarkerEmbedder {
        fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            let lower = text.to_lowercase();
            Ok(vec![
                lower.matches("ocean").count() as f32 + 0.01,
                lower.matches("desert").count() as f32 + 0.01,
            ])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "marker"
        }
    }

    fn engine(temp_dir: &TempDir, embedder: Option<Arc<dyn EmbeddingService>>) -> SearchEngine {
        let database = Database::new(&temp_dir.path().join("quarry.db"), 64).unwrap();
        SearchEngine::with_components(database, Config::default(), embedder).unwrap()
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("https://a", "Ocean", "the ocean is deep and the ocean is blue"),
            Document::new("https://b", "Desert", "the desert is dry and hot"),
        ]
    }

    #[test]
    fn test_seed_creates_one_segment() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, None);

        let report = engine.seed(&docs()).unwrap();
        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.embedded, 0);

        let stats = engine.segment_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(Some(stats[0].id), report.segment_id);
        assert_eq!(stats[0].documents, 2);
    }

    #[test]
    fn test_reseeding_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, None);

        engine.seed(&docs()).unwrap();
        let again = engine.seed(&docs()).unwrap();

        assert_eq!(again.segment_id, None);
        assert_eq!(again.skipped, 2);
        assert_eq!(engine.segment_stats().len(), 1);
    }

    #[test]
    fn test_batch_duplicates_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, None);

        let mut batch = docs();
        batch.push(Document::new("https://a", "Ocean again", "different text"));
        let report = engine.seed(&batch).unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_snippets_for_keyword_hit() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, None);
        engine.seed(&docs()).unwrap();

        let terms = engine.query_terms("ocean");
        let results = engine.search("ocean", 10).unwrap();
        let snippets = engine.snippets(&terms, &results[0]).unwrap();

        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].occurrence, 1);
        assert_eq!(snippets[1].occurrence, 2);
        assert!(snippets.iter().all(|s| s.text.contains("ocean")));
    }

    #[test]
    fn test_seed_embeds_new_documents() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, Some(Arc::new(MarkerEmbedder)));

        let report = engine.seed(&docs()).unwrap();
        assert_eq!(report.embedded, 2);
        assert_eq!(engine.backfill_embeddings().unwrap(), 0);

        let results = engine.search("desert", 10).unwrap();
        assert_eq!(results[0].url, "https://b");
    }

    #[test]
    fn test_backfill_requires_embedder() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir, None);
        assert!(matches!(
            engine.backfill_embeddings(),
            Err(QuarryError::Config(_))
        ));
    }

    #[test]
    fn test_ask_requires_llm() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine(&temp_dir, None);
        assert!(matches!(engine.ask("why"), Err(QuarryError::Config(_))));
    }

    #[test]
    fn test_merge_with_itself_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = engine(&temp_dir, None);
        let id = engine.seed(&docs()).unwrap().segment_id.unwrap();

        assert!(matches!(
            engine.merge(id, id),
            Err(QuarryError::InvalidMerge(_))
        ));
    }
}
