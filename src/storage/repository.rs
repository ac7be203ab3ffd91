//! SQLite implementation of the repository traits

use super::{DocumentRepository, IndexRepository, SegmentRepository};
use crate::embedding::EmbeddingStore;
use crate::error::{QuarryError, Result};
use crate::index::{DocId, InvertedIndex, Posting};
use crate::segment::{Document, SegmentId};
use crate::text::Token;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;

const ZSTD_LEVEL: i32 = 3;

/// Repository over any SQLite connection handle
///
/// `C` is either a pooled connection (statements auto-commit) or a borrowed
/// connection inside a [`rusqlite::Transaction`].
pub struct SqliteRepository<C> {
    conn: C,
    compression_threshold: usize,
}

impl<C: Deref<Target = Connection>> SqliteRepository<C> {
    pub fn new(conn: C, compression_threshold: usize) -> Self {
        Self {
            conn,
            compression_threshold,
        }
    }

    fn encode_content(&self, content: &str) -> Result<(Vec<u8>, bool)> {
        let bytes = content.as_bytes();
        if bytes.len() < self.compression_threshold {
            return Ok((bytes.to_vec(), false));
        }

        let compressed = zstd::encode_all(bytes, ZSTD_LEVEL).map_err(|e| QuarryError::Io {
            source: e,
            context: "Failed to compress document content".to_string(),
        })?;
        Ok((compressed, true))
    }

    fn term_id(&self, term: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO terms (term) VALUES (?1) ON CONFLICT(term) DO NOTHING",
            params![term],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM terms WHERE term = ?1",
            params![term],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

fn decode_content(id: i64, blob: Vec<u8>, compressed: bool) -> Result<String> {
    let bytes = if compressed {
        zstd::decode_all(&blob[..]).map_err(|e| {
            QuarryError::Corrupt(format!("content of document {} failed to decompress: {}", id, e))
        })?
    } else {
        blob
    };

    String::from_utf8(bytes)
        .map_err(|_| QuarryError::Corrupt(format!("content of document {} is not UTF-8", id)))
}

fn decode_u32_list(raw: &str, what: &str) -> Result<Vec<u32>> {
    serde_json::from_str(raw).map_err(|e| QuarryError::Json {
        source: e,
        context: format!("Failed to decode posting {}", what),
    })
}

fn encode_u32_list(values: &[u32]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| QuarryError::Json {
        source: e,
        context: "Failed to encode posting".to_string(),
    })
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn blob_to_vector(canonical_id: i64, blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if blob.len() != dimension * 4 {
        return Err(QuarryError::Corrupt(format!(
            "embedding of document {} has {} bytes, expected {}",
            canonical_id,
            blob.len(),
            dimension * 4
        )));
    }

    Ok(blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

impl<C: Deref<Target = Connection>> DocumentRepository for SqliteRepository<C> {
    fn save_canonical_documents(&self, documents: &[Document]) -> Result<HashMap<String, i64>> {
        let now = chrono::Utc::now().timestamp();
        let mut ids = HashMap::with_capacity(documents.len());

        for doc in documents {
            let hash = content_hash(&doc.content);
            let (content, compressed) = self.encode_content(&doc.content)?;

            let inserted = self.conn.execute(
                "INSERT INTO canonical_documents (url, title, content, compressed, content_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(url) DO NOTHING",
                params![doc.url, doc.title, content, compressed, hash, now],
            )?;

            let (id, stored_hash): (i64, String) = self.conn.query_row(
                "SELECT id, content_hash FROM canonical_documents WHERE url = ?1",
                params![doc.url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            if inserted == 0 && stored_hash != hash {
                tracing::warn!(
                    "Content for {} differs from the stored document {}; keeping the stored version",
                    doc.url,
                    id
                );
            }

            ids.insert(doc.url.clone(), id);
        }

        Ok(ids)
    }

    fn load_canonical_documents(&self) -> Result<BTreeMap<i64, Document>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, url, title, content, compressed FROM canonical_documents")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut documents = BTreeMap::new();
        for row in rows {
            let (id, url, title, blob, compressed) = row?;
            let content = decode_content(id, blob, compressed)?;
            documents.insert(id, Document { url, title, content });
        }

        Ok(documents)
    }

    fn map_to_segment(
        &self,
        segment_id: SegmentId,
        canonical_ids: &[i64],
    ) -> Result<Vec<(i64, DocId)>> {
        let max_doc_id: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(doc_id), 0) FROM segment_documents WHERE segment_id = ?1",
            params![segment_id],
            |row| row.get(0),
        )?;

        let mut next = DocId::try_from(max_doc_id)
            .map_err(|_| QuarryError::Corrupt(format!("segment {} doc id overflow", segment_id)))?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO segment_documents (segment_id, doc_id, canonical_doc_id) VALUES (?1, ?2, ?3)",
        )?;

        let mut mapping = Vec::with_capacity(canonical_ids.len());
        for &canonical_id in canonical_ids {
            next += 1;
            stmt.execute(params![segment_id, next, canonical_id])?;
            mapping.push((canonical_id, next));
        }

        Ok(mapping)
    }

    fn load_segment_documents(&self, segment_id: SegmentId) -> Result<BTreeMap<DocId, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT doc_id, canonical_doc_id FROM segment_documents WHERE segment_id = ?1",
        )?;

        let rows = stmt.query_map(params![segment_id], |row| {
            Ok((row.get::<_, DocId>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut mapping = BTreeMap::new();
        for row in rows {
            let (doc_id, canonical_id) = row?;
            mapping.insert(doc_id, canonical_id);
        }

        Ok(mapping)
    }
}

impl<C: Deref<Target = Connection>> IndexRepository for SqliteRepository<C> {
    fn append_document(&self, segment_id: SegmentId, doc_id: DocId, tokens: &[Token]) -> Result<()> {
        let mut postings: BTreeMap<&str, Posting> = BTreeMap::new();
        for token in tokens {
            postings
                .entry(token.term.as_str())
                .or_default()
                .add_occurrence(token.position, token.offset);
        }

        for (term, posting) in postings {
            let term_id = self.term_id(term)?;
            self.conn.execute(
                "INSERT INTO postings (segment_id, term_id, doc_id, tf, positions, offsets)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    segment_id,
                    term_id,
                    doc_id,
                    posting.term_frequency(),
                    encode_u32_list(posting.positions())?,
                    encode_u32_list(posting.offsets())?,
                ],
            )?;
        }

        Ok(())
    }

    fn load_index(&self, segment_id: SegmentId) -> Result<InvertedIndex> {
        let mut stmt = self.conn.prepare(
            "SELECT t.term, p.doc_id, p.tf, p.positions, p.offsets
             FROM postings p
             JOIN terms t ON t.id = p.term_id
             WHERE p.segment_id = ?1",
        )?;

        let rows = stmt.query_map(params![segment_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, DocId>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut index = InvertedIndex::new();
        for row in rows {
            let (term, doc_id, tf, positions, offsets) = row?;
            let positions = decode_u32_list(&positions, "positions")?;
            let offsets = decode_u32_list(&offsets, "offsets")?;

            let posting = Posting::from_parts(positions, offsets)
                .filter(|p| p.term_frequency() == tf)
                .ok_or_else(|| {
                    QuarryError::Corrupt(format!(
                        "posting ({}, {}) in segment {} does not match its term frequency",
                        term, doc_id, segment_id
                    ))
                })?;

            index.insert_posting(&term, doc_id, posting);
        }

        Ok(index)
    }
}

impl<C: Deref<Target = Connection>> SegmentRepository for SqliteRepository<C> {
    fn create_segment(&self) -> Result<SegmentId> {
        self.conn.execute(
            "INSERT INTO segments (active, created_at) VALUES (1, ?1)",
            params![chrono::Utc::now().timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn load_active_segment_ids(&self) -> Result<Vec<SegmentId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM segments WHERE active = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<SegmentId>, _>>()?;
        Ok(ids)
    }

    fn deactivate_segment(
        &self,
        segment_id: SegmentId,
        merged_into: Option<SegmentId>,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE segments SET active = 0, deactivated_at = ?1, merged_into = ?2
             WHERE id = ?3 AND active = 1",
            params![chrono::Utc::now().timestamp(), merged_into, segment_id],
        )?;

        if updated == 0 {
            return Err(QuarryError::SegmentNotFound { id: segment_id });
        }
        Ok(())
    }

    fn is_canonical_doc_in_active_segment(&self, canonical_id: i64) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM segment_documents sd
                JOIN segments s ON s.id = sd.segment_id
                WHERE s.active = 1 AND sd.canonical_doc_id = ?1
             )",
            params![canonical_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl<C: Deref<Target = Connection>> EmbeddingStore for SqliteRepository<C> {
    fn store_embedding(&self, canonical_id: i64, model: &str, vector: &[f32]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO embeddings (canonical_doc_id, vector, dimension, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(canonical_doc_id) DO UPDATE SET
                vector = excluded.vector,
                dimension = excluded.dimension,
                model = excluded.model,
                created_at = excluded.created_at",
            params![
                canonical_id,
                vector_to_blob(vector),
                vector.len() as i64,
                model,
                chrono::Utc::now().timestamp()
            ],
        )?;
        Ok(())
    }

    fn get_embedding(&self, canonical_id: i64) -> Result<Option<Vec<f32>>> {
        let row = self
            .conn
            .query_row(
                "SELECT vector, dimension FROM embeddings WHERE canonical_doc_id = ?1",
                params![canonical_id],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        row.map(|(blob, dimension)| blob_to_vector(canonical_id, &blob, dimension as usize))
            .transpose()
    }

    fn all_embeddings(&self) -> Result<BTreeMap<i64, Vec<f32>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT canonical_doc_id, vector, dimension FROM embeddings")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut embeddings = BTreeMap::new();
        for row in rows {
            let (id, blob, dimension) = row?;
            embeddings.insert(id, blob_to_vector(id, &blob, dimension as usize)?);
        }

        Ok(embeddings)
    }
}
