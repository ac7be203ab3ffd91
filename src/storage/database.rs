//! SQLite database management with migrations
//!
//! Provides structured storage for canonical documents, segments, postings
//! and embeddings

use super::SqliteRepository;
use crate::embedding::EmbeddingStore;
use crate::error::{QuarryError, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database manager with migration support
pub struct Database {
    pool: DbPool,
    compression_threshold: usize,
}

impl Database {
    /// Open (or create) the database at `db_path`
    ///
    /// Canonical document content of at least `compression_threshold` bytes
    /// is stored zstd-compressed.
    pub fn new(db_path: &Path, compression_threshold: usize) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QuarryError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        // Per-connection settings; journal mode is persistent and set below
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )
        });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| QuarryError::Pool(format!("Failed to create connection pool: {}", e)))?;

        {
            let conn = pool
                .get()
                .map_err(|e| QuarryError::Pool(format!("Failed to get connection: {}", e)))?;

            // Returns the resulting mode as a row, so query instead of execute
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }

        let db = Self {
            pool,
            compression_threshold,
        };

        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| QuarryError::Pool(format!("Failed to get connection: {}", e)))
    }

    /// Repository over a pooled connection, each statement auto-committed
    pub fn repository(&self) -> Result<SqliteRepository<PooledConnection<SqliteConnectionManager>>> {
        Ok(SqliteRepository::new(
            self.get_conn()?,
            self.compression_threshold,
        ))
    }

    /// Run `f` inside one write transaction
    ///
    /// Commits when `f` returns `Ok`, rolls everything back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteRepository<&Connection>) -> Result<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let outcome = {
            let repo = SqliteRepository::new(&*tx, self.compression_threshold);
            f(&repo)
        };

        match outcome {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!("Rollback failed after error '{}': {}", e, rollback_err);
                }
                Err(e)
            }
        }
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.get_conn()?;

        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(DbStats {
            canonical_document_count: count("SELECT COUNT(*) FROM canonical_documents")?,
            active_segment_count: count("SELECT COUNT(*) FROM segments WHERE active = 1")?,
            retired_segment_count: count("SELECT COUNT(*) FROM segments WHERE active = 0")?,
            term_count: count("SELECT COUNT(*) FROM terms")?,
            posting_count: count("SELECT COUNT(*) FROM postings")?,
            embedding_count: count("SELECT COUNT(*) FROM embeddings")?,
        })
    }
}

impl EmbeddingStore for Database {
    fn store_embedding(&self, canonical_id: i64, model: &str, vector: &[f32]) -> Result<()> {
        self.repository()?.store_embedding(canonical_id, model, vector)
    }

    fn get_embedding(&self, canonical_id: i64) -> Result<Option<Vec<f32>>> {
        self.repository()?.get_embedding(canonical_id)
    }

    fn all_embeddings(&self) -> Result<BTreeMap<i64, Vec<f32>>> {
        self.repository()?.all_embeddings()
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbStats {
    pub canonical_document_count: usize,
    pub active_segment_count: usize,
    pub retired_segment_count: usize,
    pub term_count: usize,
    pub posting_count: usize,
    pub embedding_count: usize,
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Canonical documents, unique by URL
    CREATE TABLE canonical_documents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        content BLOB NOT NULL,
        compressed BOOLEAN NOT NULL DEFAULT 0,
        content_hash TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );

    -- Segments; retired rows stay for audit
    CREATE TABLE segments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        active BOOLEAN NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL,
        deactivated_at INTEGER,
        merged_into INTEGER,
        FOREIGN KEY (merged_into) REFERENCES segments(id)
    );

    CREATE INDEX idx_segments_active ON segments(active);

    -- Segment-local ids of canonical documents
    CREATE TABLE segment_documents (
        segment_id INTEGER NOT NULL,
        doc_id INTEGER NOT NULL,
        canonical_doc_id INTEGER NOT NULL,
        PRIMARY KEY (segment_id, doc_id),
        FOREIGN KEY (segment_id) REFERENCES segments(id),
        FOREIGN KEY (canonical_doc_id) REFERENCES canonical_documents(id)
    );

    CREATE INDEX idx_segment_documents_canonical ON segment_documents(canonical_doc_id);

    -- Term dictionary shared by all segments
    CREATE TABLE terms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        term TEXT NOT NULL UNIQUE
    );

    -- Postings; positions and offsets are JSON arrays
    CREATE TABLE postings (
        segment_id INTEGER NOT NULL,
        term_id INTEGER NOT NULL,
        doc_id INTEGER NOT NULL,
        tf INTEGER NOT NULL,
        positions TEXT NOT NULL,
        offsets TEXT NOT NULL,
        PRIMARY KEY (segment_id, term_id, doc_id),
        FOREIGN KEY (segment_id, doc_id) REFERENCES segment_documents(segment_id, doc_id),
        FOREIGN KEY (term_id) REFERENCES terms(id)
    );

    -- Embeddings table (little-endian f32 vectors)
    CREATE TABLE embeddings (
        canonical_doc_id INTEGER PRIMARY KEY,
        vector BLOB NOT NULL,
        dimension INTEGER NOT NULL,
        model TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (canonical_doc_id) REFERENCES canonical_documents(id) ON DELETE CASCADE
    );

    CREATE INDEX idx_embeddings_model ON embeddings(model);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Document;
    use crate::storage::{DocumentRepository, SegmentRepository};
    use tempfile::TempDir;

    fn open(temp_dir: &TempDir) -> Database {
        Database::new(&temp_dir.path().join("test.db"), 1024).unwrap()
    }

    #[test]
    fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let _db = Database::new(&db_path, 1024).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir);

        let conn = db.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_reopen_does_not_reapply_migrations() {
        let temp_dir = TempDir::new().unwrap();
        drop(open(&temp_dir));
        let db = open(&temp_dir);

        let conn = db.get_conn().unwrap();
        let rows: i32 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_schema_exists() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir);
        let conn = db.get_conn().unwrap();

        let tables = vec![
            "canonical_documents",
            "segments",
            "segment_documents",
            "terms",
            "postings",
            "embeddings",
        ];

        for table in tables {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_foreign_keys_enabled_on_every_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir);

        let first = db.get_conn().unwrap();
        let second = db.get_conn().unwrap();

        for conn in [&first, &second] {
            let fk_enabled: i32 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(fk_enabled, 1);
        }
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir);

        let result: Result<()> = db.transaction(|repo| {
            repo.create_segment()?;
            repo.save_canonical_documents(&[Document::new("u", "t", "c")])?;
            Err(QuarryError::InvalidMerge("abort".to_string()))
        });
        assert!(result.is_err());

        let stats = db.stats().unwrap();
        assert_eq!(stats.active_segment_count, 0);
        assert_eq!(stats.canonical_document_count, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir);

        let id = db.transaction(|repo| repo.create_segment()).unwrap();

        let active = db.repository().unwrap().load_active_segment_ids().unwrap();
        assert_eq!(active, vec![id]);
    }
}
