//! Lorekeeper Storage Layer
//!
//! Implements the `ChunkStore` trait for imported chunks.
//!
//! # Architecture
//!
//! - `SqliteStore`: persistent chunk storage; embeddings, canonical questions
//!   and metadata are stored as JSON columns, the document hash is indexed
//! - `MemoryStore`: in-process store for tests and throwaway runs
//!
//! Both stores are append-only apart from bulk removal by document hash,
//! which is what import rollback relies on.
//!
//! # Examples
//!
//! ```no_run
//! use lorekeeper_store::SqliteStore;
//! use lorekeeper_domain::ChunkStore;
//!
//! let store = SqliteStore::new("lorekeeper.db").unwrap();
//! assert!(!store.has_document_hash("unknown").unwrap());
//! ```

#![warn(missing_docs)]

pub mod memory;

use lorekeeper_domain::{ChunkId, ChunkStore, ContentType, StrategyKind, VectorChunk};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use memory::MemoryStore;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-based implementation of ChunkStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance.
pub struct SqliteStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "SELECT id, chat_id, content, content_type, strategy, embedding,
        canonical_questions, canonical_answer, metadata, created_at
     FROM chunks";

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn chunk_id_to_bytes(id: ChunkId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_chunk_id(bytes: &[u8]) -> Result<ChunkId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for ChunkId, got {}", bytes.len()))
        })?;
        Ok(ChunkId::from_value(u128::from_be_bytes(arr)))
    }

    /// Map a row selected with `SELECT_COLUMNS` back into a chunk
    fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<VectorChunk> {
        fn invalid(
            column: usize,
            ty: rusqlite::types::Type,
            e: impl std::error::Error + Send + Sync + 'static,
        ) -> rusqlite::Error {
            rusqlite::Error::FromSqlConversionFailure(column, ty, Box::new(e))
        }
        use rusqlite::types::Type;

        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_chunk_id(&id_bytes).map_err(|e| invalid(0, Type::Blob, e))?;

        let content_type: String = row.get(3)?;
        let content_type = ContentType::parse(&content_type).ok_or_else(|| {
            invalid(
                3,
                Type::Text,
                StoreError::InvalidData(format!("Unknown content type: {}", content_type)),
            )
        })?;

        let strategy: String = row.get(4)?;
        let strategy = StrategyKind::parse(&strategy).ok_or_else(|| {
            invalid(
                4,
                Type::Text,
                StoreError::InvalidData(format!("Unknown strategy: {}", strategy)),
            )
        })?;

        let embedding: String = row.get(5)?;
        let questions: String = row.get(6)?;
        let metadata: String = row.get(8)?;

        Ok(VectorChunk {
            id,
            chat_id: row.get(1)?,
            content: row.get(2)?,
            content_type,
            strategy,
            embedding: serde_json::from_str(&embedding).map_err(|e| invalid(5, Type::Text, e))?,
            canonical_questions: serde_json::from_str(&questions)
                .map_err(|e| invalid(6, Type::Text, e))?,
            canonical_answer: row.get(7)?,
            metadata: serde_json::from_str(&metadata).map_err(|e| invalid(8, Type::Text, e))?,
            created_at: row.get::<_, i64>(9)? as u64,
        })
    }

    /// Every chunk in the store, in insertion order
    pub fn all_chunks(&self) -> Result<Vec<VectorChunk>, StoreError> {
        let sql = format!("{} ORDER BY rowid", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let chunks = stmt
            .query_map([], Self::row_to_chunk)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chunks)
    }
}

impl ChunkStore for SqliteStore {
    type Error = StoreError;

    fn has_document_hash(&self, hash: &str) -> Result<bool, Self::Error> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM chunks WHERE document_hash = ?1 LIMIT 1",
                params![hash],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }

    fn add_chunk(&mut self, chunk: VectorChunk) -> Result<ChunkId, Self::Error> {
        self.conn.execute(
            "INSERT INTO chunks (id, chat_id, content, content_type, strategy, embedding,
                canonical_questions, canonical_answer, metadata, document_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                Self::chunk_id_to_bytes(chunk.id),
                &chunk.chat_id,
                &chunk.content,
                chunk.content_type.as_str(),
                chunk.strategy.as_str(),
                serde_json::to_string(&chunk.embedding)?,
                serde_json::to_string(&chunk.canonical_questions)?,
                &chunk.canonical_answer,
                serde_json::to_string(&chunk.metadata)?,
                &chunk.metadata.document_hash,
                chunk.created_at as i64,
            ],
        )?;

        debug!("Stored chunk {} ({})", chunk.id, chunk.strategy);
        Ok(chunk.id)
    }

    fn chunk_count(&self) -> Result<usize, Self::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn remove_chunks_by_document_hash(&mut self, hash: &str) -> Result<usize, Self::Error> {
        let removed = self
            .conn
            .execute("DELETE FROM chunks WHERE document_hash = ?1", params![hash])?;
        debug!("Removed {} chunks for document {}", removed, hash);
        Ok(removed)
    }

    fn chunks_by_document_hash(&self, hash: &str) -> Result<Vec<VectorChunk>, Self::Error> {
        let sql = format!("{} WHERE document_hash = ?1 ORDER BY rowid", SELECT_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let chunks = stmt
            .query_map(params![hash], Self::row_to_chunk)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_bytes_round_trip() {
        let id = ChunkId::new();
        let bytes = SqliteStore::chunk_id_to_bytes(id);
        assert_eq!(bytes.len(), 16);
        assert_eq!(SqliteStore::bytes_to_chunk_id(&bytes).unwrap(), id);
    }

    #[test]
    fn test_bytes_to_chunk_id_rejects_wrong_length() {
        let result = SqliteStore::bytes_to_chunk_id(&[1, 2, 3]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }
}
