//! In-memory chunk store
//!
//! Keeps chunks in a `Vec` in insertion order. Useful for tests and for
//! dry runs that should not touch a database.

use crate::StoreError;
use lorekeeper_domain::{ChunkId, ChunkStore, VectorChunk};

/// In-memory implementation of ChunkStore
///
/// # Examples
///
/// ```
/// use lorekeeper_store::MemoryStore;
/// use lorekeeper_domain::ChunkStore;
///
/// let store = MemoryStore::new();
/// assert_eq!(store.chunk_count().unwrap(), 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    chunks: Vec<VectorChunk>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every chunk in the store, in insertion order
    pub fn all_chunks(&self) -> &[VectorChunk] {
        &self.chunks
    }
}

impl ChunkStore for MemoryStore {
    type Error = StoreError;

    fn has_document_hash(&self, hash: &str) -> Result<bool, Self::Error> {
        Ok(self.chunks.iter().any(|c| c.document_hash() == hash))
    }

    fn add_chunk(&mut self, chunk: VectorChunk) -> Result<ChunkId, Self::Error> {
        let id = chunk.id;
        self.chunks.push(chunk);
        Ok(id)
    }

    fn chunk_count(&self) -> Result<usize, Self::Error> {
        Ok(self.chunks.len())
    }

    fn remove_chunks_by_document_hash(&mut self, hash: &str) -> Result<usize, Self::Error> {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.document_hash() != hash);
        Ok(before - self.chunks.len())
    }

    fn chunks_by_document_hash(&self, hash: &str) -> Result<Vec<VectorChunk>, Self::Error> {
        Ok(self
            .chunks
            .iter()
            .filter(|c| c.document_hash() == hash)
            .cloned()
            .collect())
    }
}
