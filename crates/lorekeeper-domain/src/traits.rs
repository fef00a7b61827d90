//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the import pipeline and its
//! collaborators. Implementations live in other crates.

use crate::{ChunkId, VectorChunk};

/// A single chat message sent to a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Speaker role; the pipeline only sends "user"
    pub role: String,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for the language model service
///
/// Implemented by the infrastructure layer (lorekeeper-llm). Both calls are
/// blocking round trips.
pub trait ModelGateway {
    /// Error type for model operations
    type Error;

    /// Run a chat completion and return the full response text
    fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String, Self::Error>;

    /// Generate one embedding vector for the given text
    fn generate_embedding(&self, model: &str, text: &str) -> Result<Vec<f32>, Self::Error>;
}

/// Trait for storing imported chunks
///
/// Implemented by the infrastructure layer (lorekeeper-store). The store is
/// keyed for removal by document hash only; chunks are never edited.
pub trait ChunkStore {
    /// Error type for store operations
    type Error;

    /// Whether any chunk carries the given document hash
    fn has_document_hash(&self, hash: &str) -> Result<bool, Self::Error>;

    /// Append a chunk
    fn add_chunk(&mut self, chunk: VectorChunk) -> Result<ChunkId, Self::Error>;

    /// Total number of chunks in the store
    fn chunk_count(&self) -> Result<usize, Self::Error>;

    /// Remove every chunk carrying the given document hash, returning how many were removed
    fn remove_chunks_by_document_hash(&mut self, hash: &str) -> Result<usize, Self::Error>;

    /// All chunks carrying the given document hash, in insertion order
    fn chunks_by_document_hash(&self, hash: &str) -> Result<Vec<VectorChunk>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let message = ChatMessage::user("Extract all entities");
        assert_eq!(message.role, "user");
        assert_eq!(message.content, "Extract all entities");
    }
}
