//! Chunk module - the unit of retrieval produced by an import

use crate::metadata::ChunkMetadata;
use crate::strategy::StrategyKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a chunk based on UUIDv7
///
/// UUIDv7 keeps chunk ids chronologically sortable, so chunks written during
/// one import come back out of the store in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(u128);

impl ChunkId {
    /// Generate a new UUIDv7-based ChunkId
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_domain::ChunkId;
    ///
    /// let id = ChunkId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ChunkId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ChunkId from its hyphenated UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid chunk id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Content classification of a chunk, used at retrieval time to decide
/// how much surrounding context to pull in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Factual statement, 1:1 question/answer mapping
    Fact,

    /// Stories, rules, world-building
    Fictional,

    /// Source code and technical examples
    Code,

    /// Conversational, context-heavy content
    Dialog,
}

impl ContentType {
    /// Get the content type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Fact => "fact",
            ContentType::Fictional => "fictional",
            ContentType::Code => "code",
            ContentType::Dialog => "dialog",
        }
    }

    /// Parse a content type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fact" => Some(ContentType::Fact),
            "fictional" => Some(ContentType::Fictional),
            "code" => Some(ContentType::Code),
            "dialog" => Some(ContentType::Dialog),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrievable chunk - content, embedding, metadata and canonical Q&A
///
/// Chunks are append-only: the import pipeline adds them and may bulk-delete
/// them by document hash, but never edits one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorChunk {
    /// Unique identifier
    pub id: ChunkId,

    /// Owning conversation/session tag (constant for document imports)
    pub chat_id: String,

    /// Display content
    pub content: String,

    /// Content classification
    pub content_type: ContentType,

    /// Strategy that produced this chunk
    pub strategy: StrategyKind,

    /// Embedding vector
    pub embedding: Vec<f32>,

    /// Canonical question phrasings that this chunk answers
    pub canonical_questions: Vec<String>,

    /// Canonical answer
    pub canonical_answer: String,

    /// Strategy-specific metadata
    pub metadata: ChunkMetadata,

    /// When this chunk was created (unix seconds)
    pub created_at: u64,
}

impl VectorChunk {
    /// Create a new chunk with a fresh id and no canonical Q&A
    pub fn new(
        chat_id: impl Into<String>,
        content: impl Into<String>,
        content_type: ContentType,
        strategy: StrategyKind,
        embedding: Vec<f32>,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            id: ChunkId::new(),
            chat_id: chat_id.into(),
            content: content.into(),
            content_type,
            strategy,
            embedding,
            canonical_questions: Vec::new(),
            canonical_answer: String::new(),
            metadata,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }

    /// Attach canonical questions and a canonical answer
    pub fn with_canonical(mut self, questions: Vec<String>, answer: impl Into<String>) -> Self {
        self.canonical_questions = questions;
        self.canonical_answer = answer.into();
        self
    }

    /// Hash of the document this chunk was imported from
    pub fn document_hash(&self) -> &str {
        &self.metadata.document_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_chronological() {
        let id1 = ChunkId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = ChunkId::new();

        assert!(id1 < id2, "Earlier UUIDv7 should be less than later UUIDv7");
    }

    #[test]
    fn test_chunk_id_display_and_parse() {
        let id = ChunkId::new();
        let id_str = id.to_string();
        assert_eq!(id_str.len(), 36);

        let parsed = ChunkId::from_string(&id_str).unwrap();
        assert_eq!(id, parsed);
        assert!(ChunkId::from_string("not-a-chunk-id").is_err());
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!(ContentType::parse("FICTIONAL"), Some(ContentType::Fictional));
        assert_eq!(ContentType::parse("code"), Some(ContentType::Code));
        assert_eq!(ContentType::parse("poem"), None);
        assert_eq!(ContentType::Dialog.to_string(), "dialog");
    }

    #[test]
    fn test_new_chunk_carries_document_hash() {
        let metadata = ChunkMetadata {
            document_hash: "abc123".to_string(),
            timestamp: 42,
            ..Default::default()
        };
        let chunk = VectorChunk::new(
            "document_import",
            "Aria is a merchant",
            ContentType::Fictional,
            StrategyKind::EntitySheet,
            vec![0.1, 0.2],
            metadata,
        )
        .with_canonical(vec!["Who is Aria?".to_string()], "A merchant.");

        assert_eq!(chunk.document_hash(), "abc123");
        assert!(chunk.created_at > 0);
        assert_eq!(chunk.canonical_answer, "A merchant.");
    }

    #[test]
    fn test_chunk_serde_uses_lowercase_tags() {
        let chunk = VectorChunk::new(
            "document_import",
            "content",
            ContentType::Fact,
            StrategyKind::FullQa,
            vec![],
            ChunkMetadata::default(),
        );
        let json = serde_json::to_string(&chunk).unwrap();
        assert!(json.contains("\"content_type\":\"fact\""));
        assert!(json.contains("\"strategy\":\"full_qa\""));
    }
}
