//! Chunk metadata - one wide record shared by every extraction strategy
//!
//! Each strategy populates only the fields relevant to its extraction shape;
//! everything else stays at its zero value. This keeps a single storage
//! schema for sixteen heterogeneous strategies.

use serde::{Deserialize, Serialize};

/// Strategy-polymorphic attribute bag attached to every chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    /// Full original document text, kept for context at answer time
    pub original_text: String,

    /// Who is involved
    pub who: String,
    /// What happens or is described
    pub what: String,
    /// Why it matters
    pub why: String,
    /// Temporal context
    pub when: String,
    /// Spatial context
    #[serde(rename = "where")]
    pub where_: String,
    /// Mechanism or method
    pub how: String,

    /// Named entities referenced by the chunk
    pub entities: Vec<String>,

    /// Keywords used for lexical matching
    pub search_keywords: Vec<String>,

    /// Keywords extracted as facts
    pub fact_keywords: Vec<String>,

    /// Free-form tags (category, priority, ...)
    pub tags: Vec<String>,

    /// Entity key for key/value indexing (entity name, requirement id, ...)
    pub entity_key: String,

    /// Entity value for key/value indexing
    pub entity_value: String,

    /// Rule-system label (magic, physics, social, ...)
    pub rule_system: String,

    /// Code language for code snippets
    pub code_language: String,

    /// Enclosing function/class for code snippets
    pub code_context: String,

    /// Hashtags found in the source document
    pub document_tags: Vec<String>,

    /// Documents this chunk links to
    pub related_documents: Vec<String>,

    /// Source document path, relative to the import root
    pub source_document: String,

    /// Source document type
    pub document_type: String,

    /// SHA-256 of the source document; the rollback and dedup key
    pub document_hash: String,

    /// Import timestamp (unix seconds)
    pub timestamp: u64,

    /// Position of the sentence in the source, for sentence chunks
    pub sentence_index: usize,
}
