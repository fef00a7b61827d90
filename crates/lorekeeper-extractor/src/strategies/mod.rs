//! Extraction strategies
//!
//! Every strategy follows the same contract: prompt the model with (a prefix
//! of) the document, recover JSON from the reply, decode records, embed each
//! record and append one chunk per surviving record to the store.
//!
//! Strategies write through a [`StrategyContext`], which hides the concrete
//! gateway and store types behind object-safe adapters so that all sixteen
//! handlers can live in one registry.
//!
//! Failure rules:
//!
//! - chat errors, missing JSON and undecodable JSON fail the strategy
//! - a failed embedding drops that one record and the strategy continues
//! - a failed store write fails the strategy

mod content;
mod links;
mod narrative;
mod planning;
mod structure;

use crate::config::ImportConfig;
use crate::error::ExtractorError;
use crate::json::Decoded;
use crate::progress::{emit, ImportEventKind, ProgressSink};
use lorekeeper_domain::{
    ChatMessage, ChunkMetadata, ChunkStore, ContentType, ImportedDocument, ModelGateway,
    StrategyKind, VectorChunk,
};
use std::fmt::Display;
use tracing::{debug, warn};

pub use links::is_internal_reference;

/// Outcome of one strategy run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    /// Strategy that ran
    pub strategy: StrategyKind,
    /// Records decoded from the model (or found in the text)
    pub records: usize,
    /// Chunks appended to the store
    pub chunks_added: usize,
    /// Records dropped because their embedding failed
    pub records_dropped: usize,
}

impl StrategyReport {
    /// Empty report for a strategy
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            records: 0,
            chunks_added: 0,
            records_dropped: 0,
        }
    }
}

/// One extraction strategy
pub trait Strategy {
    /// Which strategy this is
    fn kind(&self) -> StrategyKind;

    /// Extract chunks from the context's document
    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError>;
}

/// Look up the handler for a strategy
pub fn handler(kind: StrategyKind) -> &'static dyn Strategy {
    match kind {
        StrategyKind::EntitySheet => &content::EntitySheet,
        StrategyKind::WhoWhatWhy => &content::WhoWhatWhy,
        StrategyKind::Keyword => &content::Keyword,
        StrategyKind::Sentence => &content::Sentence,
        StrategyKind::FullQa => &content::FullQa,
        StrategyKind::RelationshipMapping => &narrative::RelationshipMapping,
        StrategyKind::Timeline => &narrative::Timeline,
        StrategyKind::ConflictPlot => &narrative::ConflictPlot,
        StrategyKind::RuleMechanic => &narrative::RuleMechanic,
        StrategyKind::ProjectPlanning => &planning::ProjectPlanning,
        StrategyKind::Requirements => &planning::Requirements,
        StrategyKind::TaskBreakdown => &planning::TaskBreakdown,
        StrategyKind::DocumentSection => &structure::DocumentSection,
        StrategyKind::CodeSnippet => &structure::CodeSnippet,
        StrategyKind::Tags => &links::Tags,
        StrategyKind::CrossReferences => &links::CrossReferences,
    }
}

/// Model calls with the model names already bound
pub(crate) trait ModelAccess {
    fn chat(&self, prompt: &str) -> Result<String, ExtractorError>;
    fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractorError>;
}

/// Append-only view of the chunk store
pub(crate) trait ChunkSink {
    fn add(&mut self, chunk: VectorChunk) -> Result<(), ExtractorError>;
}

/// Binds a gateway to the chat and embedding models of one import
pub(crate) struct BoundModels<'a, G> {
    pub(crate) gateway: &'a G,
    pub(crate) chat_model: &'a str,
    pub(crate) embed_model: &'a str,
}

impl<G> ModelAccess for BoundModels<'_, G>
where
    G: ModelGateway,
    G::Error: Display,
{
    fn chat(&self, prompt: &str) -> Result<String, ExtractorError> {
        self.gateway
            .chat(self.chat_model, &[ChatMessage::user(prompt)])
            .map_err(|e| ExtractorError::ModelInvocation(e.to_string()))
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractorError> {
        self.gateway
            .generate_embedding(self.embed_model, text)
            .map_err(|e| ExtractorError::ModelInvocation(e.to_string()))
    }
}

/// Write access to a store during one import
pub(crate) struct StoreSink<'a, S>(pub(crate) &'a mut S);

impl<S> ChunkSink for StoreSink<'_, S>
where
    S: ChunkStore,
    S::Error: Display,
{
    fn add(&mut self, chunk: VectorChunk) -> Result<(), ExtractorError> {
        self.0
            .add_chunk(chunk)
            .map(|_| ())
            .map_err(|e| ExtractorError::Store(e.to_string()))
    }
}

/// Everything a strategy needs while it runs
pub struct StrategyContext<'a> {
    document: &'a ImportedDocument,
    config: &'a ImportConfig,
    models: &'a dyn ModelAccess,
    sink: &'a mut dyn ChunkSink,
    progress: Option<&'a dyn ProgressSink>,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(
        document: &'a ImportedDocument,
        config: &'a ImportConfig,
        models: &'a dyn ModelAccess,
        sink: &'a mut dyn ChunkSink,
        progress: Option<&'a dyn ProgressSink>,
    ) -> Self {
        Self {
            document,
            config,
            models,
            sink,
            progress,
        }
    }

    /// Document being imported
    pub fn document(&self) -> &'a ImportedDocument {
        self.document
    }

    /// Import configuration
    pub fn config(&self) -> &'a ImportConfig {
        self.config
    }

    pub(crate) fn progress(&self) -> Option<&'a dyn ProgressSink> {
        self.progress
    }

    /// Report progress
    pub fn info(&self, message: impl Into<String>) {
        emit(self.progress, ImportEventKind::Info, message);
    }

    /// Send a single-message chat and return the raw reply
    pub fn ask(&self, prompt: &str) -> Result<String, ExtractorError> {
        debug!("Prompt length: {} chars", prompt.len());
        self.models.chat(prompt)
    }

    /// Chat, then recover and classify JSON from the reply
    ///
    /// `what` names the data for the "no ... found" error.
    pub fn ask_json(
        &self,
        prompt: &str,
        prefer_array: bool,
        what: &str,
    ) -> Result<Decoded, ExtractorError> {
        let response = self.ask(prompt)?;
        Decoded::from_response(&response, prefer_array)
            .ok_or_else(|| ExtractorError::Extraction(format!("no {} found", what)))
    }

    /// Metadata prefilled with the document's provenance
    pub fn base_metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            original_text: self.document.content.clone(),
            source_document: self.document.relative_path.clone(),
            document_type: self.document.doc_type.as_str().to_string(),
            document_hash: self.document.hash.clone(),
            timestamp: self.document.imported_at,
            ..Default::default()
        }
    }

    /// Embed `search_text`, then build and store a chunk from the embedding
    ///
    /// An embedding failure is logged and counted as a dropped record.
    pub fn emit_chunk<F>(
        &mut self,
        report: &mut StrategyReport,
        search_text: &str,
        build: F,
    ) -> Result<(), ExtractorError>
    where
        F: FnOnce(Vec<f32>) -> ChunkDraft,
    {
        let embedding = match self.models.embed(search_text) {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("{}: dropping record, embedding failed: {}", report.strategy, e);
                report.records_dropped += 1;
                return Ok(());
            }
        };

        let draft = build(embedding);
        let chunk = VectorChunk::new(
            self.config.session_tag.clone(),
            draft.content,
            draft.content_type,
            report.strategy,
            draft.embedding,
            draft.metadata,
        )
        .with_canonical(draft.questions, draft.answer);

        self.sink.add(chunk)?;
        report.chunks_added += 1;
        Ok(())
    }
}

/// The strategy-specific parts of a chunk
#[derive(Debug, Clone)]
pub struct ChunkDraft {
    /// Display content
    pub content: String,
    /// Content classification
    pub content_type: ContentType,
    /// Embedding vector
    pub embedding: Vec<f32>,
    /// Metadata
    pub metadata: ChunkMetadata,
    /// Canonical questions
    pub questions: Vec<String>,
    /// Canonical answer
    pub answer: String,
}

impl ChunkDraft {
    /// Draft with no canonical Q&A
    pub fn new(
        content: impl Into<String>,
        content_type: ContentType,
        embedding: Vec<f32>,
        metadata: ChunkMetadata,
    ) -> Self {
        Self {
            content: content.into(),
            content_type,
            embedding,
            metadata,
            questions: Vec::new(),
            answer: String::new(),
        }
    }

    /// Attach canonical Q&A
    pub fn canonical(mut self, questions: Vec<String>, answer: impl Into<String>) -> Self {
        self.questions = questions;
        self.answer = answer.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(handler(kind).kind(), kind);
        }
    }
}
