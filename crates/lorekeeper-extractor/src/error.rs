//! Error types for the import pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while importing a document
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// File could not be read or stat'ed
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being imported
        path: PathBuf,
        /// Underlying IO failure
        source: std::io::Error,
    },

    /// File has zero bytes
    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    /// Trimmed content is shorter than the import threshold
    #[error("Content too short: {0} chars (min: {1})")]
    ContentTooShort(usize, usize),

    /// Content hash already present in the store
    #[error("Document already imported (hash {hash})")]
    Duplicate {
        /// Content hash of the document
        hash: String,
    },

    /// Strategy name not in the known set
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// Chat or embedding transport failure
    #[error("Model error: {0}")]
    ModelInvocation(String),

    /// No JSON could be located in the model response
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// JSON was located but could not be decoded into the expected shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// Chunk store error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// Whether this error means "already imported" rather than a failure
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ExtractorError::Duplicate { .. })
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Schema(e.to_string())
    }
}
