//! Lorekeeper Domain Layer
//!
//! This crate contains the data model of the document import pipeline and
//! the trait interfaces for everything the pipeline talks to. It keeps its
//! dependencies to `uuid` (chunk identifiers) and `serde` derives.
//!
//! ## Key Concepts
//!
//! - **ImportedDocument**: A file read for import, identified by the SHA-256 of its bytes
//! - **VectorChunk**: One retrievable unit - content, embedding, canonical Q&A, metadata
//! - **ChunkMetadata**: The wide attribute bag every strategy writes into
//! - **StrategyKind**: The closed set of extraction strategies
//!
//! ## Architecture
//!
//! - `ModelGateway` is implemented by `lorekeeper-llm`
//! - `ChunkStore` is implemented by `lorekeeper-store`
//! - The pipeline itself lives in `lorekeeper-extractor`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod document;
pub mod metadata;
pub mod strategy;
pub mod traits;

// Re-exports for convenience
pub use chunk::{ChunkId, ContentType, VectorChunk};
pub use document::{DocumentType, ImportedDocument};
pub use metadata::ChunkMetadata;
pub use strategy::StrategyKind;
pub use traits::{ChatMessage, ChunkStore, ModelGateway};
