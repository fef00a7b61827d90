//! Lorekeeper Extractor
//!
//! Turns documents into searchable, embedded knowledge chunks using a local LLM.
//!
//! # Overview
//!
//! An import reads one file, addresses it by the SHA-256 of its bytes, and
//! runs one or all of sixteen extraction strategies against it. Each strategy
//! prompts the chat model, recovers JSON from the free-form reply, decodes
//! records tolerantly, embeds each record and appends one chunk per record
//! to the store.
//!
//! # Architecture
//!
//! ```text
//! File → Importer → Dispatcher → Strategy → ModelGateway (chat, embed)
//!                                         → ChunkStore (append)
//! ```
//!
//! # Key Features
//!
//! - **Content-addressed dedup**: an already-imported document is skipped
//!   before any model call
//! - **Rollback**: chunks written by a failed import are removed by hash
//! - **JSON recovery**: fenced or chatty model replies, trailing commas and
//!   shape mismatches are tolerated
//! - **Best-effort "all" run**: failing strategies are reported and skipped
//!
//! # Example Usage
//!
//! ```
//! use lorekeeper_extractor::{Importer, ImportConfig, ImportOptions, StrategySelection};
//! use lorekeeper_llm::MockGateway;
//! use lorekeeper_store::MemoryStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let file = dir.path().join("aria.md");
//! std::fs::write(&file, "Aria is a merchant of the harbor town.")?;
//!
//! let gateway = MockGateway::new(
//!     r#"[{"name":"Aria","type":"character","description":"A merchant."}]"#,
//! );
//! let mut importer = Importer::new(gateway, MemoryStore::new(), dir.path(), ImportConfig::default())?;
//!
//! let options = ImportOptions::new("llama3", "nomic-embed-text")
//!     .with_strategy(StrategySelection::parse("entity_sheet")?);
//! let report = importer.import_file(&file, &options, None)?;
//!
//! println!("Created {} chunks", report.chunks_created());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]

mod config;
mod dispatcher;
mod error;
mod importer;
pub mod json;
pub mod progress;
pub mod strategies;


pub use config::ImportConfig;
pub use dispatcher::{dispatch, DispatchReport, StrategyFailure, StrategySelection};
pub use error::ExtractorError;
pub use importer::{
    scan_directory, BatchSummary, ImportOptions, ImportReport, Importer, LocalImporter,
    SKIPPED_DIRECTORIES,
};
pub use json::Decoded;
pub use progress::{ChannelProgress, ImportEvent, ImportEventKind, ProgressSink, TracingProgress};
pub use strategies::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
