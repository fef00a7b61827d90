//! Import orchestration: read, hash, dedup, dispatch, roll back

use crate::config::ImportConfig;
use crate::dispatcher::{dispatch, DispatchReport, StrategySelection};
use crate::error::ExtractorError;
use crate::progress::{emit, ImportEventKind, ProgressSink};
use crate::strategies::{BoundModels, StoreSink, StrategyContext};
use lorekeeper_domain::{ChunkStore, DocumentType, ImportedDocument, ModelGateway};
use lorekeeper_llm::{OllamaConfig, OllamaGateway};
use lorekeeper_store::SqliteStore;
use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Directories never descended into by [`scan_directory`]
pub const SKIPPED_DIRECTORIES: [&str; 6] = ["node_modules", ".git", "vendor", "dist", "build", ".next"];

/// Per-import settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Model used for chat calls
    pub chat_model: String,
    /// Model used for embeddings
    pub embed_model: String,
    /// Strategies to run
    pub strategy: StrategySelection,
    /// Import even when the content hash is already stored
    pub force: bool,
}

impl ImportOptions {
    /// Run every strategy without forcing
    pub fn new(chat_model: impl Into<String>, embed_model: impl Into<String>) -> Self {
        Self {
            chat_model: chat_model.into(),
            embed_model: embed_model.into(),
            strategy: StrategySelection::All,
            force: false,
        }
    }

    /// Choose the strategies to run
    pub fn with_strategy(mut self, strategy: StrategySelection) -> Self {
        self.strategy = strategy;
        self
    }

    /// Re-import documents whose hash is already stored
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Outcome of one successful file import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Content hash of the document
    pub document_hash: String,
    /// Path relative to the import root
    pub relative_path: String,
    /// Per-strategy results
    pub dispatch: DispatchReport,
}

impl ImportReport {
    /// Chunks created by this import
    pub fn chunks_created(&self) -> usize {
        self.dispatch.chunks_added()
    }
}

/// Outcome of importing a file or directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files considered
    pub files: usize,
    /// Files imported
    pub imported: usize,
    /// Files skipped as duplicates
    pub skipped: usize,
    /// Files that failed, with the error text
    pub failed: Vec<(PathBuf, String)>,
    /// Chunks created across all files
    pub chunks_created: usize,
}

/// Recursively list importable files under `root`, sorted
///
/// Dependency and build directories are skipped.
pub fn scan_directory(root: &Path) -> Result<Vec<PathBuf>, ExtractorError> {
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !SKIPPED_DIRECTORIES.contains(&entry.file_name().to_string_lossy().as_ref())
    });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| ExtractorError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentType::from_extension)
            .is_some();
        if supported {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Imports documents into a chunk store
///
/// Owns the gateway and the store for the lifetime of the importer. Paths
/// are recorded relative to `root`.
///
/// # Examples
///
/// ```
/// use lorekeeper_extractor::{Importer, ImportConfig, ImportOptions, StrategySelection};
/// use lorekeeper_llm::MockGateway;
/// use lorekeeper_store::MemoryStore;
/// use lorekeeper_domain::{ChunkStore, StrategyKind};
///
/// let dir = tempfile::tempdir().unwrap();
/// let file = dir.path().join("notes.md");
/// std::fs::write(&file, "The harbor opens at dawn. Ships leave at noon.").unwrap();
///
/// let mut importer = Importer::new(
///     MockGateway::new("[]"),
///     MemoryStore::new(),
///     dir.path(),
///     ImportConfig::default(),
/// ).unwrap();
///
/// let options = ImportOptions::new("llama3", "nomic-embed-text")
///     .with_strategy(StrategySelection::Single(StrategyKind::Sentence));
/// let report = importer.import_file(&file, &options, None).unwrap();
///
/// assert_eq!(report.relative_path, "notes.md");
/// assert_eq!(report.chunks_created(), 2);
/// assert_eq!(importer.store().chunk_count().unwrap(), 2);
/// ```
pub struct Importer<G, S> {
    gateway: G,
    store: S,
    root: PathBuf,
    config: ImportConfig,
}

/// Importer backed by a local Ollama server and a SQLite database
pub type LocalImporter = Importer<OllamaGateway, SqliteStore>;

impl LocalImporter {
    /// Connect to Ollama and open (or create) the database at `db_path`
    pub fn open(
        db_path: impl AsRef<Path>,
        ollama: OllamaConfig,
        root: impl Into<PathBuf>,
        config: ImportConfig,
    ) -> Result<Self, ExtractorError> {
        let gateway =
            OllamaGateway::new(ollama).map_err(|e| ExtractorError::ModelInvocation(e.to_string()))?;
        let store = SqliteStore::new(db_path).map_err(|e| ExtractorError::Store(e.to_string()))?;
        Self::new(gateway, store, root, config)
    }
}

impl<G, S> Importer<G, S>
where
    G: ModelGateway,
    G::Error: Display,
    S: ChunkStore,
    S::Error: Display,
{
    /// Create an importer
    ///
    /// # Errors
    ///
    /// Returns `ExtractorError::Config` if the configuration is invalid.
    pub fn new(
        gateway: G,
        store: S,
        root: impl Into<PathBuf>,
        config: ImportConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            gateway,
            store,
            root: root.into(),
            config,
        })
    }

    /// The chunk store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the chunk store
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The model gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Import configuration
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Give back the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Import one file
    ///
    /// Validation and dedup happen before any model call. If dispatch fails
    /// after chunks were written, every chunk carrying the document's hash
    /// is removed before the error is returned.
    ///
    /// # Errors
    ///
    /// - `Io`, `EmptyFile`, `ContentTooShort` for unusable files
    /// - `Duplicate` when the hash is stored and `force` is off
    /// - any strategy error when a single strategy was selected
    pub fn import_file(
        &mut self,
        path: &Path,
        options: &ImportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ImportReport, ExtractorError> {
        let document = self.read_document(path)?;

        if !options.force && self.store.has_document_hash(&document.hash).map_err(store_error)? {
            emit(
                progress,
                ImportEventKind::Skipped,
                format!("Skipping {} (already imported)", document.relative_path),
            );
            return Err(ExtractorError::Duplicate {
                hash: document.hash,
            });
        }

        info!(
            "Importing {} ({}, {} bytes) with strategy '{}'",
            document.relative_path,
            document.doc_type,
            document.content.len(),
            options.strategy
        );
        emit(
            progress,
            ImportEventKind::Started,
            format!("Importing {}", document.relative_path),
        );

        let before = self.store.chunk_count().map_err(store_error)?;

        let models = BoundModels {
            gateway: &self.gateway,
            chat_model: &options.chat_model,
            embed_model: &options.embed_model,
        };
        let mut sink = StoreSink(&mut self.store);
        let mut cx = StrategyContext::new(&document, &self.config, &models, &mut sink, progress);

        match dispatch(&mut cx, options.strategy) {
            Ok(dispatch) => {
                let report = ImportReport {
                    document_hash: document.hash.clone(),
                    relative_path: document.relative_path.clone(),
                    dispatch,
                };
                emit(
                    progress,
                    ImportEventKind::Completed,
                    format!(
                        "Imported {}: {} chunks",
                        report.relative_path,
                        report.chunks_created()
                    ),
                );
                Ok(report)
            }
            Err(e) => {
                self.roll_back(&document.hash, before, progress);
                Err(e)
            }
        }
    }

    /// Import a file, or every supported file under a directory
    ///
    /// Files are imported one after another. Duplicates count as skipped;
    /// other errors are collected and the batch continues.
    pub fn import_path(
        &mut self,
        path: &Path,
        options: &ImportOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<BatchSummary, ExtractorError> {
        let files = if path.is_dir() {
            scan_directory(path)?
        } else {
            vec![path.to_path_buf()]
        };

        let mut summary = BatchSummary {
            files: files.len(),
            ..Default::default()
        };

        for (index, file) in files.iter().enumerate() {
            emit(
                progress,
                ImportEventKind::Info,
                format!("[{}/{}] {}", index + 1, files.len(), file.display()),
            );

            match self.import_file(file, options, progress) {
                Ok(report) => {
                    summary.imported += 1;
                    summary.chunks_created += report.chunks_created();
                }
                Err(e) if e.is_duplicate() => summary.skipped += 1,
                Err(e) => {
                    warn!("Import of {} failed: {}", file.display(), e);
                    summary.failed.push((file.clone(), e.to_string()));
                }
            }
        }

        info!(
            "Batch done: {} imported, {} skipped, {} failed, {} chunks",
            summary.imported,
            summary.skipped,
            summary.failed.len(),
            summary.chunks_created
        );
        Ok(summary)
    }

    /// Read and validate a file, then build its document record
    fn read_document(&self, path: &Path) -> Result<ImportedDocument, ExtractorError> {
        let io_error = |source| ExtractorError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = fs::read(path).map_err(io_error)?;
        let metadata = fs::metadata(path).map_err(io_error)?;

        if bytes.is_empty() {
            return Err(ExtractorError::EmptyFile(path.to_path_buf()));
        }

        let content = String::from_utf8_lossy(&bytes).into_owned();
        let trimmed_chars = content.trim().chars().count();
        if trimmed_chars < self.config.min_content_chars {
            return Err(ExtractorError::ContentTooShort(
                trimmed_chars,
                self.config.min_content_chars,
            ));
        }

        let last_modified = metadata.modified().map(unix_seconds).unwrap_or(0);

        Ok(ImportedDocument {
            hash: format!("{:x}", Sha256::digest(&bytes)),
            file_path: path.to_path_buf(),
            relative_path: self.relative_path(path),
            doc_type: DocumentType::from_path(path),
            content,
            imported_at: unix_seconds(SystemTime::now()),
            last_modified,
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Remove chunks written since `before`; failures are reported, never raised
    fn roll_back(&mut self, hash: &str, before: usize, progress: Option<&dyn ProgressSink>) {
        let after = match self.store.chunk_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Rollback skipped, chunk count failed: {}", e);
                emit(
                    progress,
                    ImportEventKind::Info,
                    format!("Rollback failed: {}", e),
                );
                return;
            }
        };

        if after <= before {
            debug!("Nothing to roll back for {}", hash);
            return;
        }

        match self.store.remove_chunks_by_document_hash(hash) {
            Ok(removed) => {
                warn!("Rolled back {} chunks for document {}", removed, hash);
                emit(
                    progress,
                    ImportEventKind::RolledBack { removed },
                    format!("Rolled back {} partial chunks", removed),
                );
            }
            Err(e) => {
                warn!("Rollback of document {} failed: {}", hash, e);
                emit(
                    progress,
                    ImportEventKind::Info,
                    format!("Rollback failed: {}", e),
                );
            }
        }
    }
}

fn store_error(e: impl Display) -> ExtractorError {
    ExtractorError::Store(e.to_string())
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_directory_skips_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/deep")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.md"), "b").unwrap();
        fs::write(root.join("docs/a.RS"), "a").unwrap();
        fs::write(root.join("docs/deep/c.py"), "c").unwrap();
        fs::write(root.join("docs/notes.txt"), "skip").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "skip").unwrap();
        fs::write(root.join(".git/config.md"), "skip").unwrap();

        let files = scan_directory(root).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(relative, vec!["b.md", "docs/a.RS", "docs/deep/c.py"]);
    }

    #[test]
    fn test_scan_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = scan_directory(&dir.path().join("missing"));
        assert!(matches!(result, Err(ExtractorError::Io { .. })));
    }

    #[test]
    fn test_import_options_builder() {
        let options = ImportOptions::new("chat", "embed").with_force(true);
        assert!(options.force);
        assert_eq!(options.strategy, StrategySelection::All);
    }
}
