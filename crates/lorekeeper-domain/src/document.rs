//! Document module - the content-addressed input to an import

use std::fmt;
use std::path::{Path, PathBuf};

/// Detected type of an imported document, derived from its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Markdown prose
    Markdown,
    /// Go source
    Go,
    /// TypeScript source
    TypeScript,
    /// JavaScript source
    JavaScript,
    /// Python source
    Python,
    /// Rust source
    Rust,
    /// Anything else
    Other,
}

impl DocumentType {
    /// Every extension the importer recognises, paired with its type
    pub const SUPPORTED_EXTENSIONS: [(&'static str, DocumentType); 8] = [
        ("md", DocumentType::Markdown),
        ("go", DocumentType::Go),
        ("ts", DocumentType::TypeScript),
        ("tsx", DocumentType::TypeScript),
        ("js", DocumentType::JavaScript),
        ("jsx", DocumentType::JavaScript),
        ("py", DocumentType::Python),
        ("rs", DocumentType::Rust),
    ];

    /// Detect the type of a file from its extension (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_domain::DocumentType;
    /// use std::path::Path;
    ///
    /// assert_eq!(DocumentType::from_path(Path::new("notes/README.MD")), DocumentType::Markdown);
    /// assert_eq!(DocumentType::from_path(Path::new("main.rs")), DocumentType::Rust);
    /// assert_eq!(DocumentType::from_path(Path::new("data.csv")), DocumentType::Other);
    /// ```
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .unwrap_or(DocumentType::Other)
    }

    /// Look up a supported extension (without the leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::SUPPORTED_EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, doc_type)| *doc_type)
    }

    /// Get the document type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Markdown => "markdown",
            DocumentType::Go => "go",
            DocumentType::TypeScript => "typescript",
            DocumentType::JavaScript => "javascript",
            DocumentType::Python => "python",
            DocumentType::Rust => "rust",
            DocumentType::Other => "other",
        }
    }

    /// Whether this is a source code type
    pub fn is_code(&self) -> bool {
        !matches!(self, DocumentType::Markdown | DocumentType::Other)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document read for import
///
/// The id is the SHA-256 hex digest of the raw bytes, so identical content
/// always maps to the same document regardless of path. Documents are built
/// once per import call and never persisted on their own; only the chunks
/// they produce are stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDocument {
    /// Content hash (SHA-256, lowercase hex)
    pub hash: String,

    /// Path the document was read from
    pub file_path: PathBuf,

    /// Path relative to the import root
    pub relative_path: String,

    /// Detected document type
    pub doc_type: DocumentType,

    /// Raw content as text
    pub content: String,

    /// When the import started (unix seconds)
    pub imported_at: u64,

    /// Source file modification time (unix seconds)
    pub last_modified: u64,
}

impl ImportedDocument {
    /// Document identity; always equal to the content hash
    pub fn id(&self) -> &str {
        &self.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_types() {
        assert!(DocumentType::Go.is_code());
        assert!(DocumentType::TypeScript.is_code());
        assert!(DocumentType::Rust.is_code());
        assert!(!DocumentType::Markdown.is_code());
        assert!(!DocumentType::Other.is_code());
    }

    #[test]
    fn test_extension_lookup() {
        assert_eq!(DocumentType::from_extension("TSX"), Some(DocumentType::TypeScript));
        assert_eq!(DocumentType::from_extension("jsx"), Some(DocumentType::JavaScript));
        assert_eq!(DocumentType::from_extension("txt"), None);
        assert_eq!(DocumentType::from_path(Path::new("Makefile")), DocumentType::Other);
    }

    #[test]
    fn test_document_id_is_hash() {
        let doc = ImportedDocument {
            hash: "deadbeef".to_string(),
            file_path: PathBuf::from("/tmp/a.md"),
            relative_path: "a.md".to_string(),
            doc_type: DocumentType::Markdown,
            content: "# Title".to_string(),
            imported_at: 0,
            last_modified: 0,
        };
        assert_eq!(doc.id(), "deadbeef");
    }
}
