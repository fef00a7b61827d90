//! Relationship strategies found by pattern matching: hashtags and links
//!
//! Neither strategy calls the chat model. A document without tags or links
//! yields zero chunks and still succeeds.

use super::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
use crate::error::ExtractorError;
use lorekeeper_domain::{ChunkMetadata, ContentType, StrategyKind};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

fn hashtag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([a-zA-Z0-9_-]+)").expect("static pattern"))
}

fn markdown_link() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("static pattern"))
}

fn wiki_link() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("static pattern"))
}

/// Unique hashtags in a text, sorted
pub fn extract_tags(content: &str) -> Vec<String> {
    hashtag()
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A link from the document to another document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Link text
    pub text: String,
    /// Link target
    pub link: String,
}

/// Internal markdown links followed by wiki links, in document order
pub fn extract_references(content: &str) -> Vec<Reference> {
    let markdown = markdown_link()
        .captures_iter(content)
        .filter(|caps| is_internal_reference(&caps[2]))
        .map(|caps| Reference {
            text: caps[1].to_string(),
            link: caps[2].to_string(),
        });

    let wiki = wiki_link().captures_iter(content).map(|caps| Reference {
        text: caps[1].to_string(),
        link: caps[1].to_string(),
    });

    markdown.chain(wiki).collect()
}

/// Whether a link points at another document in the same collection
///
/// # Examples
///
/// ```
/// use lorekeeper_extractor::strategies::is_internal_reference;
///
/// assert!(is_internal_reference("./lore/aria.md"));
/// assert!(is_internal_reference("Guilds"));
/// assert!(is_internal_reference("http://localhost:3000/notes.md"));
/// assert!(!is_internal_reference("http://localhost:3000/docs"));
/// assert!(!is_internal_reference("https://example.com"));
/// assert!(!is_internal_reference("#heading"));
/// assert!(!is_internal_reference("mailto:bard@example.com"));
/// ```
pub fn is_internal_reference(link: &str) -> bool {
    let link = link.to_lowercase();

    if (link.starts_with("http://") || link.starts_with("https://"))
        && !link.contains("localhost")
        && !link.contains("127.0.0.1")
    {
        return false;
    }

    if link.starts_with('#') {
        return false;
    }

    if link.ends_with(".md") || link.starts_with("./") || link.starts_with("../") {
        return true;
    }

    !link.contains("://") && !link.contains('@')
}

/// One chunk listing the document's hashtags
pub struct Tags;

impl Strategy for Tags {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tags
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting tags and categorization");
        let mut report = StrategyReport::new(self.kind());
        let document = cx.document();

        let tags = extract_tags(&document.content);
        if tags.is_empty() {
            return Ok(report);
        }
        report.records = 1;

        let path = &document.relative_path;
        let context = format!("Document {} contains topics: {}", path, tags.join(", "));
        let base = cx.base_metadata();

        cx.emit_chunk(&mut report, &context, |embedding| {
            let questions = vec![
                format!("What topics are covered in {}?", path),
                format!("What documents are tagged with {}?", tags.join(" or ")),
            ];
            let answer = format!("{} covers: {}", path, tags.join(", "));
            let metadata = ChunkMetadata {
                search_keywords: tags.clone(),
                document_tags: tags,
                ..base
            };
            ChunkDraft::new(context.clone(), ContentType::Fact, embedding, metadata)
                .canonical(questions, answer)
        })?;

        Ok(report)
    }
}

/// One chunk per link to another document
pub struct CrossReferences;

impl Strategy for CrossReferences {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CrossReferences
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting document cross-references");
        let mut report = StrategyReport::new(self.kind());
        let document = cx.document();
        let path = &document.relative_path;

        let references = extract_references(&document.content);
        report.records = references.len();

        for reference in references {
            let statement = format!("{} references {}: {}", path, reference.link, reference.text);
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &statement, |embedding| {
                let questions = vec![
                    format!("What does {} reference?", path),
                    format!("What documents reference {}?", reference.link),
                    format!("How are {} and {} related?", path, reference.link),
                ];
                let answer = format!(
                    "{} links to {} with context: {}",
                    path, reference.link, reference.text
                );
                let metadata = ChunkMetadata {
                    search_keywords: vec![
                        path.clone(),
                        reference.link.clone(),
                        reference.text.clone(),
                    ],
                    related_documents: vec![reference.link.clone()],
                    ..base
                };
                ChunkDraft::new(statement.clone(), ContentType::Fact, embedding, metadata)
                    .canonical(questions, answer)
            })?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tags_unique_sorted() {
        let content = "# Heading\nNotes on #magic and #dragons.\nMore #magic, #lore_2 and #x-y.";
        assert_eq!(extract_tags(content), vec!["dragons", "lore_2", "magic", "x-y"]);
    }

    #[test]
    fn test_extract_tags_ignores_headings() {
        assert!(extract_tags("# Title\n## Subtitle\nplain text").is_empty());
    }

    #[test]
    fn test_extract_references_filters_external() {
        let content = "See [Aria](./aria.md), [site](https://example.com), \
                       [top](#top) and [[Harbor Town]].";
        let refs = extract_references(content);
        assert_eq!(
            refs,
            vec![
                Reference {
                    text: "Aria".to_string(),
                    link: "./aria.md".to_string()
                },
                Reference {
                    text: "Harbor Town".to_string(),
                    link: "Harbor Town".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_internal_reference_rules() {
        assert!(is_internal_reference("../README.MD"));
        assert!(is_internal_reference("HTTP://127.0.0.1/lore.md"));
        assert!(!is_internal_reference("http://127.0.0.1/page"));
        assert!(is_internal_reference("guide/setup"));
        assert!(!is_internal_reference("ftp://files.example.com"));
        assert!(!is_internal_reference("someone@example.com"));
    }
}
