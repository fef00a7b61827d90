//! Structure-aware strategies: markdown sections and code snippets

use super::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
use crate::error::ExtractorError;
use crate::json::{self, content_prefix, text, LooseRecord};
use lorekeeper_domain::{ChunkMetadata, ContentType, StrategyKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// A markdown section: the text under one heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSection {
    /// Heading text without the leading `#`s (empty before the first heading)
    pub heading: String,
    /// Lines under the heading, each terminated by a newline
    pub content: String,
    /// Number of `#`s in the heading
    pub level: usize,
}

/// Split markdown into sections at every line starting with `#`
///
/// A heading with no lines under it is replaced by the next heading.
pub fn split_markdown_sections(content: &str) -> Vec<MarkdownSection> {
    let mut sections = Vec::new();
    let mut heading = String::new();
    let mut level = 0;
    let mut body = String::new();

    for line in content.split('\n') {
        if line.starts_with('#') {
            if !body.is_empty() {
                sections.push(MarkdownSection {
                    heading: heading.clone(),
                    content: std::mem::take(&mut body),
                    level,
                });
            }
            level = line.chars().take_while(|c| *c == '#').count();
            heading = line.trim_start_matches('#').trim().to_string();
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    if !body.is_empty() {
        sections.push(MarkdownSection {
            heading,
            content: body,
            level,
        });
    }

    sections
}

/// One chunk per markdown section, keyed by a model-written question
pub struct DocumentSection;

impl DocumentSection {
    /// Ask the model which question a section answers, falling back to the heading
    fn section_question(cx: &StrategyContext<'_>, section: &MarkdownSection) -> String {
        let prompt = format!(
            r#"Generate a concise question that this documentation section answers.

Heading: {}
Content: {}

Return ONLY the question (one line, no quotes):"#,
            section.heading,
            content_prefix(&section.content, cx.config().section_prefix_chars)
        );

        match cx.ask(&prompt) {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => section.heading.clone(),
            Err(e) => {
                warn!("Section question failed for '{}': {}", section.heading, e);
                section.heading.clone()
            }
        }
    }
}

impl Strategy for DocumentSection {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DocumentSection
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        let document = cx.document();
        cx.info(format!("Processing markdown: {}", document.relative_path));
        let mut report = StrategyReport::new(self.kind());

        for section in split_markdown_sections(&document.content) {
            if section.content.trim().is_empty() {
                continue;
            }
            report.records += 1;

            let question = Self::section_question(cx, &section);
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &section.content, |embedding| {
                let metadata = ChunkMetadata {
                    original_text: section.content.clone(),
                    search_keywords: vec![
                        "markdown".to_string(),
                        "documentation".to_string(),
                        section.heading.clone(),
                    ],
                    ..base
                };
                ChunkDraft::new(section.content.clone(), ContentType::Fact, embedding, metadata)
                    .canonical(vec![question], section.content.clone())
            })?;
        }

        Ok(report)
    }
}

/// Model-classified code snippets, searchable by their one-line summary
pub struct CodeSnippet;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snippet {
    code: String,
    summary: String,
    context: String,
    snippet_type: String,
}

impl LooseRecord for Snippet {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            code: text(map, "code"),
            summary: text(map, "summary"),
            context: text(map, "context"),
            snippet_type: text(map, "snippet_type"),
        }
    }
}

impl Strategy for CodeSnippet {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CodeSnippet
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        let document = cx.document();
        cx.info(format!("Processing code: {}", document.relative_path));
        let mut report = StrategyReport::new(self.kind());
        let language = document.doc_type.as_str();

        let prompt = format!(
            r#"Analyze this {} code and extract meaningful code snippets with one-liner summaries.

For each function, method, class, or significant code block, provide:
1. The exact code
2. A one-liner summary (what it does, not how)
3. Context (function/class name)
4. Type (function/class/method/snippet)

File: {}
Code:
{}

Return ONLY a JSON array (no markdown, no explanation):
[
  {{
    "code": "the exact code snippet",
    "summary": "one-line description of what it does",
    "context": "function or class name",
    "snippet_type": "function|class|method|snippet"
  }}
]"#,
            language, document.relative_path, document.content
        );

        let snippets: Vec<Snippet> =
            json::decode_many(cx.ask_json(&prompt, true, "code snippets")?)?;

        for snippet in snippets.into_iter().filter(|s| !s.summary.is_empty()) {
            report.records += 1;
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &snippet.summary, |embedding| {
                let metadata = ChunkMetadata {
                    original_text: snippet.code.clone(),
                    search_keywords: vec![
                        language.to_string(),
                        snippet.snippet_type.clone(),
                        snippet.context.clone(),
                    ],
                    code_language: language.to_string(),
                    code_context: snippet.context.clone(),
                    ..base
                };
                ChunkDraft::new(snippet.summary.clone(), ContentType::Code, embedding, metadata)
                    .canonical(vec![snippet.summary.clone()], snippet.code.clone())
            })?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sections() {
        let md = "Intro line\n# Title\nBody one\n## Sub\nBody two\nmore\n";
        let sections = split_markdown_sections(md);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[0].content, "Intro line\n");
        assert_eq!(sections[1].heading, "Title");
        assert_eq!(sections[1].level, 1);
        assert_eq!(sections[2].heading, "Sub");
        assert_eq!(sections[2].level, 2);
        assert_eq!(sections[2].content, "Body two\nmore\n\n");
    }

    #[test]
    fn test_empty_heading_is_replaced_by_next() {
        let sections = split_markdown_sections("# A\n# B\ntext");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "B");
        assert_eq!(sections[0].content, "text\n");
    }

    #[test]
    fn test_no_headings_is_one_section() {
        let sections = split_markdown_sections("just prose");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].level, 0);
    }
}
