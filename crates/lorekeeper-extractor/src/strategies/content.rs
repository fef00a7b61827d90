//! General content strategies: entities, who/what/why, keywords, sentences, Q&A

use super::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
use crate::error::ExtractorError;
use crate::json::{self, content_prefix, text, LooseRecord};
use lorekeeper_domain::{ChunkMetadata, ContentType, StrategyKind};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Characters, locations, items and factions, one chunk each
pub struct EntitySheet;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entity {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    description: String,
}

impl LooseRecord for Entity {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            name: text(map, "name"),
            kind: text(map, "type"),
            description: text(map, "description"),
        }
    }
}

impl Strategy for EntitySheet {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EntitySheet
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting entities (characters, locations, items)");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all entities (characters, locations, items, factions) from this text.
For each entity, provide:
1. Entity name
2. Entity type (character/location/item/faction)
3. Full description/attributes

Text:
{}

Return ONLY a JSON array:
[{{"name": "Entity Name", "type": "character", "description": "full description"}}]"#,
            cx.document().content
        );

        let entities: Vec<Entity> = json::decode_many(cx.ask_json(&prompt, true, "entities")?)?;
        report.records = entities.len();

        for entity in entities {
            let base = cx.base_metadata();
            cx.emit_chunk(&mut report, &entity.description, |embedding| {
                let metadata = ChunkMetadata {
                    entity_key: entity.name.clone(),
                    entity_value: entity.description.clone(),
                    search_keywords: vec![
                        entity.name.clone(),
                        entity.kind.clone(),
                        "entity".to_string(),
                    ],
                    entities: vec![entity.name.clone()],
                    ..base
                };
                ChunkDraft::new(
                    entity.description.clone(),
                    ContentType::Fictional,
                    embedding,
                    metadata,
                )
                .canonical(
                    vec![
                        format!("Who is {}?", entity.name),
                        format!("What is {}?", entity.name),
                        format!("Tell me about {}", entity.name),
                    ],
                    entity.description.clone(),
                )
            })?;
        }

        Ok(report)
    }
}

/// One whole-document chunk tagged with who/what/why/when/where/how
pub struct WhoWhatWhy;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Structured {
    who: String,
    what: String,
    why: String,
    when: String,
    #[serde(rename = "where")]
    where_: String,
    how: String,
}

impl LooseRecord for Structured {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            who: text(map, "who"),
            what: text(map, "what"),
            why: text(map, "why"),
            when: text(map, "when"),
            where_: text(map, "where"),
            how: text(map, "how"),
        }
    }
}

impl Strategy for WhoWhatWhy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WhoWhatWhy
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting structured Q&A (who/what/why/when/where/how)");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Analyze this text and extract key information in structured format.
Provide: who (people/entities involved), what (what happened/is described), why (reasons/purpose),
when (time context), where (location), how (mechanism/method).

Text:
{}

Return ONLY a single JSON object (not an array). Format:
{{"who": "description", "what": "description", "why": "description", "when": "description", "where": "description", "how": "description"}}

If a field is not applicable, use an empty string "". Do not return an array."#,
            content_prefix(&cx.document().content, cx.config().summary_prefix_chars)
        );

        let s: Structured =
            json::decode_one(cx.ask_json(&prompt, false, "structured data")?)?;
        report.records = 1;

        let search = format!(
            "{} {} {} {} {} {}",
            s.who, s.what, s.why, s.when, s.where_, s.how
        );
        let base = cx.base_metadata();
        let content = cx.document().content.clone();
        let keywords = search.split_whitespace().map(str::to_string).collect();

        cx.emit_chunk(&mut report, &search, |embedding| {
            let metadata = ChunkMetadata {
                who: s.who,
                what: s.what,
                why: s.why,
                when: s.when,
                where_: s.where_,
                how: s.how,
                search_keywords: keywords,
                ..base
            };
            ChunkDraft::new(content, ContentType::Fact, embedding, metadata)
        })?;

        Ok(report)
    }
}

/// One whole-document chunk tagged with model-chosen keywords
pub struct Keyword;

impl Strategy for Keyword {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Keyword
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting keywords and key phrases");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract the most important keywords and key phrases from this text.
Return ONLY a JSON array of strings: ["keyword1", "keyword2", ...]

Text:
{}"#,
            content_prefix(&cx.document().content, cx.config().summary_prefix_chars)
        );

        let keywords = json::decode_strings(cx.ask_json(&prompt, true, "keywords")?)?;
        report.records = 1;

        let search = keywords.join(" ");
        let base = cx.base_metadata();
        let content = cx.document().content.clone();

        cx.emit_chunk(&mut report, &search, |embedding| {
            let metadata = ChunkMetadata {
                search_keywords: keywords.clone(),
                fact_keywords: keywords,
                ..base
            };
            ChunkDraft::new(content, ContentType::Fact, embedding, metadata)
        })?;

        Ok(report)
    }
}

/// One chunk per sentence; no chat call
pub struct Sentence;

impl Strategy for Sentence {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sentence
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Creating sentence-level chunks");
        let mut report = StrategyReport::new(self.kind());
        let min_chars = cx.config().sentence_min_chars;
        let document = cx.document();

        for (index, sentence) in document.content.split('.').enumerate() {
            let sentence = sentence.trim();
            if sentence.chars().count() < min_chars {
                continue;
            }
            report.records += 1;

            let base = cx.base_metadata();
            cx.emit_chunk(&mut report, sentence, |embedding| {
                let metadata = ChunkMetadata {
                    sentence_index: index,
                    ..base
                };
                ChunkDraft::new(sentence, ContentType::Fact, embedding, metadata)
            })?;
        }

        Ok(report)
    }
}

/// Question/answer pairs, embedded by question
pub struct FullQa;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QaPair {
    question: String,
    answer: String,
}

impl LooseRecord for QaPair {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            question: text(map, "question"),
            answer: text(map, "answer"),
        }
    }
}

impl Strategy for FullQa {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FullQa
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Generating Q&A pairs");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Generate question-answer pairs from this text.
For each important piece of information, create a natural question and its answer.

Text:
{}

Return ONLY a JSON array:
[{{"question": "question text", "answer": "answer text"}}]"#,
            content_prefix(&cx.document().content, cx.config().summary_prefix_chars)
        );

        let pairs: Vec<QaPair> = json::decode_many(cx.ask_json(&prompt, true, "Q&A pairs")?)?;
        report.records = pairs.len();

        for pair in pairs {
            let base = cx.base_metadata();
            cx.emit_chunk(&mut report, &pair.question, |embedding| {
                ChunkDraft::new(pair.answer.clone(), ContentType::Fact, embedding, base)
                    .canonical(vec![pair.question.clone()], pair.answer.clone())
            })?;
        }

        Ok(report)
    }
}
