//! Narrative strategies for fiction and world-building documents

use super::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
use crate::error::ExtractorError;
use crate::json::{self, list, text, LooseRecord};
use lorekeeper_domain::{ChunkMetadata, ContentType, StrategyKind};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Directed relationships between entities
pub struct RelationshipMapping;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Relationship {
    entity_a: String,
    relationship: String,
    entity_b: String,
    context: String,
    strength: String,
}

impl LooseRecord for Relationship {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            entity_a: text(map, "entity_a"),
            relationship: text(map, "relationship"),
            entity_b: text(map, "entity_b"),
            context: text(map, "context"),
            strength: text(map, "strength"),
        }
    }
}

impl Strategy for RelationshipMapping {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RelationshipMapping
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting entity relationships");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all relationships between entities (characters, locations, organizations, concepts) from this text.

For each relationship, identify:
1. Entity A (source)
2. Relationship type (is, has, controls, allies with, opposes, created by, located in, etc.)
3. Entity B (target)
4. Context/reason for the relationship

Text:
{}

Return ONLY a JSON array:
[{{
  "entity_a": "Entity Name A",
  "relationship": "relationship type",
  "entity_b": "Entity Name B",
  "context": "explanation of relationship",
  "strength": "strong|medium|weak"
}}]"#,
            cx.document().content
        );

        let relationships: Vec<Relationship> =
            json::decode_many(cx.ask_json(&prompt, true, "relationships")?)?;
        report.records = relationships.len();

        for rel in relationships {
            let search = format!(
                "{} {} {} {}",
                rel.entity_a, rel.relationship, rel.entity_b, rel.context
            );
            let statement = format!(
                "{} {} {}. {}",
                rel.entity_a, rel.relationship, rel.entity_b, rel.context
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let metadata = ChunkMetadata {
                    entities: vec![rel.entity_a.clone(), rel.entity_b.clone()],
                    search_keywords: vec![
                        rel.entity_a.clone(),
                        rel.entity_b.clone(),
                        rel.relationship.clone(),
                        rel.strength.clone(),
                    ],
                    ..base
                };
                ChunkDraft::new(statement.clone(), ContentType::Fictional, embedding, metadata)
                    .canonical(
                        vec![
                            format!(
                                "What is the relationship between {} and {}?",
                                rel.entity_a, rel.entity_b
                            ),
                            format!("How does {} relate to {}?", rel.entity_a, rel.entity_b),
                            format!("What is {} to {}?", rel.entity_a, rel.entity_b),
                        ],
                        statement,
                    )
            })?;
        }

        Ok(report)
    }
}

/// Events in chronological order
pub struct Timeline;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Event {
    when: String,
    what: String,
    who: String,
    #[serde(rename = "where")]
    where_: String,
    significance: String,
    order: i64,
}

impl LooseRecord for Event {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            when: text(map, "when"),
            what: text(map, "what"),
            who: text(map, "who"),
            where_: text(map, "where"),
            significance: text(map, "significance"),
            order: text(map, "order").trim().parse().unwrap_or(0),
        }
    }
}

impl Event {
    /// Sort key; unnumbered events keep their relative order after numbered ones
    fn position(&self) -> i64 {
        if self.order > 0 {
            self.order
        } else {
            i64::MAX
        }
    }
}

impl Strategy for Timeline {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Timeline
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting timeline and chronology");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all events from this text in chronological order.

For each event, identify:
1. When it happened (specific time/date or relative time like "before X", "during Y")
2. What happened (the event itself)
3. Who was involved
4. Where it happened
5. Significance/consequences

Text:
{}

Return ONLY a JSON array ordered chronologically:
[{{
  "when": "time reference",
  "what": "event description",
  "who": "participants",
  "where": "location",
  "significance": "why this matters",
  "order": 1
}}]"#,
            cx.document().content
        );

        let mut events: Vec<Event> =
            json::decode_many(cx.ask_json(&prompt, true, "timeline events")?)?;
        events.sort_by_key(Event::position);
        report.records = events.len();

        for event in events {
            let search = format!(
                "{} {} {} {} {}",
                event.when, event.what, event.who, event.where_, event.significance
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let questions = vec![
                    format!("What happened {}?", event.when),
                    format!("When did {} happen?", event.what),
                    format!("What events involved {}?", event.who),
                ];
                let answer = format!(
                    "{}: {} involving {} at {}. {}",
                    event.when, event.what, event.who, event.where_, event.significance
                );
                let metadata = ChunkMetadata {
                    search_keywords: vec![
                        event.when.clone(),
                        event.who.clone(),
                        event.where_.clone(),
                    ],
                    when: event.when,
                    what: event.what.clone(),
                    who: event.who,
                    where_: event.where_,
                    ..base
                };
                ChunkDraft::new(event.what, ContentType::Fictional, embedding, metadata)
                    .canonical(questions, answer)
            })?;
        }

        Ok(report)
    }
}

/// Conflicts, stakes and plot points
pub struct ConflictPlot;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Conflict {
    problem: String,
    stakes: String,
    parties: Vec<String>,
    status: String,
    outcome: String,
}

impl LooseRecord for Conflict {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            problem: text(map, "problem"),
            stakes: text(map, "stakes"),
            parties: list(map, "parties"),
            status: text(map, "status"),
            outcome: text(map, "outcome"),
        }
    }
}

impl Strategy for ConflictPlot {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ConflictPlot
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting conflicts and plot points");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all conflicts, challenges, and plot points from this narrative.

For each conflict/plot point, identify:
1. Problem/conflict (what's the issue)
2. Stakes (what's at risk, why it matters)
3. Parties involved (who's in conflict)
4. Resolution status (resolved/ongoing/escalating)
5. Outcome/consequences (if resolved)

Text:
{}

Return ONLY a JSON array:
[{{
  "problem": "the conflict or challenge",
  "stakes": "what's at risk",
  "parties": ["entity1", "entity2"],
  "status": "resolved|ongoing|escalating",
  "outcome": "what happened (if resolved)"
}}]"#,
            cx.document().content
        );

        let conflicts: Vec<Conflict> =
            json::decode_many(cx.ask_json(&prompt, true, "conflicts")?)?;
        report.records = conflicts.len();

        for conflict in conflicts {
            let search = format!(
                "{} {} {} {} {}",
                conflict.problem,
                conflict.stakes,
                conflict.parties.join(" "),
                conflict.status,
                conflict.outcome
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let mut questions = vec![
                    format!(
                        "What is the conflict involving {}?",
                        conflict.parties.join(" and ")
                    ),
                    "What conflicts exist?".to_string(),
                ];
                if let Some(first) = conflict.parties.first() {
                    questions.push(format!("What are the stakes for {}?", first));
                }
                let answer = format!(
                    "Problem: {}. Stakes: {}. Parties: {}. Status: {}. {}",
                    conflict.problem,
                    conflict.stakes,
                    conflict.parties.join(", "),
                    conflict.status,
                    conflict.outcome
                );

                let mut keywords = conflict.parties.clone();
                keywords.extend([
                    conflict.status.clone(),
                    "conflict".to_string(),
                    "plot".to_string(),
                ]);
                let metadata = ChunkMetadata {
                    entities: conflict.parties,
                    search_keywords: keywords,
                    ..base
                };
                ChunkDraft::new(conflict.problem, ContentType::Fictional, embedding, metadata)
                    .canonical(questions, answer)
            })?;
        }

        Ok(report)
    }
}

/// Rules, magic systems and world mechanics
pub struct RuleMechanic;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Rule {
    name: String,
    trigger: String,
    effect: String,
    exceptions: String,
    category: String,
}

impl LooseRecord for Rule {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            name: text(map, "name"),
            trigger: text(map, "trigger"),
            effect: text(map, "effect"),
            exceptions: text(map, "exceptions"),
            category: text(map, "category"),
        }
    }
}

impl Strategy for RuleMechanic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RuleMechanic
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting rules and mechanics");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all rules, mechanics, and systems from this text (game rules, magic systems, world laws, etc.).

For each rule/mechanic:
1. Rule name/title
2. Trigger/condition (when does it apply)
3. Effect/consequence (what happens)
4. Exceptions/limitations
5. Category (magic, physics, social, combat, etc.)

Text:
{}

Return ONLY a JSON array:
[{{
  "name": "rule name",
  "trigger": "when this applies",
  "effect": "what happens",
  "exceptions": "limitations or exceptions",
  "category": "magic|physics|social|combat|economic|other"
}}]"#,
            cx.document().content
        );

        let rules: Vec<Rule> = json::decode_many(cx.ask_json(&prompt, true, "rules")?)?;
        report.records = rules.len();

        for rule in rules {
            let search = format!(
                "{} {} {} {} {}",
                rule.name, rule.trigger, rule.effect, rule.exceptions, rule.category
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let questions = vec![
                    format!("What is {}?", rule.name),
                    format!("How does {} work?", rule.name),
                    format!("What happens when {}?", rule.trigger),
                ];
                let answer = format!(
                    "{}: When {}, then {}. Exceptions: {}",
                    rule.name, rule.trigger, rule.effect, rule.exceptions
                );
                let metadata = ChunkMetadata {
                    entity_value: format!(
                        "Trigger: {}. Effect: {}. Exceptions: {}",
                        rule.trigger, rule.effect, rule.exceptions
                    ),
                    search_keywords: vec![
                        rule.name.clone(),
                        rule.category.clone(),
                        "rule".to_string(),
                        "mechanic".to_string(),
                        "system".to_string(),
                    ],
                    entity_key: rule.name,
                    rule_system: rule.category,
                    ..base
                };
                ChunkDraft::new(
                    format!("When {}, then {}", rule.trigger, rule.effect),
                    ContentType::Fictional,
                    embedding,
                    metadata,
                )
                .canonical(questions, answer)
            })?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::Decoded;

    #[test]
    fn test_events_sorted_by_order() {
        let mut events: Vec<Event> = json::decode_many(Decoded::parse(
            r#"[{"what": "Siege", "order": 3},
                {"what": "Exile"},
                {"what": "Coronation", "order": "1"},
                {"what": "Treaty", "order": 2}]"#,
        ))
        .unwrap();
        events.sort_by_key(Event::position);

        let names: Vec<_> = events.iter().map(|e| e.what.as_str()).collect();
        assert_eq!(names, vec!["Coronation", "Treaty", "Siege", "Exile"]);
        assert_eq!(events[0].order, 1);
    }
}
