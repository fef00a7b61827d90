//! Project planning strategies: scope, requirements, tasks

use super::{ChunkDraft, Strategy, StrategyContext, StrategyReport};
use crate::error::ExtractorError;
use crate::json::{self, content_prefix, list, text, LooseRecord};
use lorekeeper_domain::{ChunkMetadata, ContentType, StrategyKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Goals, scope and risks of a project, as up to three chunks
pub struct ProjectPlanning;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Stakeholder {
    role: String,
    name: String,
}

impl Stakeholder {
    fn label(&self) -> String {
        match (self.name.is_empty(), self.role.is_empty()) {
            (false, false) => format!("{} ({})", self.name, self.role),
            (false, true) => self.name.clone(),
            _ => self.role.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Project {
    goals: Vec<String>,
    scope: Vec<String>,
    out_of_scope: Vec<String>,
    stakeholders: Vec<Stakeholder>,
    constraints: BTreeMap<String, String>,
    success_criteria: Vec<String>,
    risks: Vec<String>,
}

impl LooseRecord for Project {
    fn from_loose(map: &Map<String, Value>) -> Self {
        let stakeholders = match map.get("stakeholders") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(entry) => Some(Stakeholder {
                        role: text(entry, "role"),
                        name: text(entry, "name"),
                    }),
                    Value::String(name) if !name.is_empty() => Some(Stakeholder {
                        name: name.clone(),
                        ..Default::default()
                    }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let constraints = match map.get("constraints") {
            Some(Value::Object(entries)) => entries
                .iter()
                .map(|(kind, value)| (kind.clone(), json::coerce(value)))
                .filter(|(_, value)| !value.is_empty())
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            goals: list(map, "goals"),
            scope: list(map, "scope"),
            out_of_scope: list(map, "out_of_scope"),
            stakeholders,
            constraints,
            success_criteria: list(map, "success_criteria"),
            risks: list(map, "risks"),
        }
    }
}

/// One project aspect turned into a chunk
struct Aspect {
    content: String,
    keywords: Vec<String>,
    questions: &'static [&'static str],
}

impl Project {
    /// Stakeholder labels, attached to every aspect as entities
    fn stakeholder_labels(&self) -> Vec<String> {
        self.stakeholders
            .iter()
            .map(Stakeholder::label)
            .filter(|label| !label.is_empty())
            .collect()
    }

    fn aspects(self) -> Vec<Aspect> {
        let mut aspects = Vec::new();

        if !self.goals.is_empty() {
            let mut keywords: Vec<String> = ["goals", "objectives", "project"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            keywords.extend(self.goals.iter().cloned());
            let mut content = format!("Project Goals: {}", self.goals.join("; "));
            if !self.success_criteria.is_empty() {
                content.push_str(&format!(
                    ". Success Criteria: {}",
                    self.success_criteria.join("; ")
                ));
            }
            aspects.push(Aspect {
                content,
                keywords,
                questions: &["What are the project goals?", "What are we trying to achieve?"],
            });
        }

        if !self.scope.is_empty() {
            let mut content = format!("In Scope: {}", self.scope.join("; "));
            if !self.out_of_scope.is_empty() {
                content.push_str(&format!(". Out of Scope: {}", self.out_of_scope.join("; ")));
            }
            let constraints: Vec<String> = self
                .constraints
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(kind, value)| format!("{}: {}", kind, value))
                .collect();
            if !constraints.is_empty() {
                content.push_str(&format!(". Constraints: {}", constraints.join("; ")));
            }
            aspects.push(Aspect {
                content,
                keywords: ["scope", "in-scope", "out-of-scope", "project"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                questions: &["What's in scope?", "What's out of scope?", "What are we building?"],
            });
        }

        if !self.risks.is_empty() {
            aspects.push(Aspect {
                content: format!("Project Risks: {}", self.risks.join("; ")),
                keywords: ["risks", "dependencies", "blockers", "project"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                questions: &[
                    "What are the risks?",
                    "What could go wrong?",
                    "What are the dependencies?",
                ],
            });
        }

        aspects
    }
}

impl Strategy for ProjectPlanning {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ProjectPlanning
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting project planning data");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract project planning information from this document.

Identify:
1. Project goals/objectives
2. Scope (what's included)
3. Out of scope (what's excluded)
4. Key stakeholders/roles
5. Constraints (time, budget, technical)
6. Success criteria
7. Risks/dependencies

Text:
{}

Return ONLY JSON:
{{
  "goals": ["goal1", "goal2"],
  "scope": ["item1", "item2"],
  "out_of_scope": ["item1"],
  "stakeholders": [{{"role": "role", "name": "name"}}],
  "constraints": {{"time": "...", "budget": "...", "technical": "..."}},
  "success_criteria": ["criterion1"],
  "risks": ["risk1"]
}}"#,
            content_prefix(&cx.document().content, cx.config().planning_prefix_chars)
        );

        let project: Project = json::decode_one(cx.ask_json(&prompt, false, "project data")?)?;
        let stakeholders = project.stakeholder_labels();
        let aspects = project.aspects();
        report.records = aspects.len();

        for aspect in aspects {
            let base = cx.base_metadata();
            cx.emit_chunk(&mut report, &aspect.content, |embedding| {
                let metadata = ChunkMetadata {
                    search_keywords: aspect.keywords,
                    entities: stakeholders.clone(),
                    ..base
                };
                let questions = aspect.questions.iter().map(|q| q.to_string()).collect();
                ChunkDraft::new(aspect.content.clone(), ContentType::Fact, embedding, metadata)
                    .canonical(questions, aspect.content.clone())
            })?;
        }

        Ok(report)
    }
}

/// Functional and non-functional requirements
pub struct Requirements;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Requirement {
    id: String,
    category: String,
    description: String,
    priority: String,
    acceptance_criteria: String,
}

impl LooseRecord for Requirement {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            id: text(map, "id"),
            category: text(map, "category"),
            description: text(map, "description"),
            priority: text(map, "priority"),
            acceptance_criteria: text(map, "acceptance_criteria"),
        }
    }
}

impl Strategy for Requirements {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Requirements
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting requirements and specifications");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all requirements from this document.

Categorize each requirement as:
- Functional (what the system must do)
- Non-functional (performance, security, usability, etc.)
- Business (business rules, policies)
- Technical (technical constraints, integrations)

For each requirement:
1. Requirement ID or name
2. Category
3. Description
4. Priority (must-have, should-have, nice-to-have)
5. Acceptance criteria (how to verify)

Text:
{}

Return ONLY a JSON array:
[{{
  "id": "REQ-001",
  "category": "functional|non-functional|business|technical",
  "description": "requirement description",
  "priority": "must-have|should-have|nice-to-have",
  "acceptance_criteria": "how to verify this requirement"
}}]"#,
            content_prefix(&cx.document().content, cx.config().planning_prefix_chars)
        );

        let requirements: Vec<Requirement> =
            json::decode_many(cx.ask_json(&prompt, true, "requirements")?)?;
        report.records = requirements.len();

        for req in requirements {
            let search = format!(
                "{} {} {} {} {}",
                req.id, req.category, req.description, req.priority, req.acceptance_criteria
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let questions = vec![
                    format!("What is {}?", req.id),
                    format!("What are the {} requirements?", req.category),
                    format!("What are the {} requirements?", req.priority),
                ];
                let answer = format!(
                    "{} ({}, {}): {}. Acceptance: {}",
                    req.id, req.category, req.priority, req.description, req.acceptance_criteria
                );
                let metadata = ChunkMetadata {
                    entity_value: req.description.clone(),
                    search_keywords: vec![
                        req.id.clone(),
                        req.category.clone(),
                        req.priority.clone(),
                        "requirement".to_string(),
                    ],
                    tags: vec![req.category, req.priority],
                    entity_key: req.id,
                    ..base
                };
                ChunkDraft::new(req.description, ContentType::Fact, embedding, metadata)
                    .canonical(questions, answer)
            })?;
        }

        Ok(report)
    }
}

/// Actionable tasks and work breakdown
pub struct TaskBreakdown;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Task {
    task: String,
    description: String,
    dependencies: Vec<String>,
    effort: String,
    assigned: String,
    category: String,
}

impl LooseRecord for Task {
    fn from_loose(map: &Map<String, Value>) -> Self {
        Self {
            task: text(map, "task"),
            description: text(map, "description"),
            dependencies: list(map, "dependencies"),
            effort: text(map, "effort"),
            assigned: text(map, "assigned"),
            category: text(map, "category"),
        }
    }
}

impl Task {
    fn answer(&self) -> String {
        let mut answer = format!("Task: {}. {}", self.task, self.description);
        if !self.dependencies.is_empty() {
            answer.push_str(&format!(" Dependencies: {}.", self.dependencies.join(", ")));
        }
        if !self.effort.is_empty() {
            answer.push_str(&format!(" Effort: {}.", self.effort));
        }
        answer
    }
}

impl Strategy for TaskBreakdown {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TaskBreakdown
    }

    fn run(&self, cx: &mut StrategyContext<'_>) -> Result<StrategyReport, ExtractorError> {
        cx.info("Extracting tasks and work breakdown");
        let mut report = StrategyReport::new(self.kind());

        let prompt = format!(
            r#"Extract all actionable tasks and work items from this document.

For each task:
1. Task name/title
2. Description (what needs to be done)
3. Dependencies (what must be done first)
4. Estimated effort (if mentioned)
5. Assigned to (if mentioned)
6. Category (frontend, backend, design, testing, etc.)

Text:
{}

Return ONLY a JSON array:
[{{
  "task": "task title",
  "description": "what needs to be done",
  "dependencies": ["task1", "task2"],
  "effort": "estimate if mentioned, otherwise empty",
  "assigned": "person/team if mentioned",
  "category": "frontend|backend|design|testing|devops|other"
}}]"#,
            content_prefix(&cx.document().content, cx.config().planning_prefix_chars)
        );

        let tasks: Vec<Task> = json::decode_many(cx.ask_json(&prompt, true, "tasks")?)?;
        report.records = tasks.len();

        for task in tasks {
            let search = format!(
                "{} {} {} {} {}",
                task.task, task.description, task.category, task.effort, task.assigned
            );
            let base = cx.base_metadata();

            cx.emit_chunk(&mut report, &search, |embedding| {
                let questions = vec![
                    format!("What is the task '{}'?", task.task),
                    format!("What {} tasks exist?", task.category),
                    format!("What tasks are assigned to {}?", task.assigned),
                ];
                let answer = task.answer();

                let mut keywords = vec![
                    task.category.clone(),
                    task.assigned.clone(),
                    "task".to_string(),
                    "work".to_string(),
                ];
                keywords.extend(task.dependencies.iter().cloned());
                let metadata = ChunkMetadata {
                    entity_key: task.task.clone(),
                    entity_value: task.description.clone(),
                    search_keywords: keywords,
                    tags: vec![task.category.clone()],
                    ..base
                };
                ChunkDraft::new(task.description.clone(), ContentType::Fact, embedding, metadata)
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
    fn test_project_aspects_skip_empty_sections() {
        let project = Project {
            goals: vec!["Ship v1".to_string()],
            out_of_scope: vec!["Mobile".to_string()],
            risks: vec!["Staffing".to_string(), "Budget".to_string()],
            ..Default::default()
        };
        let aspects = project.aspects();
        assert_eq!(aspects.len(), 2);
        assert_eq!(aspects[0].content, "Project Goals: Ship v1");
        assert_eq!(aspects[1].content, "Project Risks: Staffing; Budget");
    }

    #[test]
    fn test_scope_includes_out_of_scope() {
        let project = Project {
            scope: vec!["API".to_string(), "CLI".to_string()],
            out_of_scope: vec!["GUI".to_string()],
            ..Default::default()
        };
        let aspects = project.aspects();
        assert_eq!(aspects[0].content, "In Scope: API; CLI. Out of Scope: GUI");
        assert_eq!(aspects[0].questions.len(), 3);
    }

    #[test]
    fn test_project_keeps_stakeholders_constraints_and_criteria() {
        let project: Project = json::decode_one(json::Decoded::parse(
            r#"{"goals": ["Ship v1"], "scope": ["API"],
                "stakeholders": [{"role": "Lead", "name": "Mira"}, {"role": "QA", "name": ""}],
                "constraints": {"time": "Q3", "budget": "", "technical": "Rust only"},
                "success_criteria": ["Zero data loss"]}"#,
        ))
        .unwrap();

        assert_eq!(project.stakeholder_labels(), vec!["Mira (Lead)", "QA"]);
        let aspects = project.aspects();
        assert_eq!(
            aspects[0].content,
            "Project Goals: Ship v1. Success Criteria: Zero data loss"
        );
        assert_eq!(
            aspects[1].content,
            "In Scope: API. Constraints: technical: Rust only; time: Q3"
        );
    }

    #[test]
    fn test_project_loose_constraints_and_stakeholders() {
        let project: Project = json::decode_one(json::Decoded::parse(
            r#"{"scope": "API", "stakeholders": ["Mira"], "constraints": {"budget": 5000}}"#,
        ))
        .unwrap();

        assert_eq!(project.stakeholder_labels(), vec!["Mira"]);
        assert_eq!(project.constraints.get("budget").map(String::as_str), Some("5000"));
        assert_eq!(project.aspects()[0].content, "In Scope: API. Constraints: budget: 5000");
    }

    #[test]
    fn test_task_answer_appends_optional_parts() {
        let task = Task {
            task: "Build parser".to_string(),
            description: "Parse input".to_string(),
            dependencies: vec!["Lexer".to_string()],
            effort: "2d".to_string(),
            ..Default::default()
        };
        assert_eq!(
            task.answer(),
            "Task: Build parser. Parse input Dependencies: Lexer. Effort: 2d."
        );

        let bare = Task {
            task: "Docs".to_string(),
            description: "Write docs".to_string(),
            ..Default::default()
        };
        assert_eq!(bare.answer(), "Task: Docs. Write docs");
    }
}
