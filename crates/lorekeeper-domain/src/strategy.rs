//! Strategy module - the closed set of extraction strategies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an extraction strategy
///
/// The set is closed: every strategy the importer can run is listed here,
/// and each one is recorded on the chunks it produces as provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Character/location/item/faction sheets
    EntitySheet,
    /// Whole-document who/what/why/when/where/how summary
    WhoWhatWhy,
    /// Keyword-tagged whole-document chunk
    Keyword,
    /// One chunk per sentence
    Sentence,
    /// Generated question/answer pairs
    FullQa,
    /// Entity-to-entity relationships
    RelationshipMapping,
    /// Chronological events
    Timeline,
    /// Conflicts and plot points
    ConflictPlot,
    /// Rules, mechanics and world systems
    RuleMechanic,
    /// Project goals, scope and risks
    ProjectPlanning,
    /// Functional and non-functional requirements
    Requirements,
    /// Actionable tasks and work breakdown
    TaskBreakdown,
    /// Markdown sections split by heading
    DocumentSection,
    /// Classified code snippets
    CodeSnippet,
    /// Hashtag topics
    Tags,
    /// Links to other documents
    CrossReferences,
}

impl StrategyKind {
    /// Every strategy, in the order the composite "all" run applies them
    pub const ALL: [StrategyKind; 16] = [
        StrategyKind::EntitySheet,
        StrategyKind::WhoWhatWhy,
        StrategyKind::Keyword,
        StrategyKind::Sentence,
        StrategyKind::FullQa,
        StrategyKind::RelationshipMapping,
        StrategyKind::Timeline,
        StrategyKind::ConflictPlot,
        StrategyKind::RuleMechanic,
        StrategyKind::ProjectPlanning,
        StrategyKind::Requirements,
        StrategyKind::TaskBreakdown,
        StrategyKind::DocumentSection,
        StrategyKind::CodeSnippet,
        StrategyKind::Tags,
        StrategyKind::CrossReferences,
    ];

    /// Get the strategy identifier as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::EntitySheet => "entity_sheet",
            StrategyKind::WhoWhatWhy => "who_what_why",
            StrategyKind::Keyword => "keyword",
            StrategyKind::Sentence => "sentence",
            StrategyKind::FullQa => "full_qa",
            StrategyKind::RelationshipMapping => "relationship_mapping",
            StrategyKind::Timeline => "timeline",
            StrategyKind::ConflictPlot => "conflict_plot",
            StrategyKind::RuleMechanic => "rule_mechanic",
            StrategyKind::ProjectPlanning => "project_planning",
            StrategyKind::Requirements => "requirements",
            StrategyKind::TaskBreakdown => "task_breakdown",
            StrategyKind::DocumentSection => "document_section",
            StrategyKind::CodeSnippet => "code_snippet",
            StrategyKind::Tags => "tags",
            StrategyKind::CrossReferences => "cross_references",
        }
    }

    /// Parse a strategy identifier (exact match)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_is_complete_and_unique() {
        let names: HashSet<_> = StrategyKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), 16);
    }

    #[test]
    fn test_parse_known_and_unknown() {
        assert_eq!(StrategyKind::parse("entity_sheet"), Some(StrategyKind::EntitySheet));
        assert_eq!(StrategyKind::parse("cross_references"), Some(StrategyKind::CrossReferences));
        assert_eq!(StrategyKind::parse("all"), None);
        assert_eq!(StrategyKind::parse("Entity_Sheet"), None);
    }

    #[test]
    fn test_order_starts_with_content_strategies() {
        assert_eq!(StrategyKind::ALL[0], StrategyKind::EntitySheet);
        assert_eq!(StrategyKind::ALL[15], StrategyKind::CrossReferences);
    }
}
