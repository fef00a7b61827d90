//! Strategy selection and the composite "all" run

use crate::error::ExtractorError;
use crate::progress::{emit, ImportEventKind};
use crate::strategies::{handler, StrategyContext, StrategyReport};
use lorekeeper_domain::StrategyKind;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Which strategies an import runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategySelection {
    /// Every strategy, best effort
    All,
    /// One strategy; its failure fails the import
    Single(StrategyKind),
}

impl StrategySelection {
    /// Parse a strategy name; `"all"` selects every strategy
    ///
    /// # Examples
    ///
    /// ```
    /// use lorekeeper_extractor::StrategySelection;
    /// use lorekeeper_domain::StrategyKind;
    ///
    /// assert_eq!(StrategySelection::parse("all").unwrap(), StrategySelection::All);
    /// assert_eq!(
    ///     StrategySelection::parse("timeline").unwrap(),
    ///     StrategySelection::Single(StrategyKind::Timeline)
    /// );
    /// assert!(StrategySelection::parse("poetry").is_err());
    /// ```
    pub fn parse(name: &str) -> Result<Self, ExtractorError> {
        if name == "all" {
            return Ok(StrategySelection::All);
        }
        StrategyKind::parse(name)
            .map(StrategySelection::Single)
            .ok_or_else(|| ExtractorError::UnknownStrategy(name.to_string()))
    }
}

impl FromStr for StrategySelection {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StrategySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategySelection::All => f.write_str("all"),
            StrategySelection::Single(kind) => write!(f, "{}", kind),
        }
    }
}

/// A strategy that failed during an "all" run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    /// Strategy that failed
    pub strategy: StrategyKind,
    /// Error text
    pub error: String,
}

/// Outcome of dispatching one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Reports of the strategies that succeeded, in run order
    pub strategies: Vec<StrategyReport>,
    /// Strategies that failed (only populated by "all" runs)
    pub failures: Vec<StrategyFailure>,
}

impl DispatchReport {
    /// Chunks added across all successful strategies
    pub fn chunks_added(&self) -> usize {
        self.strategies.iter().map(|r| r.chunks_added).sum()
    }

    /// Records dropped across all successful strategies
    pub fn records_dropped(&self) -> usize {
        self.strategies.iter().map(|r| r.records_dropped).sum()
    }
}

/// Run the selected strategies against the context's document
///
/// A single strategy's error is returned as-is. In an "all" run each
/// failure is reported as `StrategyFailed` and the run moves on; the run
/// itself always succeeds.
pub fn dispatch(
    cx: &mut StrategyContext<'_>,
    selection: StrategySelection,
) -> Result<DispatchReport, ExtractorError> {
    match selection {
        StrategySelection::Single(kind) => Ok(DispatchReport {
            strategies: vec![handler(kind).run(cx)?],
            failures: Vec::new(),
        }),
        StrategySelection::All => Ok(run_all(cx)),
    }
}

fn run_all(cx: &mut StrategyContext<'_>) -> DispatchReport {
    let progress = cx.progress();
    emit(
        progress,
        ImportEventKind::Info,
        format!(
            "Applying ALL {} strategies for comprehensive coverage",
            StrategyKind::ALL.len()
        ),
    );

    let mut report = DispatchReport::default();
    for kind in StrategyKind::ALL {
        emit(progress, ImportEventKind::Started, format!("Strategy: {}", kind));

        match handler(kind).run(cx) {
            Ok(strategy_report) => {
                info!(
                    "{}: {} chunks from {} records",
                    kind, strategy_report.chunks_added, strategy_report.records
                );
                report.strategies.push(strategy_report);
            }
            Err(e) => {
                warn!("Strategy {} failed: {}", kind, e);
                emit(
                    progress,
                    ImportEventKind::StrategyFailed,
                    format!("Strategy {} failed: {}", kind, e),
                );
                report.failures.push(StrategyFailure {
                    strategy: kind,
                    error: e.to_string(),
                });
            }
        }
    }

    report
}
