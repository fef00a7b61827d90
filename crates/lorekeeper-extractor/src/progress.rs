//! Import progress reporting
//!
//! Events are emitted inline on the import path, so a sink that blocks
//! stalls the whole import. Every event carries a human-readable message
//! next to its kind, so a UI can display it without matching on the kind.

use std::sync::mpsc::Sender;
use tracing::{info, warn};

/// What an [`ImportEvent`] reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEventKind {
    /// An import or a strategy began
    Started,
    /// Informational progress inside a strategy
    Info,
    /// A strategy failed inside an "all" run; the run continues
    StrategyFailed,
    /// The document was already imported
    Skipped,
    /// Chunks from a failed import were removed
    RolledBack {
        /// Number of chunks removed
        removed: usize,
    },
    /// The import finished
    Completed,
}

/// One progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEvent {
    /// Event kind
    pub kind: ImportEventKind,
    /// Display text
    pub message: String,
}

impl ImportEvent {
    /// Create an event
    pub fn new(kind: ImportEventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Receives progress events from an import
pub trait ProgressSink {
    /// Handle one event
    fn report(&self, event: ImportEvent);
}

/// Forward events over a channel; a closed receiver is ignored
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub Sender<ImportEvent>);

impl ProgressSink for ChannelProgress {
    fn report(&self, event: ImportEvent) {
        let _ = self.0.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(ImportEvent),
{
    fn report(&self, event: ImportEvent) {
        self(event)
    }
}

/// Log events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: ImportEvent) {
        match event.kind {
            ImportEventKind::StrategyFailed | ImportEventKind::RolledBack { .. } => {
                warn!("{}", event.message)
            }
            _ => info!("{}", event.message),
        }
    }
}

/// Send an event to an optional sink
pub(crate) fn emit(
    sink: Option<&dyn ProgressSink>,
    kind: ImportEventKind,
    message: impl Into<String>,
) {
    if let Some(sink) = sink {
        sink.report(ImportEvent::new(kind, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::mpsc;

    #[test]
    fn test_channel_sink() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelProgress(tx);
        emit(Some(&sink), ImportEventKind::Started, "Importing a.md");
        emit(None, ImportEventKind::Info, "dropped");

        let event = rx.recv().unwrap();
        assert_eq!(event.kind, ImportEventKind::Started);
        assert_eq!(event.message, "Importing a.md");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = mpsc::channel::<ImportEvent>();
        drop(rx);
        ChannelProgress(tx).report(ImportEvent::new(ImportEventKind::Completed, "done"));
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |event: ImportEvent| seen.borrow_mut().push(event.kind);
        emit(
            Some(&sink),
            ImportEventKind::RolledBack { removed: 3 },
            "Rolled back 3 chunks",
        );
        assert_eq!(
            seen.borrow().as_slice(),
            &[ImportEventKind::RolledBack { removed: 3 }]
        );
    }
}
