//! Undo grouping for block edits.

use crate::host::PortSide;
use crate::reconcile::MatchPhase;

/// One atomic sub-step of an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoStep {
    CodeChanged { previous: String, current: String },
    PortsReplaced { inputs: usize, outputs: usize },
    Relinked { side: PortSide, port: usize, phase: MatchPhase },
}

/// The host's undo history. Groups may nest; only the outermost group
/// becomes an undo entry.
pub trait UndoRecorder {
    fn begin_group(&mut self, description: &str);
    fn record(&mut self, step: UndoStep);
    fn end_group(&mut self);
}

/// An open undo group that closes when dropped, on every exit path.
pub struct TransactionGuard<'a, U: UndoRecorder + ?Sized> {
    recorder: &'a mut U,
}

impl<'a, U: UndoRecorder + ?Sized> TransactionGuard<'a, U> {
    pub fn begin(recorder: &'a mut U, description: &str) -> Self {
        recorder.begin_group(description);
        TransactionGuard { recorder }
    }

    pub fn record(&mut self, step: UndoStep) {
        self.recorder.record(step);
    }
}

impl<U: UndoRecorder + ?Sized> Drop for TransactionGuard<'_, U> {
    fn drop(&mut self) {
        self.recorder.end_group();
    }
}

/// Records nothing. Used when replaying persisted state.
#[derive(Debug, Default)]
pub struct Untracked;

impl UndoRecorder for Untracked {
    fn begin_group(&mut self, _description: &str) {}
    fn record(&mut self, _step: UndoStep) {}
    fn end_group(&mut self) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoGroup {
    pub description: String,
    pub steps: Vec<UndoStep>,
}

/// In-memory undo history.
#[derive(Debug, Default)]
pub struct UndoLog {
    groups: Vec<UndoGroup>,
    open: Option<UndoGroup>,
    depth: usize,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed groups, oldest first.
    pub fn groups(&self) -> &[UndoGroup] {
        &self.groups
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0
    }
}

impl UndoRecorder for UndoLog {
    fn begin_group(&mut self, description: &str) {
        if self.depth == 0 {
            self.open = Some(UndoGroup {
                description: description.to_string(),
                steps: Vec::new(),
            });
        }
        self.depth += 1;
    }

    fn record(&mut self, step: UndoStep) {
        match &mut self.open {
            Some(group) => group.steps.push(step),
            // a lone step is its own entry
            None => self.groups.push(UndoGroup {
                description: String::new(),
                steps: vec![step],
            }),
        }
    }

    fn end_group(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            if let Some(group) = self.open.take() {
                self.groups.push(group);
            }
        }
    }
}
