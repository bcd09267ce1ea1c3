//! Context Stack
//!
//! The context stack records which sub-computations each running
//! computation creates. A frame is pushed before a computation body runs
//! and popped into the owning cell's nested list afterwards, so the next
//! evaluation of that cell knows exactly what to tear down first.
//!
//! # Implementation
//!
//! The stack lives on the engine rather than in thread-local storage, so
//! independent engines never see each other's frames. An empty stack means
//! the caller is at root level: computations created there are never
//! re-created by a parent and are not recorded anywhere.

use crate::graph::NestedEntry;

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Vec<NestedEntry>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin recording for a computation about to run.
    pub fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Finish recording and hand back everything created since the
    /// matching [`push`](Self::push).
    pub fn pop(&mut self) -> Vec<NestedEntry> {
        self.frames.pop().unwrap_or_default()
    }

    /// Check whether no computation is currently running.
    pub fn is_root(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Attach a sub-computation to the innermost running computation.
    /// Ignored at root level.
    pub fn record(&mut self, entry: NestedEntry) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(entry);
        }
    }
}
