//! Graph Edges
//!
//! Subscriptions are the only edges values travel along. Nested entries are
//! ownership records used for teardown and never carry values.

use smallvec::SmallVec;

use super::arena::CellId;

/// Reactive sources of one computation, in declaration order.
///
/// A source listed twice (`[a, a]`) appears twice here, matching the two
/// subscription entries it received.
pub type Sources = SmallVec<[CellId; 2]>;

/// An edge from a dependency cell to something that must hear about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// A single-dependency cell recomputed immediately.
    Cell(CellId),

    /// Positional slot `index` of a collector's buffer.
    Slot {
        collector: CellId,
        index: usize,
    },
}

impl Subscription {
    /// The cell this edge points at.
    pub fn target(&self) -> CellId {
        match *self {
            Subscription::Cell(cell) => cell,
            Subscription::Slot { collector, .. } => collector,
        }
    }
}

/// A sub-computation created while another computation was running.
#[derive(Debug, Clone)]
pub struct NestedEntry {
    pub cell: CellId,
    pub sources: Sources,
}

impl NestedEntry {
    pub fn new(cell: CellId, sources: Sources) -> Self {
        Self { cell, sources }
    }
}

/// Remove the first edge pointing at `target` from a subscriber list.
///
/// Returns whether an edge was removed.
pub fn unsubscribe(subscribers: &mut Vec<Subscription>, target: CellId) -> bool {
    match subscribers.iter().position(|sub| sub.target() == target) {
        Some(position) => {
            subscribers.remove(position);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Arena;

    #[test]
    fn unsubscribe_removes_one_matching_edge() {
        let mut arena: Arena<()> = Arena::new();
        let a = arena.insert(());
        let b = arena.insert(());

        let mut subs = vec![
            Subscription::Cell(a),
            Subscription::Slot { collector: b, index: 0 },
            Subscription::Slot { collector: b, index: 1 },
        ];

        assert!(unsubscribe(&mut subs, b));
        assert_eq!(
            subs,
            vec![
                Subscription::Cell(a),
                Subscription::Slot { collector: b, index: 1 },
            ]
        );

        assert!(unsubscribe(&mut subs, b));
        assert!(!unsubscribe(&mut subs, b));
        assert_eq!(subs, vec![Subscription::Cell(a)]);
    }
}
