//! Cell Implementation
//!
//! A Cell is the reactive variable: a current value, the edges of everything
//! that depends on it, and (for derived cells) the computation that produces
//! its value.
//!
//! # Kinds of Cell
//!
//! - Source cells have no computation. They change only through `set`.
//! - Single-dependency cells are recomputed immediately when their one
//!   source changes.
//! - Collectors keep a positional buffer of their reactive inputs and are
//!   recomputed in a batched pass after the direct propagation settles.
//!
//! # Memory Layout
//!
//! Culled cells drop everything except their last value, which stays
//! readable until the arena hands the slot to a new cell.

use std::fmt;
use std::rc::Rc;

use crate::graph::{NestedEntry, Sources, Subscription};

use super::effect::EffectId;
use super::engine::Engine;

/// A teardown callback returned by a computation or an effect.
pub type Cleanup = Box<dyn FnOnce()>;

/// A wrapped computation body. It receives the engine so that nested
/// derivations can be created through it.
pub(crate) type Compute<V> = Rc<dyn Fn(&mut Engine<V>, &[V]) -> Computed<V>>;

/// The result of one evaluation of a computation body.
pub(crate) struct Computed<V> {
    /// `None` only for effect bindings, which exist for their side effect.
    pub value: Option<V>,
    pub cleanup: Option<Cleanup>,
}

impl<V> Computed<V> {
    pub fn value(value: V) -> Self {
        Self {
            value: Some(value),
            cleanup: None,
        }
    }

    pub fn with_cleanup(value: V, cleanup: Option<Cleanup>) -> Self {
        Self {
            value: Some(value),
            cleanup,
        }
    }

    pub fn empty() -> Self {
        Self {
            value: None,
            cleanup: None,
        }
    }
}

pub(crate) struct Cell<V> {
    pub value: Option<V>,

    /// Edges to dependents. Only the creator of an edge removes it.
    pub subscribers: Vec<Subscription>,

    pub compute: Option<Compute<V>>,

    /// Latest value of each reactive input, in declaration order.
    /// Present only on collectors.
    pub buffer: Option<Vec<V>>,

    /// Sub-computations created during the last evaluation.
    pub nested: Vec<NestedEntry>,

    /// Cells this one subscribed to, used by explicit disposal.
    pub sources: Sources,

    pub returns_cleanup: bool,
    pub cleanup: Option<Cleanup>,

    /// Set on the binding of an effect, which is released when this cell is
    /// culled.
    pub effect: Option<EffectId>,

    pub alive: bool,
}

impl<V> Cell<V> {
    /// A root cell holding a plain value.
    pub fn source(value: V) -> Self {
        Self {
            value: Some(value),
            ..Self::derived(false)
        }
    }

    /// A derived cell whose computation and edges are filled in by `apply`.
    pub fn derived(returns_cleanup: bool) -> Self {
        Self {
            value: None,
            subscribers: Vec::new(),
            compute: None,
            buffer: None,
            nested: Vec::new(),
            sources: Sources::new(),
            returns_cleanup,
            cleanup: None,
            effect: None,
            alive: true,
        }
    }

    pub fn is_collector(&self) -> bool {
        self.buffer.is_some()
    }

    /// Take the cleanup left by the previous evaluation, if this cell runs
    /// its own cleanups.
    pub fn take_cleanup(&mut self) -> Option<Cleanup> {
        if self.returns_cleanup {
            self.cleanup.take()
        } else {
            None
        }
    }

    /// Mark the cell dead and drop everything but its last value.
    ///
    /// Returns the pending cleanup so the caller can run it once the
    /// subscriptions are gone.
    pub fn kill(&mut self) -> Option<Cleanup> {
        self.alive = false;
        self.compute = None;
        self.buffer = None;
        self.subscribers.clear();
        self.sources.clear();
        debug_assert!(self.nested.is_empty(), "nested entries must be culled first");
        self.take_cleanup()
    }
}

impl<V: fmt::Debug> fmt::Debug for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("value", &self.value)
            .field("alive", &self.alive)
            .field("collector", &self.is_collector())
            .field("subscribers", &self.subscribers.len())
            .field("nested", &self.nested.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as Flag;

    #[test]
    fn source_cell_starts_alive_with_value() {
        let cell = Cell::source(3);
        assert!(cell.alive);
        assert_eq!(cell.value, Some(3));
        assert!(cell.compute.is_none());
        assert!(!cell.is_collector());
    }

    #[test]
    fn kill_keeps_value_and_hands_back_cleanup() {
        let ran = Rc::new(Flag::new(false));
        let ran_clone = ran.clone();

        let mut cell = Cell::<i32>::derived(true);
        cell.value = Some(9);
        cell.buffer = Some(vec![1, 2]);
        cell.cleanup = Some(Box::new(move || ran_clone.set(true)));

        let cleanup = cell.kill();
        assert!(!cell.alive);
        assert_eq!(cell.value, Some(9));
        assert!(!cell.is_collector());

        cleanup.expect("cleanup should be returned")();
        assert!(ran.get());
    }

    #[test]
    fn cleanup_is_ignored_without_return_cleanup() {
        let mut cell = Cell::<i32>::derived(false);
        cell.cleanup = Some(Box::new(|| {}));
        assert!(cell.take_cleanup().is_none());
    }
}
