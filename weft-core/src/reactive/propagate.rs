//! Change Propagation
//!
//! # Algorithm
//!
//! A transaction assigns each `(cell, value)` pair in order:
//!
//! 1. Store the value.
//! 2. Copy the cell's subscriber list. Cleanup triggered further down may
//!    edit the live list; the copy is what gets walked.
//! 3. For every edge in the copy whose target is still alive:
//!    - a collector slot receives the value and the collector is queued
//!    - a single-dependency cell is recomputed and assigned recursively
//!
//! Afterwards the queued collectors are drained in passes: each pass takes
//! the whole queue, recomputes every collector from its buffer and assigns
//! the result, which may queue more collectors for the next pass. A
//! collector whose inputs all change in one transaction therefore runs once.
//!
//! Finally the effect queue is flushed.

use smallvec::SmallVec;
use tracing::{debug_span, error, trace, warn};

use crate::error::{EngineError, Result};
use crate::graph::{CellId, Subscription};

use super::cell::Cleanup;
use super::dep::Dep;
use super::engine::Engine;

impl<V> Engine<V>
where
    V: Clone + 'static,
{
    /// Assign one cell and propagate.
    pub fn set(&mut self, cell: CellId, value: V) -> Result<()> {
        self.set_many([(cell, value)])
    }

    /// Assign several cells in one transaction.
    ///
    /// Every target is checked before anything is written; a dead or stale
    /// target aborts the whole call.
    pub fn set_many<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (CellId, V)>,
    {
        let pairs: Vec<(CellId, V)> = pairs.into_iter().collect();

        if let Some(&(dead, _)) = pairs.iter().find(|(id, _)| !self.is_live(*id)) {
            warn!(cell = %dead, "set() target is not a live cell");
            return Err(EngineError::DeadCell(dead));
        }

        let _span = debug_span!("transaction", pairs = pairs.len(), depth = self.depth).entered();
        self.transaction(|engine| {
            for (id, value) in pairs {
                engine.assign(id, Some(value), None);
            }
        })
    }

    /// Interleaved `cell, value, cell, value, ...` form of
    /// [`set_many`](Self::set_many) for hosts that build argument lists
    /// dynamically.
    ///
    /// Every even position must be a cell. A cell in a value position is
    /// read and its current value assigned.
    pub fn set_flat(&mut self, args: Vec<Dep<V>>) -> Result<()> {
        if args.len() % 2 == 1 {
            warn!(arguments = args.len(), "set() takes cell/value pairs");
            return Err(EngineError::OddArgumentCount(args.len()));
        }

        let mut pairs = Vec::with_capacity(args.len() / 2);
        let mut args = args.into_iter().enumerate();
        while let (Some((position, target)), Some((_, value))) = (args.next(), args.next()) {
            let Dep::Reactive(cell) = target else {
                warn!(position, "set() target is not a reactive cell");
                return Err(EngineError::NotACell { position });
            };
            let value = match value {
                Dep::Static(value) => value,
                Dep::Reactive(source) => self.live_value(source)?.clone(),
            };
            pairs.push((cell, value));
        }

        self.set_many(pairs)
    }

    /// Run `assign` as a transaction. Only the outermost transaction
    /// drains collectors and flushes effects.
    fn transaction<F>(&mut self, assign: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        self.depth += 1;
        assign(self);
        let settled = if self.depth == 1 {
            self.drain_collectors()
        } else {
            Ok(())
        };
        self.depth -= 1;

        if self.depth == 0 {
            self.flush_effects();
        }
        settled
    }

    /// Store a value in a live cell and push it to every live subscriber.
    pub(crate) fn assign(&mut self, id: CellId, value: Option<V>, cleanup: Option<Cleanup>) {
        let Some(cell) = self.cells.get_mut(id).filter(|cell| cell.alive) else {
            trace!(cell = %id, "skipping assignment to dead cell");
            return;
        };
        cell.value = value.clone();
        cell.cleanup = cleanup;

        let Some(value) = value else {
            return;
        };
        let snapshot: SmallVec<[Subscription; 4]> = cell.subscribers.iter().copied().collect();

        for subscription in snapshot {
            match subscription {
                Subscription::Slot { collector, index } => {
                    let Some(target) = self.cells.get_mut(collector).filter(|c| c.alive) else {
                        trace!(cell = %collector, "skipping dead collector");
                        continue;
                    };
                    if let Some(slot) = target.buffer.as_mut().and_then(|b| b.get_mut(index)) {
                        *slot = value.clone();
                    }
                    self.pending.insert(collector);
                }
                Subscription::Cell(target) => {
                    if !self.is_live(target) {
                        trace!(cell = %target, "skipping dead subscriber");
                        continue;
                    }
                    trace!(from = %id, to = %target, "propagating");
                    if let Some(computed) = self.evaluate(target, std::slice::from_ref(&value)) {
                        self.assign(target, computed.value, computed.cleanup);
                    }
                }
            }
        }
    }

    /// Recompute queued collectors until no more are queued.
    fn drain_collectors(&mut self) -> Result<()> {
        let mut passes = 0;

        while !self.pending.is_empty() {
            if passes == self.config.max_collector_passes {
                let stranded = self.pending.len();
                self.pending.clear();
                error!(passes, stranded, "collectors did not settle, abandoning drain");
                return Err(EngineError::UnsettledCollectors { passes });
            }
            passes += 1;

            let batch = std::mem::take(&mut self.pending);
            trace!(pass = passes, collectors = batch.len(), "draining collectors");

            for collector in batch {
                let Some(args) = self
                    .cells
                    .get(collector)
                    .filter(|cell| cell.alive)
                    .and_then(|cell| cell.buffer.clone())
                else {
                    continue;
                };
                if let Some(computed) = self.evaluate(collector, &args) {
                    self.assign(collector, computed.value, computed.cleanup);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    fn counter() -> Rc<Counter<usize>> {
        Rc::new(Counter::new(0))
    }

    #[test]
    fn chain_propagates_transitively() {
        let mut engine = Engine::new();
        let a = engine.create_cell(1);
        let b = engine.apply(vec![a.into()], |_, args| args[0] * 2).unwrap();
        let c = engine.apply(vec![b.clone()], |_, args| args[0] + 1).unwrap();
        let d = engine.apply(vec![c.clone()], |_, args| args[0] * 10).unwrap();

        engine.set(a, 4).unwrap();
        assert_eq!(engine.deref(&b), Some(8));
        assert_eq!(engine.deref(&c), Some(9));
        assert_eq!(engine.deref(&d), Some(90));
    }

    #[test]
    fn collector_runs_once_per_transaction() {
        let mut engine = Engine::new();
        let x = engine.create_cell(1);
        let y = engine.create_cell(2);
        let runs = counter();
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));

        let (runs_clone, seen_clone) = (runs.clone(), seen.clone());
        let sum = engine
            .apply(vec![x.into(), y.into()], move |_, args| {
                runs_clone.set(runs_clone.get() + 1);
                seen_clone.borrow_mut().push((args[0], args[1]));
                args[0] + args[1]
            })
            .unwrap();
        assert_eq!(runs.get(), 1);

        engine.set_many([(x, 10), (y, 20)]).unwrap();
        assert_eq!(runs.get(), 2);
        assert_eq!(seen.borrow().last(), Some(&(10, 20)));
        assert_eq!(engine.deref(&sum), Some(30));
    }

    #[test]
    fn diamond_collector_sees_both_branches() {
        let mut engine = Engine::new();
        let a = engine.create_cell(1);
        let left = engine.apply(vec![a.into()], |_, args| args[0] + 1).unwrap();
        let right = engine.apply(vec![a.into()], |_, args| args[0] * 100).unwrap();
        let runs = counter();
        let runs_clone = runs.clone();
        let joined = engine
            .apply(vec![left, right], move |_, args| {
                runs_clone.set(runs_clone.get() + 1);
                args[0] + args[1]
            })
            .unwrap();

        engine.set(a, 2).unwrap();
        assert_eq!(engine.deref(&joined), Some(203));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn collectors_feeding_collectors_settle_in_passes() {
        let mut engine = Engine::new();
        let x = engine.create_cell(1);
        let y = engine.create_cell(1);
        let first = engine.apply(vec![x.into(), y.into()], |_, args| args[0] + args[1]).unwrap();
        let second = engine
            .apply(vec![first.clone(), Dep::Static(3)], |_, args| args[0] * args[1])
            .unwrap();

        engine.set_many([(x, 2), (y, 5)]).unwrap();
        assert_eq!(engine.deref(&first), Some(7));
        assert_eq!(engine.deref(&second), Some(21));
    }

    #[test]
    fn dead_target_aborts_without_partial_mutation() {
        let mut engine = Engine::new();
        let a = engine.create_cell(1);
        let b = engine.create_cell(2);
        engine.dispose(b).unwrap();

        let err = engine.set_many([(a, 5), (b, 6)]).unwrap_err();
        assert!(matches!(err, EngineError::DeadCell(id) if id == b));
        assert_eq!(engine.value(a), Some(&1));
    }

    #[test]
    fn set_flat_checks_arity_and_targets() {
        let mut engine = Engine::new();
        let a = engine.create_cell(1);
        let b = engine.create_cell(2);

        let err = engine
            .set_flat(vec![a.into(), Dep::Static(3), b.into()])
            .unwrap_err();
        assert!(matches!(err, EngineError::OddArgumentCount(3)));

        let err = engine
            .set_flat(vec![Dep::Static(0), Dep::Static(3)])
            .unwrap_err();
        assert!(matches!(err, EngineError::NotACell { position: 0 }));

        engine
            .set_flat(vec![a.into(), Dep::Static(7), b.into(), a.into()])
            .unwrap();
        assert_eq!(engine.value(a), Some(&7));
        // Read before any assignment of this call
        assert_eq!(engine.value(b), Some(&1));
    }

    #[test]
    fn deref_round_trips_assigned_values() {
        let mut engine = Engine::new();
        let cell = engine.create_cell(String::new());
        for text in ["", "hello", "wörld", "  padded  "] {
            engine.set(cell, text.to_string()).unwrap();
            assert_eq!(engine.deref(&cell.into()), Some(text.to_string()));
        }
    }

    #[test]
    fn runaway_collectors_hit_the_pass_budget() {
        let config = EngineConfig {
            max_collector_passes: 4,
            ..EngineConfig::default()
        };
        let mut engine = Engine::with_config(config);
        let x = engine.create_cell(0);
        let y = engine.create_cell(0);

        // Once `y` is raised, every evaluation writes back into its own input.
        engine
            .apply(vec![x.into(), y.into()], move |engine, args| {
                if args[1] > 0 {
                    let _ = engine.set(x, args[0] + 1);
                }
                args[0]
            })
            .unwrap();

        let err = engine.set(y, 1).unwrap_err();
        assert!(matches!(err, EngineError::UnsettledCollectors { passes: 4 }));

        // The engine stays usable afterwards
        let z = engine.create_cell(5);
        engine.set(z, 6).unwrap();
        assert_eq!(engine.value(z), Some(&6));
    }
}
