//! Effect Queue
//!
//! An Effect is a side-effecting callback bound to the current values of its
//! dependencies. Effects never run during propagation. Whenever their
//! dependencies change they are queued, and the queue is flushed once the
//! whole transaction has settled.
//!
//! # How Effects Work
//!
//! 1. A rendering layer creates a scope for each component and registers
//!    effects against it.
//!
//! 2. Registration derives a binding over the effect's dependencies. Each
//!    evaluation of the binding queues the effect with fresh arguments.
//!
//! 3. Flushing runs, for every queued effect in registration order, the cleanup
//!    left by its previous run and then the effect itself. Whatever the
//!    effect returns becomes its next cleanup.
//!
//! 4. Disposing a scope runs the last cleanup of each of its effects and
//!    forgets them. So does culling the computation an effect was
//!    registered in: its binding is culled with it and releases the effect.
//!
//! # Cleanup
//!
//! Effect bodies receive only their argument values. They cannot reach the
//! engine, so an effect cannot register another effect while the queue is
//! being flushed.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::graph::{Arena, ArenaKey, CellId};

use super::cell::Cleanup;

/// Identity of an owner of effects, usually one rendered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId {
    index: u32,
    generation: u32,
}

/// Identity of one registered effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId {
    index: u32,
    generation: u32,
}

macro_rules! arena_key {
    ($name:ident, $label:literal) => {
        impl ArenaKey for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }

            fn slot(&self) -> usize {
                self.index as usize
            }

            fn slot_generation(&self) -> u32 {
                self.generation
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}v{}"), self.index, self.generation)
            }
        }
    };
}

arena_key!(ScopeId, "scope");
arena_key!(EffectId, "effect");

pub(crate) type EffectBody<V> = Rc<dyn Fn(&[V]) -> Option<Cleanup>>;

struct EffectRecord<V> {
    scope: ScopeId,
    /// Registration sequence number; flushes run in this order.
    seq: u64,
    body: EffectBody<V>,
    /// Arguments bound by the latest evaluation of the binding.
    args: Option<Vec<V>>,
    last_cleanup: Option<Cleanup>,
    /// The cell feeding this effect, if it has one.
    binding: Option<CellId>,
}

/// Engine-owned effect storage and run queue.
///
/// Released records and scopes are stored as `None` until their slot is
/// reused, so stale ids find nothing.
pub struct EffectQueue<V> {
    records: Arena<Option<EffectRecord<V>>, EffectId>,
    scopes: Arena<Option<Vec<EffectId>>, ScopeId>,
    queue: IndexSet<EffectId>,
    next_seq: u64,
}

impl<V> EffectQueue<V> {
    pub fn new() -> Self {
        Self {
            records: Arena::new(),
            scopes: Arena::new(),
            queue: IndexSet::new(),
            next_seq: 0,
        }
    }

    pub fn create_scope(&mut self) -> ScopeId {
        self.scopes.insert(Some(Vec::new()))
    }

    pub fn has_scope(&self, scope: ScopeId) -> bool {
        matches!(self.scopes.get(scope), Some(Some(_)))
    }

    /// Number of registered effects across all scopes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_mut(&mut self, effect: EffectId) -> Option<&mut EffectRecord<V>> {
        self.records.get_mut(effect)?.as_mut()
    }

    /// Add an effect to a scope. Returns `None` if the scope is unknown.
    pub(crate) fn register(&mut self, scope: ScopeId, body: EffectBody<V>) -> Option<EffectId> {
        if !self.has_scope(scope) {
            return None;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let effect = self.records.insert(Some(EffectRecord {
            scope,
            seq,
            body,
            args: None,
            last_cleanup: None,
            binding: None,
        }));

        if let Some(Some(effects)) = self.scopes.get_mut(scope) {
            effects.push(effect);
        }
        Some(effect)
    }

    /// Detach a record from its scope and the run queue and free its slot.
    fn take(&mut self, effect: EffectId) -> Option<EffectRecord<V>> {
        let record = self.records.get_mut(effect)?.take()?;
        self.records.release(effect);
        self.queue.shift_remove(&effect);
        if let Some(Some(effects)) = self.scopes.get_mut(record.scope) {
            effects.retain(|e| *e != effect);
        }
        Some(record)
    }

    /// Undo a registration whose binding could not be created.
    pub(crate) fn forget(&mut self, effect: EffectId) {
        self.take(effect);
    }

    /// Run the last cleanup of one effect and forget it. Releasing a
    /// stale or already released effect does nothing.
    pub(crate) fn release(&mut self, effect: EffectId) {
        if let Some(cleanup) = self.take(effect).and_then(|record| record.last_cleanup) {
            cleanup();
        }
    }

    pub(crate) fn bind(&mut self, effect: EffectId, binding: CellId) {
        if let Some(record) = self.record_mut(effect) {
            record.binding = Some(binding);
        }
    }

    /// Queue an effect to run with `args` at the next flush. Queuing an
    /// already-queued effect only rebinds its arguments.
    pub(crate) fn enqueue(&mut self, effect: EffectId, args: Vec<V>) {
        if let Some(record) = self.record_mut(effect) {
            record.args = Some(args);
            self.queue.insert(effect);
        }
    }

    /// Number of effects waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Run every queued effect once, in registration order, and clear the
    /// queue.
    ///
    /// Returns the number of effects that ran.
    pub fn flush(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queue);
        let mut order: Vec<(u64, EffectId)> = queued
            .into_iter()
            .filter_map(|effect| Some((self.records.get(effect)?.as_ref()?.seq, effect)))
            .collect();
        order.sort_unstable();

        let mut ran = 0;
        for (_, effect) in order {
            let Some(record) = self.record_mut(effect) else {
                continue;
            };

            if let Some(cleanup) = record.last_cleanup.take() {
                cleanup();
            }

            let args = record.args.take().unwrap_or_default();
            record.last_cleanup = (record.body)(&args);
            ran += 1;
        }

        ran
    }

    /// Run the last cleanup of every effect in `scope` and forget them.
    ///
    /// Returns the bindings the caller should tear down, or `None` if the
    /// scope is unknown.
    pub(crate) fn dispose_scope(&mut self, scope: ScopeId) -> Option<Vec<CellId>> {
        let effects = self.scopes.get_mut(scope)?.take()?;
        self.scopes.release(scope);
        let mut bindings = Vec::new();

        for effect in effects {
            let Some(record) = self.take(effect) else {
                continue;
            };
            if let Some(cleanup) = record.last_cleanup {
                cleanup();
            }
            bindings.extend(record.binding);
        }

        Some(bindings)
    }
}

impl<V> Default for EffectQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for EffectQueue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectQueue")
            .field("effects", &self.records.len())
            .field("scopes", &self.scopes.len())
            .field("pending", &self.queue.len())
            .finish()
    }
}
