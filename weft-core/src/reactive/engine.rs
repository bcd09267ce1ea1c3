//! Reactive Engine
//!
//! The engine is the central coordinator that owns every cell, the context
//! stack, the pending collector set and the effect queue. One engine is one
//! independent reactive graph.
//!
//! # How It Works
//!
//! 1. `apply` derives a cell from a callback and a list of dependencies,
//!    subscribes it to each reactive dependency and evaluates it once.
//!
//! 2. `set` starts a transaction: each assigned cell propagates depth-first
//!    to its single-dependency subscribers, while collectors are queued and
//!    recomputed in batched passes afterwards.
//!
//! 3. Before any computation re-runs, the sub-computations it created last
//!    time are culled (see `cleanup.rs`).
//!
//! 4. When the transaction settles, queued effects run once.
//!
//! # Threading
//!
//! The engine is single-threaded and fully synchronous. Computation bodies
//! receive `&mut Engine`, which both serves as their scope handle and rules
//! out concurrent mutation during propagation.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::{Arena, CellId, NestedEntry, Sources, Subscription};

use super::cell::{Cell, Cleanup, Compute, Computed};
use super::context::ContextStack;
use super::dep::Dep;
use super::effect::{EffectId, EffectQueue, ScopeId};
use super::state::StateSetter;

/// A reactive dependency graph over values of type `V`.
///
/// Hosts needing several value types in one graph use their own enum as
/// `V`.
///
/// # Example
///
/// ```rust
/// use weft_core::reactive::Engine;
///
/// let mut engine = Engine::new();
/// let count = engine.create_cell(2);
///
/// let doubled = engine
///     .apply(vec![count.into()], |_, args| args[0] * 2)
///     .unwrap();
///
/// engine.set(count, 5).unwrap();
/// assert_eq!(engine.deref(&doubled), Some(10));
/// ```
pub struct Engine<V> {
    pub(super) cells: Arena<Cell<V>>,
    pub(super) context: ContextStack,
    /// Collectors waiting for the next drain pass, in first-queued order.
    pub(super) pending: IndexSet<CellId>,
    pub(super) effects: EffectQueue<V>,
    pub(super) config: EngineConfig,
    /// Nesting depth of running transactions.
    pub(super) depth: usize,
}

impl<V> Engine<V>
where
    V: Clone + 'static,
{
    /// Create an engine with the default config.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            cells: Arena::with_capacity(config.cell_capacity),
            context: ContextStack::new(),
            pending: IndexSet::new(),
            effects: EffectQueue::new(),
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a root source cell holding `initial`.
    pub fn create_cell(&mut self, initial: V) -> CellId {
        let id = self.cells.insert(Cell::source(initial));
        debug!(cell = %id, "created source cell");
        id
    }

    /// Derive a value from `deps`.
    ///
    /// With no reactive dependency the callback runs once and its result is
    /// returned as [`Dep::Static`]. Otherwise a new cell is created,
    /// subscribed to every reactive dependency and evaluated immediately.
    /// The callback always receives the dependency values in declaration
    /// order, static ones included.
    ///
    /// Called from inside another computation, the new cell belongs to that
    /// computation and is culled before it next runs.
    pub fn apply<F>(&mut self, deps: Vec<Dep<V>>, callback: F) -> Result<Dep<V>>
    where
        F: Fn(&mut Engine<V>, &[V]) -> V + 'static,
    {
        if !deps.iter().any(Dep::is_reactive) {
            let args = statics(deps);
            return Ok(Dep::Static(callback(self, &args)));
        }

        let body: Compute<V> = Rc::new(move |engine: &mut Engine<V>, args: &[V]| {
            Computed::value(callback(engine, args))
        });
        self.derive(deps, false, body).map(Dep::Reactive)
    }

    /// Like [`apply`](Self::apply), but the callback also returns a cleanup.
    ///
    /// The cleanup from one evaluation runs right before the next one, and
    /// once more when the cell is culled. Without a reactive dependency
    /// nothing ever re-runs the callback, so its cleanup is dropped unrun.
    pub fn apply_with_cleanup<F>(&mut self, deps: Vec<Dep<V>>, callback: F) -> Result<Dep<V>>
    where
        F: Fn(&mut Engine<V>, &[V]) -> (V, Option<Cleanup>) + 'static,
    {
        if !deps.iter().any(Dep::is_reactive) {
            let args = statics(deps);
            let (value, _cleanup) = callback(self, &args);
            return Ok(Dep::Static(value));
        }

        let body: Compute<V> = Rc::new(move |engine: &mut Engine<V>, args: &[V]| {
            let (value, cleanup) = callback(engine, args);
            Computed::with_cleanup(value, cleanup)
        });
        self.derive(deps, true, body).map(Dep::Reactive)
    }

    /// Create, wire and evaluate a derived cell. At least one entry of
    /// `deps` should be reactive.
    pub(crate) fn derive(
        &mut self,
        deps: Vec<Dep<V>>,
        returns_cleanup: bool,
        body: Compute<V>,
    ) -> Result<CellId> {
        // Resolve every input before the graph is touched.
        let mut sources = Sources::new();
        let mut initial = Vec::with_capacity(deps.len());
        for dep in &deps {
            if let Dep::Reactive(source) = dep {
                initial.push(self.live_value(*source)?.clone());
                sources.push(*source);
            }
        }

        let collector = deps.len() > 1;
        let compute: Compute<V> = if collector {
            // Static entries are kept in place; `None` marks a reactive slot.
            let template: Vec<Option<V>> = deps.into_iter().map(Dep::into_static).collect();
            Rc::new(move |engine: &mut Engine<V>, reactive: &[V]| {
                let mut inputs = reactive.iter();
                let args: Vec<V> = template
                    .iter()
                    .filter_map(|slot| slot.clone().or_else(|| inputs.next().cloned()))
                    .collect();
                body(engine, &args)
            })
        } else {
            body
        };

        let mut cell = Cell::derived(returns_cleanup);
        cell.compute = Some(compute);
        cell.sources = sources.clone();
        if collector {
            cell.buffer = Some(initial.clone());
        }
        let id = self.cells.insert(cell);

        for (index, source) in sources.iter().enumerate() {
            let edge = if collector {
                Subscription::Slot {
                    collector: id,
                    index,
                }
            } else {
                Subscription::Cell(id)
            };
            if let Some(source) = self.cells.get_mut(*source) {
                source.subscribers.push(edge);
            }
        }

        if let Some(computed) = self.evaluate(id, &initial) {
            if let Some(cell) = self.cells.get_mut(id) {
                cell.value = computed.value;
                cell.cleanup = computed.cleanup;
            }
        }

        debug!(
            cell = %id,
            collector,
            inputs = sources.len(),
            root = self.context.is_root(),
            "derived cell"
        );
        self.context.record(NestedEntry::new(id, sources));

        Ok(id)
    }

    /// Create a source cell together with a setter for it.
    pub fn state(&mut self, initial: V) -> (CellId, StateSetter<V>) {
        let cell = self.create_cell(initial);
        (cell, StateSetter::new(cell))
    }

    /// Read the current value of a dependency, whether or not it is a cell.
    ///
    /// Culled cells still report their last value until their slot is
    /// reused. A stale handle yields `None`.
    pub fn deref(&self, dep: &Dep<V>) -> Option<V> {
        match dep {
            Dep::Reactive(id) => self.value(*id).cloned(),
            Dep::Static(value) => Some(value.clone()),
        }
    }

    /// Borrow the current value of a cell.
    pub fn value(&self, id: CellId) -> Option<&V> {
        self.cells.get(id).and_then(|cell| cell.value.as_ref())
    }

    /// Check whether `id` refers to a cell that has not been culled.
    pub fn is_live(&self, id: CellId) -> bool {
        self.cells.get(id).is_some_and(|cell| cell.alive)
    }

    pub(super) fn live_value(&self, id: CellId) -> Result<&V> {
        match self.cells.get(id) {
            Some(cell) if cell.alive => cell.value.as_ref().ok_or_else(|| {
                warn!(cell = %id, "dependency has not finished its first evaluation");
                EngineError::Uninitialized(id)
            }),
            _ => {
                warn!(cell = %id, "dependency is not a live cell");
                Err(EngineError::DeadCell(id))
            }
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Create an owner for effects, typically one per rendered component.
    pub fn create_scope(&mut self) -> ScopeId {
        self.effects.create_scope()
    }

    /// Check whether `scope` exists and has not been disposed.
    pub fn has_scope(&self, scope: ScopeId) -> bool {
        self.effects.has_scope(scope)
    }

    /// Register an effect in `scope` bound to `deps`.
    ///
    /// The effect is queued now and again every time a reactive dependency
    /// changes. It runs at the end of the next transaction, or at the next
    /// [`flush_effects`](Self::flush_effects).
    ///
    /// Registered from inside a computation, the effect belongs to it: when
    /// the computation re-runs or is culled, the effect's last cleanup runs
    /// and the effect is forgotten.
    pub fn register_effect<F>(
        &mut self,
        scope: ScopeId,
        deps: Vec<Dep<V>>,
        callback: F,
    ) -> Result<EffectId>
    where
        F: Fn(&[V]) -> Option<Cleanup> + 'static,
    {
        let Some(effect) = self.effects.register(scope, Rc::new(callback)) else {
            warn!(scope = %scope, "effect registered against an unknown scope");
            return Err(EngineError::UnknownScope(scope));
        };

        if !deps.iter().any(Dep::is_reactive) {
            self.effects.enqueue(effect, statics(deps));
            if !self.context.is_root() {
                // A bare cell so the owner's teardown reaches the effect.
                let mut cell = Cell::derived(false);
                cell.effect = Some(effect);
                let id = self.cells.insert(cell);
                self.effects.bind(effect, id);
                self.context.record(NestedEntry::new(id, Sources::new()));
            }
            return Ok(effect);
        }

        let binding: Compute<V> = Rc::new(move |engine: &mut Engine<V>, args: &[V]| {
            engine.effects.enqueue(effect, args.to_vec());
            Computed::empty()
        });
        match self.derive(deps, false, binding) {
            Ok(cell) => {
                if let Some(binding) = self.cells.get_mut(cell) {
                    binding.effect = Some(effect);
                }
                self.effects.bind(effect, cell);
                Ok(effect)
            }
            Err(err) => {
                self.effects.forget(effect);
                Err(err)
            }
        }
    }

    /// Run every queued effect once.
    ///
    /// Transactions flush on their own. This is for effects queued outside
    /// a transaction, such as those registered during a first render.
    pub fn flush_effects(&mut self) -> usize {
        let ran = self.effects.flush();
        if ran > 0 {
            trace!(ran, "flushed effects");
        }
        ran
    }

    /// Tear down a scope: run the last cleanup of each of its effects,
    /// drop their queued runs and cull their dependency bindings.
    pub fn dispose_scope(&mut self, scope: ScopeId) -> Result<()> {
        let Some(bindings) = self.effects.dispose_scope(scope) else {
            warn!(scope = %scope, "disposing an unknown scope");
            return Err(EngineError::UnknownScope(scope));
        };

        for binding in bindings {
            // Bindings created inside a computation may already be culled.
            if self.is_live(binding) {
                self.dispose(binding)?;
            }
        }

        debug!(scope = %scope, "disposed effect scope");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of subscription edges leaving a cell.
    pub fn subscriber_count(&self, id: CellId) -> usize {
        self.cells.get(id).map_or(0, |cell| cell.subscribers.len())
    }

    /// Number of sub-computations recorded by the last evaluation of a cell.
    pub fn nested_count(&self, id: CellId) -> usize {
        self.cells.get(id).map_or(0, |cell| cell.nested.len())
    }

    /// Number of cells that have not been culled. Culling always releases
    /// the arena slot, so this is the count of occupied slots.
    pub fn live_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Number of registered effects that have not been disposed or culled.
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    pub fn pending_effect_count(&self) -> usize {
        self.effects.pending()
    }

    /// Number of computations currently being evaluated.
    pub fn context_depth(&self) -> usize {
        self.context.depth()
    }
}

impl<V> Default for Engine<V>
where
    V: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Engine<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("live_cells", &self.cells.len())
            .field("free_slots", &self.cells.free_count())
            .field("pending_collectors", &self.pending.len())
            .field("effects", &self.effects)
            .field("context_depth", &self.context.depth())
            .finish()
    }
}

fn statics<V>(deps: Vec<Dep<V>>) -> Vec<V> {
    deps.into_iter().filter_map(Dep::into_static).collect()
}
