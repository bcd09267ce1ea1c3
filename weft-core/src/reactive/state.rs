//! State Setters
//!
//! A state is a source cell paired with a setter, the `[value, setValue]`
//! shape a component layer hands to its users.

use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::graph::CellId;

use super::engine::Engine;

/// Writes to one source cell. Each call is its own transaction.
pub struct StateSetter<V> {
    cell: CellId,
    _value: PhantomData<fn(V)>,
}

impl<V> StateSetter<V>
where
    V: Clone + 'static,
{
    pub(crate) fn new(cell: CellId) -> Self {
        Self {
            cell,
            _value: PhantomData,
        }
    }

    /// The cell this setter writes to.
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// Assign `value` and propagate it.
    pub fn set(&self, engine: &mut Engine<V>, value: V) -> Result<()> {
        engine.set(self.cell, value)
    }

    /// Assign a value computed from the current one.
    pub fn update<F>(&self, engine: &mut Engine<V>, f: F) -> Result<()>
    where
        F: FnOnce(&V) -> V,
    {
        let next = f(engine.live_value(self.cell)?);
        engine.set(self.cell, next)
    }
}

impl<V> Clone for StateSetter<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for StateSetter<V> {}

impl<V> fmt::Debug for StateSetter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter").field("cell", &self.cell).finish()
    }
}
