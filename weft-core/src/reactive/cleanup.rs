//! Cleanup and Culling
//!
//! Every evaluation of a computation is wrapped so that, before the body
//! runs again, everything the previous run created is torn down. Without
//! this, each re-run would leave another generation of sub-computations
//! subscribed to their sources.
//!
//! # Teardown Order
//!
//! For each recorded sub-computation:
//!
//! 1. Cull its own sub-computations first (children before parents).
//! 2. Mark it dead, so a propagation loop still walking an older snapshot
//!    of a subscriber list skips it.
//! 3. Remove its edge from every source it subscribed to.
//! 4. Run its pending cleanup, if it returns cleanups.
//! 5. If it binds an effect, run the effect's last cleanup and forget it.
//! 6. Release its arena slot.

use std::mem;

use tracing::{debug, trace, warn};

use crate::error::{EngineError, Result};
use crate::graph::{unsubscribe, CellId, NestedEntry};

use super::cell::Computed;
use super::engine::Engine;

impl<V> Engine<V>
where
    V: Clone + 'static,
{
    /// Evaluate a live derived cell with `args` as its reactive inputs.
    ///
    /// Returns `None` without running anything if the cell is dead or has
    /// no computation.
    pub(crate) fn evaluate(&mut self, id: CellId, args: &[V]) -> Option<Computed<V>> {
        let (compute, nested, previous) = {
            let cell = self.cells.get_mut(id).filter(|cell| cell.alive)?;
            let compute = cell.compute.clone()?;
            (compute, mem::take(&mut cell.nested), cell.take_cleanup())
        };

        self.cull_all(nested);
        if let Some(cleanup) = previous {
            cleanup();
        }

        self.context.push();
        let computed = compute(self, args);
        let created = self.context.pop();

        match self.cells.get_mut(id).filter(|cell| cell.alive) {
            Some(cell) => {
                cell.nested = created;
                Some(computed)
            }
            None => {
                // Culled by its own body; nothing will ever tear these down.
                self.cull_all(created);
                if let Some(cleanup) = computed.cleanup {
                    cleanup();
                }
                None
            }
        }
    }

    pub(crate) fn cull_all(&mut self, entries: Vec<NestedEntry>) {
        for entry in entries {
            self.cull(entry);
        }
    }

    /// Tear down one sub-computation and everything it created.
    /// Culling a dead or stale cell does nothing.
    pub(crate) fn cull(&mut self, entry: NestedEntry) {
        let nested = match self.cells.get_mut(entry.cell) {
            Some(cell) if cell.alive => mem::take(&mut cell.nested),
            _ => return,
        };
        self.cull_all(nested);

        let (cleanup, effect) = self
            .cells
            .get_mut(entry.cell)
            .map(|cell| (cell.kill(), cell.effect.take()))
            .unwrap_or_default();

        for source in &entry.sources {
            if let Some(source) = self.cells.get_mut(*source) {
                unsubscribe(&mut source.subscribers, entry.cell);
            }
        }

        if let Some(cleanup) = cleanup {
            cleanup();
        }
        if let Some(effect) = effect {
            self.effects.release(effect);
        }

        self.pending.shift_remove(&entry.cell);
        self.cells.release(entry.cell);
        trace!(cell = %entry.cell, "culled");
    }

    /// Explicitly tear down a live cell, root computations included.
    ///
    /// This is the path a rendering layer takes when it removes an element:
    /// the cell's sub-computations are culled, its subscriptions removed and
    /// its cleanup run. Cells derived from it keep their last value but will
    /// not update again.
    pub fn dispose(&mut self, id: CellId) -> Result<()> {
        let sources = match self.cells.get(id) {
            Some(cell) if cell.alive => cell.sources.clone(),
            _ => {
                warn!(cell = %id, "disposing a cell that is not live");
                return Err(EngineError::DeadCell(id));
            }
        };

        self.cull(NestedEntry::new(id, sources));
        debug!(cell = %id, "disposed cell");
        Ok(())
    }
}
