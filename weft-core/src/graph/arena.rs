//! Cell Arena
//!
//! This module stores every cell of an engine in a flat, generational slot
//! vector. Handles are plain `(index, generation)` pairs, so the graph never
//! holds references into itself. The same storage backs effect records and
//! effect scopes, each with its own handle type.

use std::fmt;
use std::marker::PhantomData;

/// A handle type issued by an [`Arena`].
pub trait ArenaKey: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;

    fn slot(&self) -> usize;

    fn slot_generation(&self) -> u32;
}

/// Handle to a cell in an engine's arena.
///
/// A handle stays valid until its slot is reused by a newer cell. After that
/// the generation no longer matches and every lookup through the old handle
/// fails, exactly as if the cell were dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    index: u32,
    generation: u32,
}

impl CellId {
    /// Get the raw slot index.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Get the slot generation this handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl ArenaKey for CellId {
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

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    /// Released slots keep their last item until reused.
    vacant: bool,
    item: T,
}

/// Generational storage, keyed by [`CellId`] unless told otherwise.
#[derive(Debug)]
pub struct Arena<T, K = CellId> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    _key: PhantomData<fn() -> K>,
}

impl<T, K: ArenaKey> Arena<T, K> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty arena with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Insert an item, reusing a released slot when one is available.
    pub fn insert(&mut self, item: T) -> K {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.vacant = false;
            slot.item = item;
            return K::from_parts(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            vacant: false,
            item,
        });
        K::from_parts(index, 0)
    }

    /// Get the item behind a handle, including a released one that has not
    /// been reused yet.
    pub fn get(&self, id: K) -> Option<&T> {
        self.slots
            .get(id.slot())
            .filter(|slot| slot.generation == id.slot_generation())
            .map(|slot| &slot.item)
    }

    /// Mutable counterpart of [`Arena::get`].
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        self.slots
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.slot_generation())
            .map(|slot| &mut slot.item)
    }

    /// Return a slot to the free list.
    ///
    /// The item stays readable through `id` until the slot is handed out
    /// again. Releasing twice is a no-op.
    pub fn release(&mut self, id: K) {
        if let Some(slot) = self.slots.get_mut(id.slot()) {
            if slot.generation == id.slot_generation() && !slot.vacant {
                slot.vacant = true;
                self.free.push(id.slot() as u32);
            }
        }
    }

    /// Number of occupied (not released) slots.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Check whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of released slots waiting for reuse.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}

impl<T, K: ArenaKey> Default for Arena<T, K> {
    fn default() -> Self {
        Self::new()
    }
}
