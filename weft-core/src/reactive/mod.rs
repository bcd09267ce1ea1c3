//! Reactive Primitives
//!
//! This module implements the reactive engine: cells, derivations,
//! transactions, nested cleanup and effects.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A cell holds a value and a list of subscriptions. Source cells are
//! written with `set`; derived cells are created by `apply` and recompute
//! whenever one of their reactive dependencies changes.
//!
//! ## Collectors
//!
//! A derivation over more than one dependency is a collector. Its reactive
//! inputs are buffered by position and it is recomputed after direct
//! propagation has finished, so it runs once per transaction no matter how
//! many of its inputs changed.
//!
//! ## Nested Computations
//!
//! A derivation created while another one is running belongs to it. Before
//! the owner runs again the old derivation is culled: marked dead,
//! unsubscribed from its sources, and given the chance to run its cleanup.
//!
//! ## Effects
//!
//! Effects are callbacks bound to dependency values and grouped by scope.
//! They are queued during a transaction and run once it settles.
//!
//! # Implementation Notes
//!
//! Dependencies are declared explicitly as a list of [`Dep`] values rather
//! than discovered by tracking reads. All state lives in an [`Engine`], so
//! independent graphs never share frames, queues or cells.

mod cell;
mod cleanup;
mod context;
mod dep;
mod effect;
mod engine;
mod propagate;
mod state;

pub use cell::Cleanup;
pub use dep::Dep;
pub use effect::{EffectId, ScopeId};
pub use engine::Engine;
pub use state::StateSetter;
