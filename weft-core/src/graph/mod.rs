//! Dependency Graph
//!
//! This module holds the storage side of the reactive graph: the arena that
//! owns every cell and the edge types that connect them.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Nodes are cells stored in a generational [`Arena`]
//! - Subscription edges run from a dependency to its dependents
//! - Nested entries record which computation created which sub-computation
//!
//! # Design Decisions
//!
//! 1. Cells refer to each other through [`CellId`] handles, never through
//!    references. Removing an edge is a vector edit, and a handle to a culled
//!    cell can always be detected by its generation.
//!
//! 2. A dependency lists its subscribers but does not own them. Whoever
//!    created a subscription removes it during teardown.

mod arena;
mod edge;

pub use arena::{Arena, ArenaKey, CellId};
pub use edge::{unsubscribe, NestedEntry, Sources, Subscription};
