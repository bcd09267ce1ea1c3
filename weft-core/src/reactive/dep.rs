//! Dependency values.
//!
//! Anything passed to `apply` is either a reactive cell or a plain value.

use crate::graph::CellId;

/// A dependency of a computation, or the result of one.
#[derive(Debug, Clone, PartialEq)]
pub enum Dep<V> {
    Reactive(CellId),
    Static(V),
}

impl<V> Dep<V> {
    /// Check whether this is a cell handle. This is a tag test: a handle to
    /// a culled cell is still reactive.
    pub fn is_reactive(&self) -> bool {
        matches!(self, Dep::Reactive(_))
    }

    pub fn cell(&self) -> Option<CellId> {
        match self {
            Dep::Reactive(id) => Some(*id),
            Dep::Static(_) => None,
        }
    }

    pub fn into_static(self) -> Option<V> {
        match self {
            Dep::Static(value) => Some(value),
            Dep::Reactive(_) => None,
        }
    }
}

impl<V> From<CellId> for Dep<V> {
    fn from(id: CellId) -> Self {
        Dep::Reactive(id)
    }
}
