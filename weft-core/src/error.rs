//! Error types for the reactive engine.
//!
//! Every error is local to the call that produced it. The engine reports it
//! and leaves the graph exactly as it was before the call.

use thiserror::Error;

use crate::graph::CellId;
use crate::reactive::ScopeId;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("set() takes cell/value pairs, got {0} arguments")]
    OddArgumentCount(usize),

    #[error("argument {position} of set() is not a reactive cell")]
    NotACell { position: usize },

    #[error("{0} is not a live cell")]
    DeadCell(CellId),

    #[error("{0} has not finished its first evaluation")]
    Uninitialized(CellId),

    #[error("{0} does not exist or was disposed")]
    UnknownScope(ScopeId),

    #[error("collectors did not settle after {passes} passes")]
    UnsettledCollectors { passes: usize },

    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
}
