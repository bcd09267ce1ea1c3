//! Weft Core
//!
//! This crate provides the core of Weft, a fine-grained reactive dependency
//! engine. It implements:
//!
//! - Mutable cells and derived computations over them
//! - Transactional change propagation with batched multi-input collectors
//! - Lifecycle tracking and teardown of nested computations
//! - A per-transaction effect queue with cleanup-before-rerun semantics
//!
//! The engine knows nothing about rendering. A UI layer builds on `apply`,
//! `set`, `deref`, `dispose` and effect scopes; so can any other consumer
//! that needs incremental recomputation over changing data.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Generational cell arena and subscription edges
//! - `reactive`: The engine, propagation, cleanup and effects
//! - `config`: Engine tunables, loadable from JSON
//! - `error`: The error type shared by every fallible operation
//!
//! # Example
//!
//! ```rust
//! use weft_core::reactive::{Dep, Engine};
//!
//! let mut engine = Engine::new();
//! let (price, set_price) = engine.state(10);
//! let quantity = engine.create_cell(3);
//!
//! // A collector over two cells and a constant
//! let total = engine
//!     .apply(
//!         vec![price.into(), quantity.into(), Dep::Static(1)],
//!         |_, args| args[0] * args[1] + args[2],
//!     )
//!     .unwrap();
//! assert_eq!(engine.deref(&total), Some(31));
//!
//! // Both inputs change, the collector recomputes once
//! engine.set_many([(price, 20), (quantity, 2)]).unwrap();
//! assert_eq!(engine.deref(&total), Some(41));
//!
//! set_price.set(&mut engine, 5).unwrap();
//! assert_eq!(engine.deref(&total), Some(11));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use graph::CellId;
pub use reactive::{Cleanup, Dep, Engine, ScopeId};
