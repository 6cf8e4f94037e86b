//! # crudegraph-core
//!
//! Core data structures for the crudegraph calculation engine.
//!
//! This crate provides the fundamental types used throughout crudegraph:
//! - [`Value`] - Tagged number / boolean / error values
//! - [`CellName`] - Context-scoped cell names
//! - [`Cell`], [`Formula`], [`Operand`] - Literal and derived cells
//! - [`Error`] - Structural failures (cycles, unknown references, ...)
//!
//! ## Example
//!
//! ```rust
//! use crudegraph_core::{Cell, Formula, Operand, Value};
//!
//! let input = Cell::literal("api_gravity", Value::Number(32.1));
//! let derived = Cell::formula(
//!     "light_ends",
//!     Formula::new("MUL", vec![Operand::cell("api_gravity"), Operand::literal(0.01)]),
//! );
//!
//! assert!(input.is_dirty());
//! assert_eq!(derived.references().len(), 1);
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{Cell, CellContent, CellError, CellKind, CellName, ErrorKind, Formula, Operand, Value};
pub use error::{Error, Result};
