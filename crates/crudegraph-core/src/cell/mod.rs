//! Cell-related types
//!
//! This module contains:
//! - [`Value`] - The value flowing through a cell
//! - [`CellName`] - A cell's unique name within a context
//! - [`Operand`] and [`Formula`] - How a derived cell is computed
//! - [`Cell`] - Complete cell data including cached value and dirty flag

mod data;
mod name;
mod value;

pub use data::{Cell, CellContent, CellKind, Formula, Operand};
pub use name::CellName;
pub use value::{CellError, ErrorKind, Value};
