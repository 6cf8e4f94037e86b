//! # crudegraph-formula
//!
//! Formula function library and dependency graph for crudegraph.
//!
//! This crate provides:
//! - A registry of pure, spreadsheet-equivalent functions (`IF`, `SUM`,
//!   `MAX`, `MIN`, arithmetic, comparisons, error-tolerant helpers)
//! - Dependency tracking, cycle detection and deterministic topological
//!   ordering for calculation chains
//!
//! ## Example
//!
//! ```rust
//! use crudegraph_core::Value;
//! use crudegraph_formula::FunctionRegistry;
//!
//! let registry = FunctionRegistry::builtin();
//! let sum = registry.get("SUM").unwrap();
//! assert_eq!(sum.call(&[Value::Number(1.0), Value::Boolean(true)]), Value::Number(2.0));
//! ```

pub mod dependency;
pub mod functions;

pub use dependency::DependencyGraph;
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry};
