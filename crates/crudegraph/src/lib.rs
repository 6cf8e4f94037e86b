//! # crudegraph
//!
//! A calculation graph engine for spreadsheet-style refinery models.
//!
//! Cells are named and hold either a literal value or a formula: a built-in
//! function applied to an explicit list of operands. Evaluating a set of
//! outputs builds the dependency subgraph they need, rejects cycles and
//! dangling references, and computes cells in a deterministic topological
//! order. Results are cached, and updating an input recomputes only the
//! cells that depend on it.
//!
//! ## Features
//!
//! - Incremental recalculation driven by dirty flags
//! - Computational errors (`#DIV/0!`, `#N/A`, ...) propagate as values
//! - Structural errors (cycles, unknown references) fail the whole call
//! - JSON model definitions
//! - Batch processing of many input sets, in parallel with the `parallel`
//!   feature
//! - Validation against reference values
//!
//! ## Example
//!
//! ```rust
//! use crudegraph::prelude::*;
//!
//! let mut ctx = CalculationContext::new();
//!
//! ctx.register_literal("b", 0.0).unwrap();
//! ctx.register_formula("c", "SELECT", vec!["b".into(), 3.into(), 10.into()]).unwrap();
//!
//! assert_eq!(ctx.value("c").unwrap(), Value::Number(10.0));
//!
//! // Only `c` is recomputed
//! ctx.set_literal("b", 1.0).unwrap();
//! assert_eq!(ctx.value("c").unwrap(), Value::Number(3.0));
//! ```

pub mod batch;
pub mod calculation;
pub mod context;
pub mod model;
pub mod prelude;
pub mod scheduler;
pub mod validation;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, CancelToken};
pub use context::CalculationContext;
pub use scheduler::{EvaluationPlan, Scheduler};

// Re-export model, batch and validation types
pub use batch::{
    parse_value, read_items_csv, read_items_csv_file, BatchItem, BatchOptions, BatchOutcome,
    BatchProcessor, BatchReport, BatchResult,
};
pub use model::{FormulaDefinition, ModelDefinition};
pub use validation::{
    reference_from_json, reference_from_path, Tolerance, ValidationReport, ValidationResult,
    Validator,
};

// Re-export core types
pub use crudegraph_core::{
    Cell, CellContent, CellError, CellKind, CellName, Error, ErrorKind, Formula, Operand, Result,
    Value,
};

// Re-export formula types
pub use crudegraph_formula::{DependencyGraph, FunctionDef, FunctionImpl, FunctionRegistry};
