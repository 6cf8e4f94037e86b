//! Calculation options and statistics
//!
//! Options follow the same shape for one-off evaluations, retained contexts
//! used for parameter sweeps, and batch items: a plain struct with a
//! `Default` impl, cloned into each context.
//!
//! # Example
//!
//! ```rust
//! use crudegraph::prelude::*;
//! use std::time::Duration;
//!
//! let cancel = CancelToken::new();
//! let options = CalculationOptions {
//!     timeout: Some(Duration::from_secs(5)),
//!     cancel: Some(cancel.clone()),
//!     ..Default::default()
//! };
//!
//! let mut ctx = CalculationContext::new().with_options(options);
//! ctx.register_literal("a", 1.0).unwrap();
//! ctx.register_formula("b", "ADD", vec!["a".into(), 2.into()]).unwrap();
//!
//! let values = ctx.evaluate(["b"]).unwrap();
//! assert_eq!(values["b"], Value::Number(3.0));
//! println!("Evaluated {} cells", ctx.last_stats().unwrap().cells_evaluated);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation flag
///
/// Clones share the same flag. The scheduler checks it between cell
/// evaluations; a tripped token never interrupts a function call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, untripped token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for evaluating a calculation context
#[derive(Debug, Clone, Default)]
pub struct CalculationOptions {
    /// Recompute every planned cell, even if clean
    pub force_full_calculation: bool,
    /// Wall-clock limit for one evaluation pass of this context
    pub timeout: Option<Duration>,
    /// Cancellation flag, possibly shared with other contexts
    pub cancel: Option<CancelToken>,
}

/// Statistics from a calculation pass
#[derive(Debug, Clone, Default)]
pub struct CalculationStats {
    /// Cells in the evaluation plan (requested outputs and their dependencies)
    pub cells_planned: usize,
    /// Number of cells (re)computed
    pub cells_evaluated: usize,
    /// Number of clean cells whose cached value was reused
    pub cells_reused: usize,
    /// Number of computed cells whose value is an error
    pub errors: usize,
    /// Time spent evaluating
    pub duration: Duration,
}

impl CalculationStats {
    /// Format as a concise one-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "{} planned, {} evaluated, {} reused, {} errors in {:?}",
            self.cells_planned,
            self.cells_evaluated,
            self.cells_reused,
            self.errors,
            self.duration
        )
    }
}
