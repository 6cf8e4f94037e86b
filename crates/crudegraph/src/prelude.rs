//! Prelude module - common imports for crudegraph users
//!
//! ```rust
//! use crudegraph::prelude::*;
//! ```

pub use crate::{
    // Batch processing
    BatchItem,
    BatchOptions,
    BatchProcessor,
    BatchReport,
    // Calculation types
    CalculationContext,
    CalculationOptions,
    CalculationStats,
    CancelToken,
    // Cell types
    CellError,
    CellName,
    // Error types
    Error,
    ErrorKind,
    // Functions
    FunctionRegistry,
    // Models
    ModelDefinition,
    Operand,
    Result,
    // Validation
    Tolerance,
    Validator,
    Value,
};
