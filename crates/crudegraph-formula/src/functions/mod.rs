//! Built-in formula functions

pub mod logical;
pub mod math;

use ahash::AHashMap;
use crudegraph_core::{CellError, Error, ErrorKind, Result, Value};
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Function implementation signature
///
/// Functions are pure: they see only their resolved operands and always
/// return a value. Computational failures are returned as [`Value::Error`].
pub type FunctionImpl = fn(&[Value]) -> Value;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Check an operand count against this function's arity
    pub fn check_arity(&self, actual: usize) -> Result<()> {
        let too_many = self.max_args.map_or(false, |max| actual > max);
        if actual < self.min_args || too_many {
            return Err(Error::ArgumentCount {
                function: self.name.to_string(),
                expected: self.arity(),
                actual,
            });
        }
        Ok(())
    }

    /// Human-readable arity, e.g. `"2"`, `"1..2"`, `"0.."`
    pub fn arity(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{}..{}", self.min_args, max),
            None => format!("{}..", self.min_args),
        }
    }

    /// Invoke the implementation
    pub fn call(&self, args: &[Value]) -> Value {
        (self.implementation)(args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

static BUILTINS: Lazy<Arc<FunctionRegistry>> = Lazy::new(|| Arc::new(FunctionRegistry::new()));

/// Function registry
///
/// Registries are immutable once shared: contexts hold an
/// `Arc<FunctionRegistry>`, so many contexts (e.g. one per batch item) can
/// evaluate against the same set of functions concurrently.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();

        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// The shared built-in registry
    pub fn builtin() -> Arc<FunctionRegistry> {
        Arc::clone(&BUILTINS)
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Check whether a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any previous definition with that name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            min_args: 0,
            max_args: None,
            implementation: math::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            min_args: 0,
            max_args: None,
            implementation: math::fn_average,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            min_args: 0,
            max_args: None,
            implementation: math::fn_min,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            min_args: 0,
            max_args: None,
            implementation: math::fn_max,
        });

        // PRODUCT
        self.register(FunctionDef {
            name: "PRODUCT",
            min_args: 0,
            max_args: None,
            implementation: math::fn_product,
        });

        // SUMVALID (error-tolerant)
        self.register(FunctionDef {
            name: "SUMVALID",
            min_args: 0,
            max_args: None,
            implementation: math::fn_sumvalid,
        });

        self.register(FunctionDef {
            name: "ADD",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_add,
        });

        self.register(FunctionDef {
            name: "SUB",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_sub,
        });

        self.register(FunctionDef {
            name: "MUL",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_mul,
        });

        self.register(FunctionDef {
            name: "DIV",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_div,
        });

        self.register(FunctionDef {
            name: "NEG",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_neg,
        });

        // POWER
        self.register(FunctionDef {
            name: "POWER",
            min_args: 2,
            max_args: Some(2),
            implementation: math::fn_power,
        });

        // SQRT
        self.register(FunctionDef {
            name: "SQRT",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_sqrt,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            min_args: 1,
            max_args: Some(1),
            implementation: math::fn_abs,
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            min_args: 1,
            max_args: Some(2),
            implementation: math::fn_round,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF
        self.register(FunctionDef {
            name: "IF",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_select,
        });

        // SELECT (alias of IF)
        self.register(FunctionDef {
            name: "SELECT",
            min_args: 2,
            max_args: Some(3),
            implementation: logical::fn_select,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
        });

        // IFERROR
        self.register(FunctionDef {
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            implementation: logical::fn_iferror,
        });

        // ISERROR
        self.register(FunctionDef {
            name: "ISERROR",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_iserror,
        });

        // Comparisons
        let comparisons: [(&'static str, FunctionImpl); 6] = [
            ("GT", logical::fn_gt),
            ("GE", logical::fn_ge),
            ("LT", logical::fn_lt),
            ("LE", logical::fn_le),
            ("EQ", logical::fn_eq),
            ("NE", logical::fn_ne),
        ];
        for (name, implementation) in comparisons {
            self.register(FunctionDef {
                name,
                min_args: 2,
                max_args: Some(2),
                implementation,
            });
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce every operand to a number, stopping at the first error
///
/// Errors win left-to-right: the returned error is the leftmost one.
pub(crate) fn numbers(args: &[Value]) -> std::result::Result<Vec<f64>, CellError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            Value::Number(n) => out.push(*n),
            Value::Boolean(b) => out.push(if *b { 1.0 } else { 0.0 }),
            Value::Error(e) => return Err(e.clone()),
        }
    }
    Ok(out)
}

/// Wrap a numeric result, mapping NaN/infinity to `#NUM!`
pub(crate) fn finite(n: f64) -> Value {
    if n.is_finite() {
        Value::Number(n)
    } else {
        Value::from(ErrorKind::InvalidNumber)
    }
}
