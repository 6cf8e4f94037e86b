//! Cell value types

use std::fmt;

/// The value flowing through every cell of a calculation graph
///
/// There is no string or empty variant: a cell either holds a number, a
/// boolean, or a computational error that propagates like any other value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    /// Numeric value (IEEE double precision)
    Number(f64),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Computational error (#DIV/0!, #VALUE!, etc.)
    Error(CellError),
}

impl Value {
    /// Create an error value with an explicit message
    pub fn error<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Value::Error(CellError::new(kind, message))
    }

    /// Check if the value is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Get the error if this value is one
    pub fn as_error(&self) -> Option<&CellError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Get the error kind if this value is an error
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.as_error().map(|e| e.kind)
    }

    /// Try to get the value as a number
    ///
    /// Booleans coerce to 0/1; errors yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            Value::Error(_) => None,
        }
    }

    /// Try to get the value as a boolean
    ///
    /// Numbers are truthy when nonzero; errors yield `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Error(_) => None,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Error(_) => "error",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{}", e.kind),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<CellError> for Value {
    fn from(e: CellError) -> Self {
        Value::Error(e)
    }
}

impl From<ErrorKind> for Value {
    fn from(kind: ErrorKind) -> Self {
        Value::Error(CellError::from(kind))
    }
}

/// Kinds of computational error a cell can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// #DIV/0! - Division by zero
    #[cfg_attr(feature = "serde", serde(rename = "#DIV/0!", alias = "DivideByZero"))]
    DivideByZero,
    /// #VALUE! - Operand of the wrong type
    #[cfg_attr(feature = "serde", serde(rename = "#VALUE!", alias = "TypeMismatch"))]
    TypeMismatch,
    /// #EMPTY! - Reducer received no usable operands
    #[cfg_attr(feature = "serde", serde(rename = "#EMPTY!", alias = "EmptyOperands"))]
    EmptyOperands,
    /// #NUM! - Non-finite or out-of-domain numeric result
    #[cfg_attr(feature = "serde", serde(rename = "#NUM!", alias = "InvalidNumber"))]
    InvalidNumber,
    /// #N/A - Value not available
    #[cfg_attr(feature = "serde", serde(rename = "#N/A", alias = "NotAvailable"))]
    NotAvailable,
    /// #DOMAIN! - Error raised by a domain layer
    #[cfg_attr(feature = "serde", serde(rename = "#DOMAIN!", alias = "Domain"))]
    Domain,
}

impl ErrorKind {
    /// Get the display code for this error kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DivideByZero => "#DIV/0!",
            ErrorKind::TypeMismatch => "#VALUE!",
            ErrorKind::EmptyOperands => "#EMPTY!",
            ErrorKind::InvalidNumber => "#NUM!",
            ErrorKind::NotAvailable => "#N/A",
            ErrorKind::Domain => "#DOMAIN!",
        }
    }

    /// Parse a display code or variant name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "#DIV/0!" | "DIVIDEBYZERO" => Some(ErrorKind::DivideByZero),
            "#VALUE!" | "TYPEMISMATCH" => Some(ErrorKind::TypeMismatch),
            "#EMPTY!" | "EMPTYOPERANDS" => Some(ErrorKind::EmptyOperands),
            "#NUM!" | "INVALIDNUMBER" => Some(ErrorKind::InvalidNumber),
            "#N/A" | "NOTAVAILABLE" => Some(ErrorKind::NotAvailable),
            "#DOMAIN!" | "DOMAIN" => Some(ErrorKind::Domain),
            _ => None,
        }
    }

    /// Default human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::DivideByZero => "division by zero",
            ErrorKind::TypeMismatch => "operand has the wrong type",
            ErrorKind::EmptyOperands => "no operands to reduce",
            ErrorKind::InvalidNumber => "result is not a finite number",
            ErrorKind::NotAvailable => "value not available",
            ErrorKind::Domain => "domain error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A computational error carried as a cell value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellError {
    #[cfg_attr(feature = "serde", serde(rename = "error"))]
    pub kind: ErrorKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: String,
}

impl CellError {
    /// Create a new error with a message
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ErrorKind> for CellError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.description())
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{} ({})", self.kind, self.message)
        }
    }
}
