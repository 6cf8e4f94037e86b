//! Error types for crudegraph-core

use crate::cell::{CellKind, CellName};
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors: failures of a whole registration or evaluation call
///
/// Computational errors (division by zero, type mismatches, ...) are not
/// represented here; they are values (see [`crate::Value::Error`]).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A cell with this name is already registered in the context
    #[error("Cell name already exists: {0}")]
    DuplicateCellName(CellName),

    /// A name that is not registered in the context
    #[error("Unknown cell reference: {name}{}", referrer_suffix(.referenced_by))]
    UnknownCellReference {
        name: CellName,
        /// The formula cell naming it, if any
        referenced_by: Option<CellName>,
    },

    /// Operation applied to the wrong kind of cell
    #[error("Cell {name} is a {actual} cell, expected a {expected} cell")]
    WrongCellKind {
        name: CellName,
        expected: CellKind,
        actual: CellKind,
    },

    /// Dependency cycle, members in path order
    #[error("Cyclic dependency: {}", join_names(.0))]
    CyclicDependency(Vec<CellName>),

    /// Formula names a function missing from the registry
    #[error("Unknown function {function} in cell {cell}")]
    UnknownFunction { cell: CellName, function: String },

    /// Wrong number of operands
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Evaluation abandoned through a cancel token
    #[error("Evaluation cancelled")]
    Cancelled,

    /// Evaluation exceeded the per-context time limit
    #[error("Evaluation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Malformed model definition or batch input
    #[error("Invalid model: {0}")]
    Model(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "model" error with a message
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Error::Model(msg.into())
    }

    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Unknown reference with no referring cell (e.g. a requested output)
    pub fn unknown<N: Into<CellName>>(name: N) -> Self {
        Error::UnknownCellReference {
            name: name.into(),
            referenced_by: None,
        }
    }
}

fn referrer_suffix(referenced_by: &Option<CellName>) -> String {
    match referenced_by {
        Some(cell) => format!(" (referenced by {})", cell),
        None => String::new(),
    }
}

fn join_names(names: &[CellName]) -> String {
    names
        .iter()
        .map(CellName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::UnknownCellReference {
            name: "y".into(),
            referenced_by: Some("x".into()),
        };
        assert_eq!(err.to_string(), "Unknown cell reference: y (referenced by x)");
        assert_eq!(Error::unknown("z").to_string(), "Unknown cell reference: z");

        let err = Error::CyclicDependency(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Cyclic dependency: a -> b");

        let err = Error::WrongCellKind {
            name: "c".into(),
            expected: CellKind::Literal,
            actual: CellKind::Formula,
        };
        assert_eq!(
            err.to_string(),
            "Cell c is a formula cell, expected a literal cell"
        );
    }
}
