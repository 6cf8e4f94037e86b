//! Model definitions
//!
//! A model is the set of cell registrations that make up one calculation:
//! literal inputs with their defaults, formula cells, and the outputs of
//! interest. Models are serialized as JSON:
//!
//! ```json
//! {
//!   "name": "crude_yield",
//!   "literals": { "api_gravity": 32.5, "sulfur": 1.8, "sweet": true },
//!   "formulas": [
//!     { "name": "heavy", "function": "LT", "operands": ["api_gravity", 22.3] },
//!     { "name": "grade", "function": "IF", "operands": ["heavy", 1, 2] }
//!   ],
//!   "outputs": ["grade"]
//! }
//! ```
//!
//! A string operand is a cell reference; numbers and booleans are embedded
//! literals; `{"error": "#N/A", "message": "..."}` is an error literal.

use crate::context::CalculationContext;
use crudegraph_core::{CellName, Error, Operand, Result, Value};
use crudegraph_formula::FunctionRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A formula cell registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaDefinition {
    pub name: CellName,
    pub function: String,
    #[serde(default)]
    pub operands: Vec<Operand>,
}

/// Serializable description of a calculation model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub literals: BTreeMap<CellName, Value>,
    #[serde(default)]
    pub formulas: Vec<FormulaDefinition>,
    #[serde(default)]
    pub outputs: Vec<CellName>,
}

impl ModelDefinition {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model name
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a literal cell
    pub fn literal<N: Into<CellName>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.literals.insert(name.into(), value.into());
        self
    }

    /// Add a formula cell
    pub fn formula<N: Into<CellName>, S: Into<String>>(
        mut self,
        name: N,
        function: S,
        operands: Vec<Operand>,
    ) -> Self {
        self.formulas.push(FormulaDefinition {
            name: name.into(),
            function: function.into(),
            operands,
        });
        self
    }

    /// Add an output cell
    pub fn output<N: Into<CellName>>(mut self, name: N) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// Parse a model from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::model(e.to_string()))
    }

    /// Parse a model from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::model(e.to_string()))
    }

    /// Read a model from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::model(format!("{}: {}", path.display(), e)))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::other(e.to_string()))
    }

    /// Outputs to evaluate: the declared ones, or every formula cell
    pub fn outputs_or_formulas(&self) -> Vec<CellName> {
        if self.outputs.is_empty() {
            self.formulas.iter().map(|f| f.name.clone()).collect()
        } else {
            self.outputs.clone()
        }
    }

    /// Register every cell of the model in a fresh context
    pub fn build(&self) -> Result<CalculationContext> {
        self.build_with_registry(FunctionRegistry::builtin())
    }

    /// Register every cell of the model using a custom function registry
    pub fn build_with_registry(&self, registry: Arc<FunctionRegistry>) -> Result<CalculationContext> {
        let mut ctx = CalculationContext::with_registry(registry);

        for (name, value) in &self.literals {
            ctx.register_literal(name.clone(), value.clone())?;
        }
        for formula in &self.formulas {
            ctx.register_formula(
                formula.name.clone(),
                &formula.function,
                formula.operands.clone(),
            )?;
        }

        debug!(
            model = self.name.as_deref().unwrap_or("<unnamed>"),
            literals = self.literals.len(),
            formulas = self.formulas.len(),
            "Built calculation context"
        );
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudegraph_core::ErrorKind;
    use pretty_assertions::assert_eq;

    const MODEL: &str = r##"{
        "name": "blend",
        "literals": {
            "a": 2,
            "b": 0,
            "flag": true,
            "missing": { "error": "#N/A", "message": "no lab result" }
        },
        "formulas": [
            { "name": "ratio", "function": "div", "operands": ["a", "b"] },
            { "name": "pick", "function": "SELECT", "operands": ["flag", "a", 99] },
            { "name": "gap", "function": "ADD", "operands": ["missing", 1] }
        ],
        "outputs": ["ratio", "pick", "gap"]
    }"##;

    #[test]
    fn test_parse_model() {
        let model = ModelDefinition::from_json(MODEL).unwrap();
        assert_eq!(model.name.as_deref(), Some("blend"));
        assert_eq!(model.literals.len(), 4);
        assert_eq!(model.literals[&CellName::from("flag")], Value::Boolean(true));
        assert_eq!(
            model.formulas[1].operands,
            vec![Operand::cell("flag"), Operand::cell("a"), Operand::literal(99)]
        );
    }

    #[test]
    fn test_build_and_evaluate() {
        let model = ModelDefinition::from_json(MODEL).unwrap();
        let mut ctx = model.build().unwrap();

        let values = ctx.evaluate(model.outputs_or_formulas()).unwrap();
        assert_eq!(values["ratio"].error_kind(), Some(ErrorKind::DivideByZero));
        assert_eq!(values["pick"], Value::Number(2.0));
        assert_eq!(
            values["gap"],
            Value::error(ErrorKind::NotAvailable, "no lab result")
        );
    }

    #[test]
    fn test_builder_matches_json() {
        let built = ModelDefinition::new()
            .named("tiny")
            .literal("x", 1.5)
            .formula("y", "NEG", vec!["x".into()])
            .output("y");

        let parsed = ModelDefinition::from_json(&built.to_json().unwrap()).unwrap();
        assert_eq!(parsed, built);
    }

    #[test]
    fn test_outputs_default_to_formulas() {
        let model = ModelDefinition::new()
            .literal("x", 1.0)
            .formula("y", "NEG", vec!["x".into()])
            .formula("z", "ABS", vec!["y".into()]);
        assert_eq!(
            model.outputs_or_formulas(),
            vec![CellName::from("y"), CellName::from("z")]
        );
    }

    #[test]
    fn test_invalid_model() {
        let err = ModelDefinition::from_json("{\"formulas\": 3}").unwrap_err();
        assert!(matches!(err, Error::Model(_)));

        let model = ModelDefinition::new().formula("y", "NOPE", vec![]);
        assert!(matches!(
            model.build().unwrap_err(),
            Error::UnknownFunction { .. }
        ));
    }
}
