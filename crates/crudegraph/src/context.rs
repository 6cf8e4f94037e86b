//! Calculation context
//!
//! A [`CalculationContext`] owns a table of named cells, the dependency graph
//! built from their formulas, and a shared function registry. Cells are
//! registered first, then requested outputs are evaluated; later literal
//! updates invalidate exactly the affected cells so that the next evaluation
//! recomputes only what changed.
//!
//! Contexts are independent of each other. Cloning one gives a new context
//! with the same cells and cached values, which is how batch processing
//! reuses one model for many inputs.

use crate::calculation::{CalculationOptions, CalculationStats};
use crate::scheduler::{CellMap, EvaluationPlan, Scheduler};
use crudegraph_core::{
    Cell, CellContent, CellKind, CellName, Error, Formula, Operand, Result, Value,
};
use crudegraph_formula::{DependencyGraph, FunctionRegistry};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Named cells plus the machinery to evaluate them
#[derive(Debug, Clone)]
pub struct CalculationContext {
    cells: CellMap,
    graph: DependencyGraph,
    registry: Arc<FunctionRegistry>,
    options: CalculationOptions,
    last_stats: Option<CalculationStats>,
}

impl CalculationContext {
    /// Create an empty context using the built-in functions
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::builtin())
    }

    /// Create an empty context using a custom function registry
    pub fn with_registry(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            cells: CellMap::default(),
            graph: DependencyGraph::new(),
            registry,
            options: CalculationOptions::default(),
            last_stats: None,
        }
    }

    /// Set the calculation options (builder style)
    pub fn with_options(mut self, options: CalculationOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the calculation options
    pub fn set_options(&mut self, options: CalculationOptions) {
        self.options = options;
    }

    /// Current calculation options
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// Function registry used by this context
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    // === Registration ===

    /// Register a literal cell
    pub fn register_literal<N, V>(&mut self, name: N, value: V) -> Result<()>
    where
        N: Into<CellName>,
        V: Into<Value>,
    {
        let name = name.into();
        self.ensure_new(&name)?;

        self.cells
            .insert(name.clone(), Cell::literal(name.clone(), value.into()));
        self.invalidate(&name);
        Ok(())
    }

    /// Register a formula cell
    ///
    /// The function must exist and accept the given number of operands.
    /// Referenced cells may be registered later; dangling references are
    /// reported when an evaluation needs them.
    pub fn register_formula<N, S>(&mut self, name: N, function: S, operands: Vec<Operand>) -> Result<()>
    where
        N: Into<CellName>,
        S: AsRef<str>,
    {
        let name = name.into();
        self.ensure_new(&name)?;

        let formula = Formula::new(function, operands);
        self.check_formula(&name, &formula)?;

        self.graph.set_precedents(&name, formula.references());
        self.cells
            .insert(name.clone(), Cell::formula(name.clone(), formula));
        self.invalidate(&name);
        Ok(())
    }

    /// Replace the value of a literal cell
    ///
    /// Marks the cell and everything that transitively depends on it dirty.
    pub fn set_literal<N, V>(&mut self, name: N, value: V) -> Result<()>
    where
        N: Into<CellName>,
        V: Into<Value>,
    {
        let name = name.into();
        let cell = self.cell_of_kind(&name, CellKind::Literal)?;
        cell.replace_content(CellContent::Literal(value.into()));
        self.invalidate(&name);
        Ok(())
    }

    /// Replace the formula of a formula cell
    pub fn set_formula<N, S>(&mut self, name: N, function: S, operands: Vec<Operand>) -> Result<()>
    where
        N: Into<CellName>,
        S: AsRef<str>,
    {
        let name = name.into();
        self.cell_of_kind(&name, CellKind::Formula)?;

        let formula = Formula::new(function, operands);
        self.check_formula(&name, &formula)?;

        self.graph.set_precedents(&name, formula.references());
        if let Some(cell) = self.cells.get_mut(&name) {
            cell.replace_content(CellContent::Formula(formula));
        }
        self.invalidate(&name);
        Ok(())
    }

    fn ensure_new(&self, name: &CellName) -> Result<()> {
        if self.cells.contains_key(name) {
            return Err(Error::DuplicateCellName(name.clone()));
        }
        Ok(())
    }

    fn check_formula(&self, name: &CellName, formula: &Formula) -> Result<()> {
        let def = self
            .registry
            .get(formula.function())
            .ok_or_else(|| Error::UnknownFunction {
                cell: name.clone(),
                function: formula.function().to_string(),
            })?;
        def.check_arity(formula.operands().len())
    }

    fn cell_of_kind(&mut self, name: &CellName, expected: CellKind) -> Result<&mut Cell> {
        let cell = self
            .cells
            .get_mut(name)
            .ok_or_else(|| Error::unknown(name.clone()))?;
        if cell.kind() != expected {
            return Err(Error::WrongCellKind {
                name: name.clone(),
                expected,
                actual: cell.kind(),
            });
        }
        Ok(cell)
    }

    /// Mark a cell and its transitive dependents dirty
    fn invalidate(&mut self, name: &CellName) {
        if let Some(cell) = self.cells.get_mut(name) {
            cell.mark_dirty();
        }
        for dependent in self.graph.transitive_dependents(name.as_str()) {
            if let Some(cell) = self.cells.get_mut(&dependent) {
                cell.mark_dirty();
            }
        }
    }

    // === Evaluation ===

    /// Build the evaluation plan for the given outputs without running it
    pub fn plan<I, N>(&self, outputs: I) -> Result<EvaluationPlan>
    where
        I: IntoIterator<Item = N>,
        N: Into<CellName>,
    {
        let requested: Vec<CellName> = outputs.into_iter().map(Into::into).collect();
        Scheduler::new(&self.graph, &self.registry).plan(&self.cells, &requested)
    }

    /// Evaluate the requested cells, returning their values by name
    ///
    /// Only the requested cells and their dependencies are considered.
    /// Clean cells are reused; dirty ones are recomputed in dependency order.
    /// Computational errors are ordinary values in the result; an `Err`
    /// means a structural failure (unknown reference, cycle, cancellation,
    /// timeout).
    pub fn evaluate<I, N>(&mut self, outputs: I) -> Result<BTreeMap<CellName, Value>>
    where
        I: IntoIterator<Item = N>,
        N: Into<CellName>,
    {
        let plan = self.plan(outputs)?;

        let scheduler = Scheduler::new(&self.graph, &self.registry);
        let stats = scheduler.execute(&mut self.cells, &plan, &self.options)?;
        debug!("Evaluated {} outputs: {}", plan.requested().len(), stats.summary());
        self.last_stats = Some(stats);

        plan.requested()
            .iter()
            .map(|name| {
                self.cached_value(name.as_str())
                    .cloned()
                    .map(|value| (name.clone(), value))
                    .ok_or_else(|| Error::other(format!("Cell {name} has no value after evaluation")))
            })
            .collect()
    }

    /// Evaluate every registered cell
    pub fn evaluate_all(&mut self) -> Result<BTreeMap<CellName, Value>> {
        let names: Vec<CellName> = self.cells.keys().cloned().collect();
        self.evaluate(names)
    }

    /// Evaluate a single cell
    pub fn value<N: Into<CellName>>(&mut self, name: N) -> Result<Value> {
        let name = name.into();
        let mut values = self.evaluate([name.clone()])?;
        values
            .remove(&name)
            .ok_or_else(|| Error::unknown(name))
    }

    /// Statistics from the last successful evaluation
    pub fn last_stats(&self) -> Option<&CalculationStats> {
        self.last_stats.as_ref()
    }

    // === Inspection ===

    /// Get a cell by name
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.get(name)
    }

    /// Check if a cell is registered
    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    /// Number of registered cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cells are registered
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Registered cell names, sorted
    pub fn names(&self) -> Vec<&CellName> {
        let mut names: Vec<&CellName> = self.cells.keys().collect();
        names.sort();
        names
    }

    /// Whether a cell needs recomputation (`None` if unknown)
    pub fn is_dirty(&self, name: &str) -> Option<bool> {
        self.cells.get(name).map(Cell::is_dirty)
    }

    /// Last computed value of a cell, without evaluating
    ///
    /// The value may be stale if the cell is dirty.
    pub fn cached_value(&self, name: &str) -> Option<&Value> {
        self.cells.get(name).and_then(Cell::cached_value)
    }

    /// Cells whose formulas reference the given cell
    pub fn dependents_of(&self, name: &str) -> BTreeSet<CellName> {
        self.graph.dependents(name).cloned().collect()
    }

    /// Cells referenced by the given cell's formula
    pub fn precedents_of(&self, name: &str) -> BTreeSet<CellName> {
        self.graph.precedents(name).cloned().collect()
    }
}

impl Default for CalculationContext {
    fn default() -> Self {
        Self::new()
    }
}
