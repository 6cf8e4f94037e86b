//! Evaluation planning and execution
//!
//! Evaluation runs in two phases:
//! 1. **Plan**: collect the requested cells and everything they transitively
//!    depend on, reject unknown references and cycles, and order the
//!    subgraph (dependencies first, ties broken by name).
//! 2. **Execute**: walk the plan once, recomputing dirty cells from the
//!    cached values of their precedents and reusing clean ones.
//!
//! Planning never touches cell state, so a structural failure leaves the
//! context exactly as it was.

use crate::calculation::{CalculationOptions, CalculationStats};
use ahash::AHashMap;
use crudegraph_core::{Cell, CellContent, CellName, Error, Operand, Result, Value};
use crudegraph_formula::{DependencyGraph, FunctionRegistry};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, trace};

/// Cell table keyed by name
pub(crate) type CellMap = AHashMap<CellName, Cell>;

/// Ordered evaluation plan for a set of requested cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPlan {
    requested: Vec<CellName>,
    order: Vec<CellName>,
}

impl EvaluationPlan {
    /// The requested cells, sorted and deduplicated
    pub fn requested(&self) -> &[CellName] {
        &self.requested
    }

    /// Cells in evaluation order, dependencies first
    pub fn order(&self) -> &[CellName] {
        &self.order
    }

    /// Number of cells in the plan
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the plan is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check if a cell takes part in the plan
    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }
}

/// Plans and runs evaluation passes over a cell table
pub struct Scheduler<'a> {
    graph: &'a DependencyGraph,
    registry: &'a FunctionRegistry,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler over a dependency graph and function registry
    pub fn new(graph: &'a DependencyGraph, registry: &'a FunctionRegistry) -> Self {
        Self { graph, registry }
    }

    /// Build the evaluation plan for the requested cells
    pub fn plan(&self, cells: &CellMap, requested: &[CellName]) -> Result<EvaluationPlan> {
        let requested: Vec<CellName> = requested
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if let Some(missing) = requested.iter().find(|name| !cells.contains_key(*name)) {
            return Err(Error::unknown(missing.clone()));
        }

        let reachable = self.graph.reachable(&requested);

        // Dangling references, reported against the first referring cell
        // inside the subgraph
        if let Some(missing) = reachable.iter().find(|name| !cells.contains_key(*name)) {
            let referenced_by = self
                .graph
                .dependents(missing.as_str())
                .find(|dependent| reachable.contains(*dependent))
                .cloned();
            return Err(Error::UnknownCellReference {
                name: missing.clone(),
                referenced_by,
            });
        }

        if let Some(cycle) = self.graph.find_cycle(&requested) {
            return Err(Error::CyclicDependency(cycle));
        }

        let order = self
            .graph
            .topological_order(&reachable)
            .map_err(Error::CyclicDependency)?;

        debug!(
            requested = requested.len(),
            planned = order.len(),
            "Built evaluation plan"
        );

        Ok(EvaluationPlan { requested, order })
    }

    /// Run a plan, recomputing dirty cells in order
    ///
    /// Cancellation and the timeout are checked before each cell. On an
    /// early exit the cells computed so far keep their fresh values and the
    /// rest stay dirty.
    pub fn execute(
        &self,
        cells: &mut CellMap,
        plan: &EvaluationPlan,
        options: &CalculationOptions,
    ) -> Result<CalculationStats> {
        let start = Instant::now();
        let mut stats = CalculationStats {
            cells_planned: plan.len(),
            ..Default::default()
        };

        if options.force_full_calculation {
            for name in plan.order() {
                if let Some(cell) = cells.get_mut(name) {
                    cell.mark_dirty();
                }
            }
        }

        for name in plan.order() {
            if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                debug!(cell = %name, "Evaluation cancelled");
                return Err(Error::Cancelled);
            }
            if let Some(limit) = options.timeout {
                let elapsed = start.elapsed();
                if elapsed >= limit {
                    debug!(cell = %name, ?elapsed, "Evaluation timed out");
                    return Err(Error::Timeout { elapsed });
                }
            }

            let cell = cells.get(name).ok_or_else(|| Error::unknown(name.clone()))?;
            if !cell.is_dirty() {
                stats.cells_reused += 1;
                continue;
            }

            let value = self.compute(cells, cell)?;
            trace!(cell = %name, value = %value, "Evaluated cell");

            if value.is_error() {
                stats.errors += 1;
            }
            if let Some(cell) = cells.get_mut(name) {
                cell.store(value);
            }
            stats.cells_evaluated += 1;
        }

        stats.duration = start.elapsed();
        debug!(
            evaluated = stats.cells_evaluated,
            reused = stats.cells_reused,
            errors = stats.errors,
            "Evaluation pass complete in {:?}",
            stats.duration
        );

        Ok(stats)
    }

    fn compute(&self, cells: &CellMap, cell: &Cell) -> Result<Value> {
        let formula = match cell.content() {
            CellContent::Literal(value) => return Ok(value.clone()),
            CellContent::Formula(formula) => formula,
        };

        let def = self
            .registry
            .get(formula.function())
            .ok_or_else(|| Error::UnknownFunction {
                cell: cell.name().clone(),
                function: formula.function().to_string(),
            })?;

        let args = formula
            .operands()
            .iter()
            .map(|operand| resolve(cells, cell.name(), operand))
            .collect::<Result<Vec<_>>>()?;

        Ok(def.call(&args))
    }
}

/// Operand value: embedded literal, or the fresh cached value of a precedent
fn resolve(cells: &CellMap, owner: &CellName, operand: &Operand) -> Result<Value> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Ref(name) => cells
            .get(name)
            .filter(|precedent| !precedent.is_dirty())
            .and_then(Cell::cached_value)
            .cloned()
            .ok_or_else(|| {
                Error::other(format!(
                    "Cell {name} was not evaluated before its dependent {owner}"
                ))
            }),
    }
}
