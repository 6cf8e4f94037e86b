//! Dependency tracking for formula calculation

use ahash::AHashMap;
use crudegraph_core::{Cell, CellName};
use std::collections::BTreeSet;

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells, enabling incremental
/// recalculation. Edges come from formula operand references only; embedded
/// literals never create edges. A referenced name need not be registered:
/// forward and dangling references are both recorded, and it is up to the
/// scheduler to reject the dangling ones at evaluation time.
///
/// Adjacency sets are ordered so that every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: AHashMap<CellName, BTreeSet<CellName>>,
    /// Cell → Cells it depends on (precedents)
    precedents: AHashMap<CellName, BTreeSet<CellName>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph by scanning every formula's operand list
    pub fn from_cells<'a, I>(cells: I) -> Self
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let mut graph = Self::new();
        for cell in cells {
            graph.set_precedents(cell.name(), cell.references());
        }
        graph
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: &CellName, dependent: &CellName) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
        self.precedents
            .entry(dependent.clone())
            .or_default()
            .insert(precedent.clone());
    }

    /// Remove the edges from a cell to everything it depends on
    ///
    /// Edges from other cells to this one are kept: they belong to the
    /// other cells' formulas.
    pub fn clear_precedents(&mut self, cell: &CellName) {
        if let Some(precedents) = self.precedents.remove(cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(cell);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
    }

    /// Replace a cell's outgoing edges
    pub fn set_precedents<'a, I>(&mut self, cell: &CellName, references: I)
    where
        I: IntoIterator<Item = &'a CellName>,
    {
        self.clear_precedents(cell);
        for precedent in references {
            self.add_dependency(precedent, cell);
        }
    }

    /// Get cells that directly depend on the given cell, in name order
    pub fn dependents(&self, cell: &str) -> impl Iterator<Item = &CellName> + '_ {
        self.dependents.get(cell).into_iter().flat_map(|set| set.iter())
    }

    /// Get cells the given cell directly depends on, in name order
    pub fn precedents(&self, cell: &str) -> impl Iterator<Item = &CellName> + '_ {
        self.precedents.get(cell).into_iter().flat_map(|set| set.iter())
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.precedents.values().map(BTreeSet::len).sum()
    }

    /// All cells that transitively depend on the given cell
    ///
    /// The cell itself is included only if it sits on a cycle.
    pub fn transitive_dependents(&self, cell: &str) -> BTreeSet<CellName> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<&CellName> = self.dependents(cell).collect();

        while let Some(current) = stack.pop() {
            if result.insert(current.clone()) {
                stack.extend(self.dependents(current.as_str()));
            }
        }

        result
    }

    /// The requested cells plus everything they transitively depend on
    pub fn reachable<'a, I>(&self, roots: I) -> BTreeSet<CellName>
    where
        I: IntoIterator<Item = &'a CellName>,
    {
        let mut result = BTreeSet::new();
        let mut stack: Vec<&CellName> = roots.into_iter().collect();

        while let Some(current) = stack.pop() {
            if result.insert(current.clone()) {
                stack.extend(self.precedents(current.as_str()));
            }
        }

        result
    }

    /// Find a dependency cycle reachable from the given roots
    ///
    /// Depth-first traversal along precedent edges with three-color marking
    /// (unvisited / in progress / done). A back-edge to an in-progress cell
    /// closes a cycle; the members are returned in path order starting at
    /// the cell the back-edge points to. Roots and precedents are visited in
    /// name order, so the reported cycle is deterministic.
    pub fn find_cycle<'a, I>(&self, roots: I) -> Option<Vec<CellName>>
    where
        I: IntoIterator<Item = &'a CellName>,
    {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            InProgress,
            Done,
        }

        let mut marks: AHashMap<&CellName, Mark> = AHashMap::new();

        for root in roots {
            if marks.contains_key(root) {
                continue;
            }

            // Explicit stack of (cell, next precedent index); the stack is
            // also the current DFS path.
            let mut stack: Vec<(&CellName, Vec<&CellName>, usize)> = Vec::new();
            marks.insert(root, Mark::InProgress);
            stack.push((root, self.precedents(root.as_str()).collect(), 0));

            while let Some((_, precedents, next)) = stack.last_mut() {
                if let Some(&child) = precedents.get(*next) {
                    *next += 1;
                    match marks.get(child) {
                        None => {
                            marks.insert(child, Mark::InProgress);
                            stack.push((child, self.precedents(child.as_str()).collect(), 0));
                        }
                        Some(Mark::InProgress) => {
                            let start = stack
                                .iter()
                                .position(|(cell, _, _)| *cell == child)
                                .unwrap_or(0);
                            return Some(
                                stack[start..]
                                    .iter()
                                    .map(|(cell, _, _)| (*cell).clone())
                                    .collect(),
                            );
                        }
                        Some(Mark::Done) => {}
                    }
                } else if let Some((cell, _, _)) = stack.pop() {
                    marks.insert(cell, Mark::Done);
                }
            }
        }

        None
    }

    /// Topological order (dependencies first) of a set of cells
    ///
    /// Kahn's algorithm restricted to edges inside `cells`. Among cells whose
    /// dependencies are all resolved, the lexicographically smallest name is
    /// taken next, so the order is reproducible across runs and independent
    /// of registration order.
    ///
    /// Returns the unordered remainder if `cells` contains a cycle.
    pub fn topological_order(
        &self,
        cells: &BTreeSet<CellName>,
    ) -> Result<Vec<CellName>, Vec<CellName>> {
        let mut in_degree: AHashMap<&CellName, usize> = AHashMap::with_capacity(cells.len());
        let mut ready: BTreeSet<&CellName> = BTreeSet::new();

        for cell in cells {
            let degree = self
                .precedents(cell.as_str())
                .filter(|p| cells.contains(*p))
                .count();
            if degree == 0 {
                ready.insert(cell);
            }
            in_degree.insert(cell, degree);
        }

        let mut order = Vec::with_capacity(cells.len());

        while let Some(cell) = ready.pop_first() {
            order.push(cell.clone());

            for dependent in self.dependents(cell.as_str()) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() < cells.len() {
            let remaining = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(cell, _)| cell.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            return Err(remaining);
        }

        Ok(order)
    }
}
