//! Cell storage: literal inputs, formulas and cached results

use super::name::CellName;
use super::value::Value;
use std::fmt;

/// One operand of a formula
///
/// Operands are an explicit list rather than parsed formula text: a
/// reference names another cell (and becomes a dependency edge), a literal
/// is embedded in the formula and never creates an edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Operand {
    /// Reference to another cell by name
    Ref(CellName),
    /// Embedded literal value
    Literal(Value),
}

impl Operand {
    /// Create a cell reference operand
    pub fn cell<N: Into<CellName>>(name: N) -> Self {
        Operand::Ref(name.into())
    }

    /// Create a literal operand
    pub fn literal<V: Into<Value>>(value: V) -> Self {
        Operand::Literal(value.into())
    }

    /// Get the referenced cell name, if this operand is a reference
    pub fn reference(&self) -> Option<&CellName> {
        match self {
            Operand::Ref(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Ref(CellName::from(name))
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Ref(CellName::from(name))
    }
}

impl From<CellName> for Operand {
    fn from(name: CellName) -> Self {
        Operand::Ref(name)
    }
}

impl From<&CellName> for Operand {
    fn from(name: &CellName) -> Self {
        Operand::Ref(name.clone())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Literal(value)
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Literal(Value::Number(n))
    }
}

impl From<i32> for Operand {
    fn from(n: i32) -> Self {
        Operand::Literal(Value::Number(n as f64))
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Literal(Value::Boolean(b))
    }
}

/// A registered function applied to an ordered operand list
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    /// Function id (uppercase)
    function: String,
    operands: Vec<Operand>,
}

impl Formula {
    /// Create a new formula; the function id is normalized to uppercase
    pub fn new<S: AsRef<str>>(function: S, operands: Vec<Operand>) -> Self {
        Self {
            function: function.as_ref().trim().to_uppercase(),
            operands,
        }
    }

    /// Function id
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Ordered operands
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Cell names referenced by this formula, in operand order
    ///
    /// A name referenced twice is yielded twice.
    pub fn references(&self) -> impl Iterator<Item = &CellName> + '_ {
        self.operands.iter().filter_map(Operand::reference)
    }
}

/// Whether a cell holds a literal or a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Literal,
    Formula,
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellKind::Literal => f.write_str("literal"),
            CellKind::Formula => f.write_str("formula"),
        }
    }
}

/// What a cell holds
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// Fixed input value
    Literal(Value),
    /// Derived value
    Formula(Formula),
}

/// A named slot in a calculation context
///
/// A freshly created cell is dirty. Only the scheduler clears the flag, by
/// storing a computed value; `cached_value` is meaningful only while the cell
/// is clean.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    name: CellName,
    content: CellContent,
    cached_value: Option<Value>,
    dirty: bool,
}

impl Cell {
    /// Create a literal cell
    pub fn literal<N: Into<CellName>>(name: N, value: Value) -> Self {
        Self {
            name: name.into(),
            content: CellContent::Literal(value),
            cached_value: None,
            dirty: true,
        }
    }

    /// Create a formula cell
    pub fn formula<N: Into<CellName>>(name: N, formula: Formula) -> Self {
        Self {
            name: name.into(),
            content: CellContent::Formula(formula),
            cached_value: None,
            dirty: true,
        }
    }

    pub fn name(&self) -> &CellName {
        &self.name
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn kind(&self) -> CellKind {
        match self.content {
            CellContent::Literal(_) => CellKind::Literal,
            CellContent::Formula(_) => CellKind::Formula,
        }
    }

    /// The formula, if this is a formula cell
    pub fn formula_def(&self) -> Option<&Formula> {
        match &self.content {
            CellContent::Formula(f) => Some(f),
            CellContent::Literal(_) => None,
        }
    }

    /// Cell names this cell depends on (empty for literals)
    pub fn references(&self) -> Vec<&CellName> {
        self.formula_def()
            .map(|f| f.references().collect())
            .unwrap_or_default()
    }

    /// Last computed value
    pub fn cached_value(&self) -> Option<&Value> {
        self.cached_value.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the cached value stale
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Store a computed value and clear the dirty flag
    pub fn store(&mut self, value: Value) {
        self.cached_value = Some(value);
        self.dirty = false;
    }

    /// Replace the content, leaving the cell dirty
    pub fn replace_content(&mut self, content: CellContent) {
        self.content = content;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_formula_references_skip_literals() {
        let formula = Formula::new(
            "sum",
            vec![Operand::cell("a"), Operand::literal(5.0), "b".into()],
        );
        assert_eq!(formula.function(), "SUM");
        let refs: Vec<&str> = formula.references().map(|n| n.as_str()).collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn test_cell_dirty_lifecycle() {
        let mut cell = Cell::literal("a", Value::Number(3.0));
        assert!(cell.is_dirty());
        assert_eq!(cell.cached_value(), None);

        cell.store(Value::Number(3.0));
        assert!(!cell.is_dirty());
        assert_eq!(cell.cached_value(), Some(&Value::Number(3.0)));

        cell.mark_dirty();
        assert!(cell.is_dirty());
    }

    #[test]
    fn test_cell_kind() {
        let literal = Cell::literal("e", Value::from(ErrorKind::DivideByZero));
        assert_eq!(literal.kind(), CellKind::Literal);
        assert!(literal.references().is_empty());

        let formula = Cell::formula("f", Formula::new("SUM", vec!["e".into(), 5.into()]));
        assert_eq!(formula.kind(), CellKind::Formula);
        assert_eq!(formula.references(), vec![&CellName::from("e")]);
    }
}
