//! Cell names

use std::borrow::Borrow;
use std::fmt;

/// The unique, context-scoped name of a cell (e.g. `"cdu.naphtha_yield"`)
///
/// Names are opaque keys: no sheet or row/column structure is implied.
/// Ordering is plain lexicographic byte order, which is what the scheduler
/// uses to break ties between independent cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CellName(String);

impl CellName {
    /// Create a new cell name
    pub fn new<S: Into<String>>(name: S) -> Self {
        CellName(name.into())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CellName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CellName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellName {
    fn from(s: &str) -> Self {
        CellName::new(s)
    }
}

impl From<String> for CellName {
    fn from(s: String) -> Self {
        CellName(s)
    }
}

impl From<&CellName> for CellName {
    fn from(name: &CellName) -> Self {
        name.clone()
    }
}

impl PartialEq<str> for CellName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CellName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_lexicographic_order() {
        let names: BTreeSet<CellName> = ["fcc.coke", "cdu.naphtha", "cdu.kero"]
            .into_iter()
            .map(CellName::from)
            .collect();
        let ordered: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(ordered, vec!["cdu.kero", "cdu.naphtha", "fcc.coke"]);
    }

    #[test]
    fn test_borrow_lookup() {
        let mut set = BTreeSet::new();
        set.insert(CellName::from("api_gravity"));
        assert!(set.contains("api_gravity"));
        assert_eq!(CellName::from("x"), "x");
    }
}
