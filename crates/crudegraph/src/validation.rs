//! Validation against reference values
//!
//! Compares evaluated cells with values from a trusted source (typically the
//! spreadsheet the model was ported from). The reference is a JSON object
//! mapping cell names to numbers:
//!
//! ```json
//! { "naphtha": 24.7, "residue": 31.05 }
//! ```

use crate::batch::{csv_error, save_by_extension};
use crate::context::CalculationContext;
use crudegraph_core::{CellName, Error, Result, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Comparison tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub value: f64,
    /// Compare relative error when the reference is nonzero
    pub relative: bool,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            value: 1e-6,
            relative: true,
        }
    }
}

/// Outcome of comparing one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub name: CellName,
    pub passed: bool,
    pub actual: Option<Value>,
    pub expected: f64,
    pub difference: Option<f64>,
    pub relative_error: Option<f64>,
    pub message: String,
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{}] {}: {}", status, self.name, self.message)
    }
}

/// Results of validating a set of cells
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// Results that passed
    pub fn passed(&self) -> impl Iterator<Item = &ValidationResult> + '_ {
        self.results.iter().filter(|r| r.passed)
    }

    /// Results that failed
    pub fn failed(&self) -> impl Iterator<Item = &ValidationResult> + '_ {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Check if every comparison passed
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Fraction of passed comparisons (0.0 when empty)
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.passed().count() as f64 / self.results.len() as f64
        }
    }

    /// Mean relative error over passed comparisons that have one
    pub fn mean_relative_error(&self) -> Option<f64> {
        let errors: Vec<f64> = self.passed().filter_map(|r| r.relative_error).collect();
        if errors.is_empty() {
            None
        } else {
            Some(errors.iter().sum::<f64>() / errors.len() as f64)
        }
    }

    /// One-line summary: counts, pass rate and mean relative error
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} checks, {} passed, {} failed ({:.1}% pass rate)",
            self.results.len(),
            self.passed().count(),
            self.failed().count(),
            self.pass_rate() * 100.0
        );
        if let Some(mean) = self.mean_relative_error() {
            summary.push_str(&format!(", mean relative error {mean:.2e}"));
        }
        summary
    }

    /// Write one CSV row per comparison
    ///
    /// Columns: `name,passed,actual,expected,difference,relative_error,message`.
    /// Missing values are left empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
        csv_writer
            .write_record([
                "name",
                "passed",
                "actual",
                "expected",
                "difference",
                "relative_error",
                "message",
            ])
            .map_err(csv_error)?;

        let optional = |n: Option<f64>| n.map(|n| n.to_string()).unwrap_or_default();
        for result in &self.results {
            csv_writer
                .write_record([
                    result.name.to_string(),
                    result.passed.to_string(),
                    result.actual.as_ref().map(Value::to_string).unwrap_or_default(),
                    result.expected.to_string(),
                    optional(result.difference),
                    optional(result.relative_error),
                    result.message.clone(),
                ])
                .map_err(csv_error)?;
        }

        csv_writer
            .flush()
            .map_err(|e| Error::other(format!("CSV write failed: {e}")))
    }

    /// Write the comparisons as a JSON array
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.results)
            .map_err(|e| Error::other(e.to_string()))
    }

    /// Write the comparisons to a file, choosing the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_by_extension(
            path.as_ref(),
            |file| self.write_csv(file),
            |file| self.write_json(file),
        )
    }
}

/// Compares evaluated values with reference numbers
#[derive(Debug, Clone, Default)]
pub struct Validator {
    tolerance: Tolerance,
}

impl Validator {
    /// Create a validator with the given tolerance
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Compare one value against its reference
    pub fn compare(&self, name: CellName, actual: Option<&Value>, expected: f64) -> ValidationResult {
        let mut result = ValidationResult {
            name,
            passed: false,
            actual: actual.cloned(),
            expected,
            difference: None,
            relative_error: None,
            message: String::new(),
        };

        let actual = match actual {
            Some(Value::Number(n)) => *n,
            Some(other @ Value::Error(_)) => {
                result.message = format!("evaluated to {other}");
                return result;
            }
            Some(other) => {
                result.message = format!("expected a number, got {} {other}", other.type_name());
                return result;
            }
            None => {
                result.message = "no value".to_string();
                return result;
            }
        };

        let diff = (actual - expected).abs();
        result.difference = Some(diff);

        if self.tolerance.relative && expected != 0.0 {
            let rel_error = diff / expected.abs();
            result.passed = rel_error <= self.tolerance.value;
            result.relative_error = Some(rel_error);
            result.message = format!("rel error {rel_error:.2e}");
        } else {
            result.passed = diff <= self.tolerance.value;
            result.message = format!("abs diff {diff:.2e}");
        }

        result
    }

    /// Evaluate the referenced cells and compare each one
    ///
    /// Names missing from the context fail individually; a structural
    /// failure of the evaluation itself is returned as `Err`.
    pub fn validate(
        &self,
        ctx: &mut CalculationContext,
        reference: &BTreeMap<CellName, f64>,
    ) -> Result<ValidationReport> {
        let known: Vec<CellName> = reference
            .keys()
            .filter(|name| ctx.contains(name.as_str()))
            .cloned()
            .collect();
        let values = ctx.evaluate(known)?;

        let results = reference
            .iter()
            .map(|(name, expected)| self.compare(name.clone(), values.get(name), *expected))
            .collect();

        Ok(ValidationReport { results })
    }
}

/// Parse a reference JSON object of cell names to numbers
pub fn reference_from_json(json: &str) -> Result<BTreeMap<CellName, f64>> {
    serde_json::from_str(json).map_err(|e| Error::model(e.to_string()))
}

/// Read a reference JSON file
pub fn reference_from_path<P: AsRef<Path>>(path: P) -> Result<BTreeMap<CellName, f64>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::model(format!("{}: {}", path.display(), e)))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::model(e.to_string()))
}
