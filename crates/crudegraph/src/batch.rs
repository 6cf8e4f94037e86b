//! Batch processing
//!
//! Runs one model against many input sets (assays, scenarios, ...). Every
//! item gets its own [`CalculationContext`], cloned from a template that
//! holds the model's registrations, so items never share mutable state and
//! one item's failure never affects another. With the `parallel` feature,
//! items are spread over the rayon thread pool.
//!
//! # Example
//!
//! ```rust
//! use crudegraph::prelude::*;
//!
//! let model = ModelDefinition::new()
//!     .literal("feed", 100.0)
//!     .literal("yield_pct", 0.25)
//!     .formula("naphtha", "MUL", vec!["feed".into(), "yield_pct".into()])
//!     .output("naphtha");
//!
//! let items = vec![
//!     BatchItem::new("light").with_input("yield_pct", 0.31),
//!     BatchItem::new("heavy").with_input("yield_pct", 0.5),
//! ];
//!
//! let report = BatchProcessor::from_model(&model).unwrap().run(items);
//! assert_eq!(report.successful().count(), 2);
//! assert_eq!(report.results[1].value("naphtha"), Some(&Value::Number(50.0)));
//! ```

use crate::calculation::CalculationOptions;
use crate::context::CalculationContext;
use crate::model::ModelDefinition;
use crudegraph_core::{CellName, Error, ErrorKind, Result, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One set of inputs to run through the model
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchItem {
    /// Identifier carried through to the result (assay name, scenario id)
    pub id: String,
    /// Literal overrides; names unknown to the model are registered as new
    /// literal cells
    pub inputs: BTreeMap<CellName, Value>,
}

impl BatchItem {
    /// Create an item with no input overrides
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            inputs: BTreeMap::new(),
        }
    }

    /// Add an input override
    pub fn with_input<N: Into<CellName>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }
}

/// Options for batch processing
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Process items on the rayon thread pool
    pub parallel: bool,
    /// Only process the first N items
    pub max_items: Option<usize>,
    /// Options for each item's context (timeout, cancellation, ...)
    pub calculation: CalculationOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "parallel"),
            max_items: None,
            calculation: CalculationOptions::default(),
        }
    }
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Output values by name; may contain error values
    Completed(BTreeMap<CellName, Value>),
    /// Structural failure of this item's evaluation
    Failed(Error),
}

/// Result of one batch item
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub id: String,
    pub outcome: BatchOutcome,
    pub duration: Duration,
}

impl BatchResult {
    /// Check if the item evaluated without structural failure
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Completed(_))
    }

    /// Output values, if completed
    pub fn values(&self) -> Option<&BTreeMap<CellName, Value>> {
        match &self.outcome {
            BatchOutcome::Completed(values) => Some(values),
            BatchOutcome::Failed(_) => None,
        }
    }

    /// A single output value, if completed
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values().and_then(|values| values.get(name))
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            BatchOutcome::Completed(_) => None,
            BatchOutcome::Failed(e) => Some(e),
        }
    }
}

/// Results of a batch run, in input order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outputs: Vec<CellName>,
    pub results: Vec<BatchResult>,
    pub duration: Duration,
}

impl BatchReport {
    /// Number of processed items
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if no items were processed
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Items that completed
    pub fn successful(&self) -> impl Iterator<Item = &BatchResult> + '_ {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Items that failed
    pub fn failed(&self) -> impl Iterator<Item = &BatchResult> + '_ {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Fraction of completed items (0.0 for an empty batch)
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            0.0
        } else {
            self.successful().count() as f64 / self.results.len() as f64
        }
    }

    /// Find a result by item id
    pub fn get(&self, id: &str) -> Option<&BatchResult> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Write one row per item: `id,status,error,<outputs...>`
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);

        let mut header = vec!["id", "status", "error"];
        header.extend(self.outputs.iter().map(CellName::as_str));
        csv_writer.write_record(&header).map_err(csv_error)?;

        for result in &self.results {
            let mut row = vec![result.id.clone()];
            match &result.outcome {
                BatchOutcome::Completed(values) => {
                    row.push("ok".to_string());
                    row.push(String::new());
                    row.extend(self.outputs.iter().map(|name| {
                        values.get(name).map(Value::to_string).unwrap_or_default()
                    }));
                }
                BatchOutcome::Failed(e) => {
                    row.push("failed".to_string());
                    row.push(e.to_string());
                    row.extend(self.outputs.iter().map(|_| String::new()));
                }
            }
            csv_writer.write_record(&row).map_err(csv_error)?;
        }

        csv_writer
            .flush()
            .map_err(|e| Error::other(format!("CSV write failed: {e}")))
    }

    /// Write the results as a JSON array
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let rows: Vec<ExportRow<'_>> = self.results.iter().map(ExportRow::from).collect();
        serde_json::to_writer_pretty(writer, &rows).map_err(|e| Error::other(e.to_string()))
    }

    /// Write the results to a file, choosing the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_by_extension(
            path.as_ref(),
            |file| self.write_csv(file),
            |file| self.write_json(file),
        )
    }
}

/// Create `path` and hand it to the writer matching its extension
///
/// Unsupported extensions fail before the file is created.
pub(crate) fn save_by_extension<C, J>(path: &Path, csv: C, json: J) -> Result<()>
where
    C: FnOnce(File) -> Result<()>,
    J: FnOnce(File) -> Result<()>,
{
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let create =
        || File::create(path).map_err(|e| Error::other(format!("{}: {}", path.display(), e)));

    match extension.as_deref() {
        Some("csv") => csv(create()?),
        Some("json") => json(create()?),
        _ => Err(Error::other(format!(
            "Unsupported export format: {}",
            path.display()
        ))),
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<&'a BTreeMap<CellName, Value>>,
}

impl<'a> From<&'a BatchResult> for ExportRow<'a> {
    fn from(result: &'a BatchResult) -> Self {
        Self {
            id: &result.id,
            success: result.is_success(),
            error: result.error().map(ToString::to_string),
            values: result.values(),
        }
    }
}

pub(crate) fn csv_error(e: csv::Error) -> Error {
    Error::other(format!("CSV error: {e}"))
}

type ProgressFn = dyn Fn(usize, usize, &str) + Send + Sync;

/// Runs a model over many input sets
pub struct BatchProcessor {
    template: CalculationContext,
    outputs: Vec<CellName>,
    options: BatchOptions,
    progress: Option<Box<ProgressFn>>,
}

impl fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("cells", &self.template.len())
            .field("outputs", &self.outputs)
            .field("options", &self.options)
            .finish()
    }
}

impl BatchProcessor {
    /// Create a processor from a context holding the model's registrations
    pub fn new(template: CalculationContext, outputs: Vec<CellName>) -> Self {
        Self {
            template,
            outputs,
            options: BatchOptions::default(),
            progress: None,
        }
    }

    /// Create a processor for a model definition
    pub fn from_model(model: &ModelDefinition) -> Result<Self> {
        Ok(Self::new(model.build()?, model.outputs_or_formulas()))
    }

    /// Set batch options
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a progress callback, called as `(completed, total, item_id)`
    /// after each item finishes
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Outputs evaluated for each item
    pub fn outputs(&self) -> &[CellName] {
        &self.outputs
    }

    /// Process every item
    pub fn run(&self, items: Vec<BatchItem>) -> BatchReport {
        self.run_filtered(items, |_| true)
    }

    /// Process the items accepted by `filter`
    pub fn run_filtered<F>(&self, items: Vec<BatchItem>, filter: F) -> BatchReport
    where
        F: Fn(&BatchItem) -> bool,
    {
        let start = Instant::now();
        let limit = self.options.max_items.unwrap_or(usize::MAX);
        let items: Vec<BatchItem> = items.into_iter().filter(|i| filter(i)).take(limit).collect();

        let total = items.len();
        let completed = AtomicUsize::new(0);
        let process = |item: &BatchItem| {
            let result = self.process_item(item);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = &self.progress {
                progress(done, total, &item.id);
            }
            result
        };

        #[cfg(feature = "parallel")]
        let results: Vec<BatchResult> = if self.options.parallel {
            items.par_iter().map(process).collect()
        } else {
            items.iter().map(process).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<BatchResult> = items.iter().map(process).collect();

        let report = BatchReport {
            outputs: self.outputs.clone(),
            results,
            duration: start.elapsed(),
        };

        info!(
            total = report.len(),
            failed = report.failed().count(),
            "Batch complete: {:.1}% success in {:?}",
            report.success_rate() * 100.0,
            report.duration
        );
        report
    }

    /// Evaluate a single item in its own context
    pub fn process_item(&self, item: &BatchItem) -> BatchResult {
        let span = info_span!("batch_item", id = %item.id);
        let _guard = span.enter();

        let start = Instant::now();
        let outcome = match self.evaluate_item(item) {
            Ok(values) => BatchOutcome::Completed(values),
            Err(e) => {
                warn!(error = %e, "Batch item failed");
                BatchOutcome::Failed(e)
            }
        };

        BatchResult {
            id: item.id.clone(),
            outcome,
            duration: start.elapsed(),
        }
    }

    fn evaluate_item(&self, item: &BatchItem) -> Result<BTreeMap<CellName, Value>> {
        if let Some(cancel) = &self.options.calculation.cancel {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
        }

        let mut ctx = self.template.clone();
        ctx.set_options(self.options.calculation.clone());

        for (name, value) in &item.inputs {
            if ctx.contains(name.as_str()) {
                ctx.set_literal(name.clone(), value.clone())?;
            } else {
                ctx.register_literal(name.clone(), value.clone())?;
            }
        }

        ctx.evaluate(self.outputs.iter().cloned())
    }
}

/// Read batch items from CSV
///
/// The first column holds the item id; every other column header names an
/// input cell. Fields are parsed as numbers, `true`/`false`, or error codes
/// such as `#N/A`. Empty fields keep the model's default.
pub fn read_items_csv<R: Read>(reader: R) -> Result<Vec<BatchItem>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(csv_error)?.clone();
    if headers.is_empty() {
        return Err(Error::model("batch input has no header row"));
    }
    let columns: Vec<CellName> = headers.iter().skip(1).map(CellName::from).collect();

    let mut items = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let mut item = BatchItem::new(record.get(0).unwrap_or_default());

        for (name, field) in columns.iter().zip(record.iter().skip(1)) {
            if field.is_empty() {
                continue;
            }
            let value = parse_value(field).ok_or_else(|| {
                Error::model(format!(
                    "row {}: cannot parse {:?} for input {}",
                    row + 1,
                    field,
                    name
                ))
            })?;
            item.inputs.insert(name.clone(), value);
        }

        items.push(item);
    }

    Ok(items)
}

/// Read batch items from a CSV file
pub fn read_items_csv_file<P: AsRef<Path>>(path: P) -> Result<Vec<BatchItem>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::model(format!("{}: {}", path.display(), e)))?;
    read_items_csv(file)
}

/// Parse an input field: a finite number, `true`/`false`, or an error code
pub fn parse_value(field: &str) -> Option<Value> {
    match field.to_lowercase().as_str() {
        "true" => return Some(Value::Boolean(true)),
        "false" => return Some(Value::Boolean(false)),
        _ => {}
    }

    // `nan` and `inf` parse as f64 but are not valid cell values
    if let Ok(n) = field.parse::<f64>() {
        return n.is_finite().then_some(Value::Number(n));
    }

    ErrorKind::from_str(field).map(Value::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::CancelToken;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    fn model() -> ModelDefinition {
        ModelDefinition::new()
            .literal("a", 10.0)
            .literal("b", 2.0)
            .formula("ratio", "DIV", vec!["a".into(), "b".into()])
            .output("ratio")
    }

    #[test]
    fn test_items_are_isolated() {
        let processor = BatchProcessor::from_model(&model()).unwrap();
        let report = processor.run(vec![
            BatchItem::new("one").with_input("b", 5.0),
            BatchItem::new("zero").with_input("b", 0.0),
            BatchItem::new("default"),
        ]);

        assert_eq!(report.len(), 3);
        assert_eq!(report.results[0].value("ratio"), Some(&Value::Number(2.0)));
        assert_eq!(
            report.results[1].value("ratio").and_then(Value::error_kind),
            Some(ErrorKind::DivideByZero)
        );
        assert_eq!(report.results[2].value("ratio"), Some(&Value::Number(5.0)));
        assert_eq!(report.success_rate(), 1.0);
        assert_eq!(processor.outputs(), &[CellName::from("ratio")]);
    }

    #[test]
    fn test_failed_item_does_not_affect_siblings() {
        let processor = BatchProcessor::from_model(&model()).unwrap();
        let report = processor.run(vec![
            BatchItem::new("bad").with_input("ratio", 1.0),
            BatchItem::new("good"),
        ]);

        assert!(matches!(
            report.get("bad").and_then(BatchResult::error),
            Some(Error::WrongCellKind { .. })
        ));
        assert!(report.get("good").unwrap().is_success());
        assert_eq!(report.success_rate(), 0.5);
        assert_eq!(report.failed().count(), 1);
    }

    #[test]
    fn test_unknown_inputs_are_registered() {
        let model = ModelDefinition::new()
            .literal("a", 1.0)
            .formula("x", "SUM", vec!["a".into(), "extra".into()])
            .output("x");
        let processor = BatchProcessor::from_model(&model).unwrap();

        let report = processor.run(vec![
            BatchItem::new("with").with_input("extra", 4.0),
            BatchItem::new("without"),
        ]);

        assert_eq!(report.results[0].value("x"), Some(&Value::Number(5.0)));
        assert_eq!(
            report.results[1].error(),
            Some(&Error::UnknownCellReference {
                name: "extra".into(),
                referenced_by: Some("x".into()),
            })
        );
    }

    #[test]
    fn test_max_items_filter_and_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let processor = BatchProcessor::from_model(&model())
            .unwrap()
            .with_options(BatchOptions {
                parallel: false,
                max_items: Some(2),
                ..Default::default()
            })
            .on_progress(move |done, total, id| {
                sink.lock().unwrap().push((done, total, id.to_string()));
            });

        let items = (0..5).map(|i| BatchItem::new(format!("item{i}"))).collect();
        let report = processor.run_filtered(items, |item| item.id != "item0");

        let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["item1", "item2"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, 2, "item1".to_string()), (2, 2, "item2".to_string())]
        );
    }

    #[test]
    fn test_cancelled_batch() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let processor = BatchProcessor::from_model(&model())
            .unwrap()
            .with_options(BatchOptions {
                calculation: CalculationOptions {
                    cancel: Some(cancel),
                    ..Default::default()
                },
                ..Default::default()
            });

        let report = processor.run(vec![BatchItem::new("a"), BatchItem::new("b")]);
        assert!(report
            .results
            .iter()
            .all(|r| r.error() == Some(&Error::Cancelled)));
    }

    #[test]
    fn test_read_items_csv() {
        let data = "id,a,b,flag\nx1, 1.5 ,,true\nx2,3,#N/A,FALSE\n";
        let items = read_items_csv(data.as_bytes()).unwrap();

        assert_eq!(
            items,
            vec![
                BatchItem::new("x1")
                    .with_input("a", 1.5)
                    .with_input("flag", true),
                BatchItem::new("x2")
                    .with_input("a", 3.0)
                    .with_input("b", ErrorKind::NotAvailable)
                    .with_input("flag", false),
            ]
        );
    }

    #[test]
    fn test_read_items_csv_rejects_garbage() {
        let err = read_items_csv("id,a\nx1,lots\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Model(msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("2.5"), Some(Value::Number(2.5)));
        assert_eq!(parse_value("-1e3"), Some(Value::Number(-1000.0)));
        assert_eq!(parse_value("True"), Some(Value::Boolean(true)));
        assert_eq!(parse_value("#DIV/0!"), Some(Value::from(ErrorKind::DivideByZero)));

        for field in ["nan", "NaN", "inf", "-inf", "infinity", "1e999"] {
            assert_eq!(parse_value(field), None, "{field}");
        }
        assert!(read_items_csv("id,a\nx1,nan\n".as_bytes()).is_err());
    }

    #[test]
    fn test_write_csv() {
        let processor = BatchProcessor::from_model(&model()).unwrap();
        let report = processor.run(vec![
            BatchItem::new("ok").with_input("b", 4.0),
            BatchItem::new("zero").with_input("b", 0.0),
            BatchItem::new("bad").with_input("ratio", 1.0),
        ]);

        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "id,status,error,ratio");
        assert_eq!(lines[1], "ok,ok,,2.5");
        assert_eq!(lines[2], "zero,ok,,#DIV/0!");
        assert!(lines[3].starts_with("bad,failed,"));
    }

    #[test]
    fn test_write_json() {
        let processor = BatchProcessor::from_model(&model()).unwrap();
        let report = processor.run(vec![BatchItem::new("ok")]);

        let mut out = Vec::new();
        report.write_json(&mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(json[0]["id"], "ok");
        assert_eq!(json[0]["success"], true);
        assert_eq!(json[0]["values"]["ratio"], 5.0);
    }
}
