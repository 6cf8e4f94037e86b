//! crudegraph CLI - evaluate, batch and validate calculation models

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crudegraph::prelude::*;
use crudegraph::{parse_value, read_items_csv_file, reference_from_path, CellName};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crudegraph")]
#[command(author, version, about = "Calculation graph tool for refinery models")]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a model and print its outputs
    Eval {
        /// Model definition (JSON)
        model: PathBuf,

        /// Output cell to evaluate (default: the model's outputs)
        #[arg(short, long = "output", value_name = "NAME")]
        outputs: Vec<String>,

        /// Override a literal, e.g. --set sulfur_wt=1.2
        #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        sets: Vec<(String, Value)>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the evaluation order without evaluating
    Order {
        /// Model definition (JSON)
        model: PathBuf,

        /// Output cell to plan for (default: the model's outputs)
        #[arg(short, long = "output", value_name = "NAME")]
        outputs: Vec<String>,
    },

    /// Run a model over every row of an input CSV
    Batch {
        /// Model definition (JSON)
        model: PathBuf,

        /// Input CSV: an id column followed by one column per input cell
        inputs: PathBuf,

        /// Results file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Results format
        #[arg(short, long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Evaluate items on all cores
        #[arg(short, long)]
        parallel: bool,

        /// Only process the first N items
        #[arg(long, value_name = "N")]
        max_items: Option<usize>,

        /// Per-item time limit in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Compare model outputs with reference values
    Validate {
        /// Model definition (JSON)
        model: PathBuf,

        /// Reference values (JSON object of cell name to number)
        reference: PathBuf,

        /// Comparison tolerance
        #[arg(short, long, default_value_t = 1e-6)]
        tolerance: f64,

        /// Compare absolute instead of relative differences
        #[arg(long)]
        absolute: bool,

        /// Write every comparison to a file (.csv or .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            model,
            outputs,
            sets,
            json,
        } => eval(&model, outputs, sets, json),
        Commands::Order { model, outputs } => order(&model, outputs),
        Commands::Batch {
            model,
            inputs,
            output,
            format,
            parallel,
            max_items,
            timeout_ms,
        } => batch(
            &model,
            &inputs,
            output.as_deref(),
            format,
            BatchOptions {
                parallel,
                max_items,
                calculation: CalculationOptions {
                    timeout: timeout_ms.map(Duration::from_millis),
                    ..Default::default()
                },
            },
        ),
        Commands::Validate {
            model,
            reference,
            tolerance,
            absolute,
            output,
        } => validate(
            &model,
            &reference,
            Tolerance {
                value: tolerance,
                relative: !absolute,
            },
            output.as_deref(),
        ),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Parse `NAME=VALUE`
fn parse_assignment(s: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let value = parse_value(value.trim())
        .ok_or_else(|| format!("cannot parse value '{value}' for {name}"))?;
    Ok((name.trim().to_string(), value))
}

fn load_model(path: &Path) -> Result<ModelDefinition> {
    ModelDefinition::from_path(path)
        .with_context(|| format!("Failed to load model '{}'", path.display()))
}

fn requested_outputs(model: &ModelDefinition, outputs: Vec<String>) -> Vec<CellName> {
    if outputs.is_empty() {
        model.outputs_or_formulas()
    } else {
        outputs.into_iter().map(CellName::from).collect()
    }
}

fn eval(path: &Path, outputs: Vec<String>, sets: Vec<(String, Value)>, json: bool) -> Result<()> {
    let model = load_model(path)?;
    let mut ctx = model.build().context("Failed to register model cells")?;

    for (name, value) in sets {
        ctx.set_literal(name.as_str(), value)
            .with_context(|| format!("Failed to set '{name}'"))?;
    }

    let outputs = requested_outputs(&model, outputs);
    let values = ctx.evaluate(outputs).context("Evaluation failed")?;

    if let Some(stats) = ctx.last_stats() {
        info!("{}", stats.summary());
    }

    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &values).context("Failed to write JSON")?;
        writeln!(stdout)?;
    } else {
        for (name, value) in &values {
            writeln!(stdout, "{name}\t{value}")?;
        }
    }

    Ok(())
}

fn order(path: &Path, outputs: Vec<String>) -> Result<()> {
    let model = load_model(path)?;
    let ctx = model.build().context("Failed to register model cells")?;

    let plan = ctx
        .plan(requested_outputs(&model, outputs))
        .context("Failed to plan evaluation")?;

    let mut stdout = io::stdout().lock();
    for (i, name) in plan.order().iter().enumerate() {
        let kind = ctx.cell(name.as_str()).map(|c| c.kind().to_string());
        writeln!(stdout, "{}\t{}\t{}", i + 1, name, kind.unwrap_or_default())?;
    }

    Ok(())
}

fn batch(
    model_path: &Path,
    inputs: &Path,
    output: Option<&Path>,
    format: Format,
    options: BatchOptions,
) -> Result<()> {
    let model = load_model(model_path)?;
    let items = read_items_csv_file(inputs)
        .with_context(|| format!("Failed to read inputs '{}'", inputs.display()))?;

    let processor = BatchProcessor::from_model(&model)
        .context("Failed to register model cells")?
        .with_options(options);
    info!(
        "Running {} items for outputs: {}",
        items.len(),
        processor
            .outputs()
            .iter()
            .map(CellName::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    let report = processor.run(items);

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            write_report(&report, format, file)?;
            eprintln!("Wrote {} results to '{}'", report.len(), path.display());
        }
        None => write_report(&report, format, io::stdout().lock())?,
    }

    let failed = report.failed().count();
    eprintln!(
        "{} items, {} failed ({:.1}% success)",
        report.len(),
        failed,
        report.success_rate() * 100.0
    );
    if failed > 0 {
        bail!("{failed} batch items failed");
    }

    Ok(())
}

fn write_report<W: Write>(report: &BatchReport, format: Format, writer: W) -> Result<()> {
    match format {
        Format::Csv => report.write_csv(writer),
        Format::Json => report.write_json(writer),
    }
    .context("Failed to write results")
}

fn validate(
    model_path: &Path,
    reference_path: &Path,
    tolerance: Tolerance,
    output: Option<&Path>,
) -> Result<()> {
    let model = load_model(model_path)?;
    let reference = reference_from_path(reference_path)
        .with_context(|| format!("Failed to load reference '{}'", reference_path.display()))?;

    let mut ctx = model.build().context("Failed to register model cells")?;
    let report = Validator::new(tolerance)
        .validate(&mut ctx, &reference)
        .context("Evaluation failed")?;

    let mut stdout = io::stdout().lock();
    for result in &report.results {
        writeln!(stdout, "{result}")?;
    }
    writeln!(stdout, "{}", report.summary())?;

    if let Some(path) = output {
        report
            .save(path)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        eprintln!("Wrote {} comparisons to '{}'", report.results.len(), path.display());
    }

    if !report.all_passed() {
        bail!("validation failed");
    }

    Ok(())
}
