use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use crudegraph::prelude::*;

/// Layered model: `width` literal inputs, then `depth` layers where each cell
/// sums two cells of the previous layer
fn layered(width: usize, depth: usize) -> CalculationContext {
    let mut ctx = CalculationContext::new();
    for i in 0..width {
        ctx.register_literal(format!("l0_{i:04}"), i as f64).unwrap();
    }
    for layer in 1..=depth {
        for i in 0..width {
            let left = format!("l{}_{:04}", layer - 1, i);
            let right = format!("l{}_{:04}", layer - 1, (i + 1) % width);
            ctx.register_formula(format!("l{layer}_{i:04}"), "ADD", vec![left.into(), right.into()])
                .unwrap();
        }
    }
    ctx
}

fn bench_recalculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Recalculation");

    for width in [10usize, 100, 500] {
        let depth = 20;
        let cells = width * (depth + 1);
        let template = layered(width, depth);

        // Cold pass: every cell dirty
        group.bench_with_input(BenchmarkId::new("Full", cells), &template, |b, template| {
            b.iter_batched(
                || template.clone(),
                |mut ctx| black_box(ctx.evaluate_all().unwrap()),
                BatchSize::SmallInput,
            )
        });

        // One input changed: only its cone is recomputed
        let mut warm = template.clone();
        warm.evaluate_all().unwrap();
        group.bench_with_input(BenchmarkId::new("Incremental", cells), &warm, |b, warm| {
            b.iter_batched(
                || {
                    let mut ctx = warm.clone();
                    ctx.set_literal("l0_0000", 42.0).unwrap();
                    ctx
                },
                |mut ctx| black_box(ctx.evaluate_all().unwrap()),
                BatchSize::SmallInput,
            )
        });

        // Planning only
        let outputs: Vec<String> = (0..width).map(|i| format!("l{depth}_{i:04}")).collect();
        group.bench_with_input(BenchmarkId::new("Plan", cells), &template, |b, template| {
            b.iter(|| black_box(template.plan(outputs.iter().cloned()).unwrap()))
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let model = ModelDefinition::new()
        .literal("feed_rate", 100_000.0)
        .literal("naphtha_pct", 0.25)
        .literal("sulfur_wt", 0.4)
        .formula("naphtha", "MUL", vec!["feed_rate".into(), "naphtha_pct".into()])
        .formula("residue", "SUB", vec!["feed_rate".into(), "naphtha".into()])
        .formula("sour", "GT", vec!["sulfur_wt".into(), 0.5.into()])
        .formula("cost", "IF", vec!["sour".into(), 2.5.into(), 0.into()])
        .output("residue")
        .output("cost");

    let items: Vec<BatchItem> = (0..1000)
        .map(|i| {
            BatchItem::new(format!("assay{i}"))
                .with_input("naphtha_pct", f64::from(i % 50) / 100.0)
                .with_input("sulfur_wt", f64::from(i % 30) / 10.0)
        })
        .collect();

    let mut group = c.benchmark_group("Batch");
    for parallel in [false, true] {
        let processor = BatchProcessor::from_model(&model)
            .unwrap()
            .with_options(BatchOptions {
                parallel,
                ..Default::default()
            });
        let label = if parallel { "Parallel" } else { "Sequential" };
        group.bench_function(label, |b| {
            b.iter(|| black_box(processor.run(items.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_recalculation, bench_batch);
criterion_main!(benches);
