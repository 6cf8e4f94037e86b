//! Example: Sweep crude sulfur content through a small treating model

use crudegraph::prelude::*;

fn main() -> Result<()> {
    let mut ctx = CalculationContext::new();

    // Assay and configuration inputs
    ctx.register_literal("feed_rate", 120_000.0)?;
    ctx.register_literal("sulfur_wt", 0.3)?;
    ctx.register_literal("sour_limit", 0.5)?;
    ctx.register_literal("treating_cost", 1.75)?;

    // Derived quantities
    ctx.register_formula("sour", "GT", vec!["sulfur_wt".into(), "sour_limit".into()])?;
    ctx.register_formula(
        "unit_cost",
        "IF",
        vec!["sour".into(), "treating_cost".into(), 0.into()],
    )?;
    ctx.register_formula("daily_cost", "MUL", vec!["feed_rate".into(), "unit_cost".into()])?;

    // Print the evaluation order once
    let plan = ctx.plan(["daily_cost"])?;
    let order: Vec<&str> = plan.order().iter().map(|n| n.as_str()).collect();
    println!("Evaluation order: {}", order.join(" -> "));

    // Reuse the same context for every sulfur level
    for sulfur in [0.2, 0.4, 0.6, 1.2, 2.5] {
        ctx.set_literal("sulfur_wt", sulfur)?;
        let cost = ctx.value("daily_cost")?;
        let stats = ctx.last_stats().map(CalculationStats::summary);

        println!(
            "sulfur {:>4.1} wt% -> daily treating cost {} ({})",
            sulfur,
            cost,
            stats.unwrap_or_default()
        );
    }

    Ok(())
}
