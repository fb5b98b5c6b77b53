use agent_loop::{estimated_cost, AdaptiveLoopConfig, ScreenshotSchedule};
use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::json;

use super::args::{BudgetOverrides, OutputFormat};
use super::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct BudgetArgs {
    #[command(flatten)]
    pub limits: BudgetOverrides,
}

pub async fn cmd_budget(args: BudgetArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().adaptive.clone();
    args.limits.apply(&mut config);
    config.validate().map_err(|reason| anyhow!(reason))?;

    let max_screenshots = config.max_screenshots();
    let schedule = ScreenshotSchedule::for_config(&config);
    let cycles = config
        .max_actions
        .min(max_screenshots)
        .min(affordable_cycles(&config));
    let worst_case = estimated_cost(cycles, cycles, cycles, &config.cost_model);

    match ctx.output() {
        OutputFormat::Json => {
            let payload = json!({
                "max_budget_usd": config.max_budget_usd,
                "reserved_usd": config.reserved_for_final_analysis_usd,
                "duration_ms": config.max_duration_ms,
                "max_screenshots": max_screenshots,
                "schedule_ms": schedule.offsets(),
                "max_cycles": cycles,
                "worst_case_usd": worst_case,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Human => {
            println!(
                "Budget: ${:.2} (${:.2} reserved), duration {}ms",
                config.max_budget_usd, config.reserved_for_final_analysis_usd, config.max_duration_ms
            );
            println!("Max screenshots: {}", max_screenshots);
            println!("Max adaptive cycles: {} (worst case ${:.2})", cycles, worst_case);
            println!("Fixed schedule:");
            for (index, offset) in schedule.offsets().iter().enumerate() {
                println!("  {:>2}. {:>7}ms", index + 1, offset);
            }
        }
    }
    Ok(())
}

/// Full cycles (screenshot, state check, action) the spendable budget covers.
fn affordable_cycles(config: &AdaptiveLoopConfig) -> u32 {
    let cycle_cost = config.cost_model.cycle_cost();
    if !(cycle_cost > 0.0) {
        return u32::MAX;
    }
    let spendable = config.max_budget_usd - config.reserved_for_final_analysis_usd;
    (spendable / cycle_cost + 1e-9).floor().max(0.0) as u32
}
