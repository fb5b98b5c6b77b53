use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use super::budget::BudgetArgs;
use super::config::ConfigArgs;
use super::run::RunArgs;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, default_value = "human", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Check a browser game: activate its start control, then play within budget
    Run(RunArgs),

    /// Show the screenshot ceiling and capture schedule a budget allows
    Budget(BudgetArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Budget flags shared by `run` and `budget`.
#[derive(Args, Clone, Debug, Default)]
pub struct BudgetOverrides {
    /// Maximum spend in USD
    #[arg(long, value_name = "USD")]
    pub budget: Option<f64>,

    /// USD held back for final analysis
    #[arg(long, value_name = "USD")]
    pub reserved: Option<f64>,

    /// Wall-clock limit for the run
    #[arg(long, value_name = "MS")]
    pub duration_ms: Option<u64>,
}

impl BudgetOverrides {
    pub fn apply(&self, config: &mut agent_loop::AdaptiveLoopConfig) {
        if let Some(budget) = self.budget {
            config.max_budget_usd = budget;
        }
        if let Some(reserved) = self.reserved {
            config.reserved_for_final_analysis_usd = reserved;
        }
        if let Some(duration) = self.duration_ms {
            config.max_duration_ms = duration;
        }
    }
}
