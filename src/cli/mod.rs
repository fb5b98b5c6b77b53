pub mod app;
pub mod args;
pub mod budget;
pub mod config;
pub mod context;
pub mod run;
pub mod runtime;

pub use app::run;
pub use args::{BudgetOverrides, CliArgs, Commands, OutputFormat};
pub use run::{check_game, CheckResult, RunArgs};
