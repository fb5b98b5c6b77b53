use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;

use super::args::OutputFormat;
use super::context::CliContext;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Validate the configuration file and the effective values
    Validate,

    /// Print the configuration file path in use
    Path,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => match ctx.output() {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ctx.config())?),
            OutputFormat::Human => {
                println!("Effective configuration ({}):", path.display());
                println!("{}", serde_yaml::to_string(ctx.config())?);
            }
        },
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                let raw = fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_yaml::from_str::<Config>(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?;
            }
            ctx.config()
                .validate()
                .with_context(|| format!("validating {}", path.display()))?;
            if ctx.config().reasoning.enabled && !ctx.config().reasoning_active() {
                println!("Warning: reasoning is enabled but no API key is configured; runs will use the fixed schedule");
            }
            println!("Configuration {} is valid", path.display());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }

    Ok(())
}
