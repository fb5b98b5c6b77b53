use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::args::{CliArgs, Commands};
use super::budget::cmd_budget;
use super::config::cmd_config;
use super::context::CliContext;
use super::run::cmd_run;
use super::runtime::{init_logging, load_config, load_local_env_overrides, LoadedConfig};

pub async fn run() -> Result<()> {
    load_local_env_overrides();
    let cli = CliArgs::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting gamecheck v{} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let ctx = CliContext::new(config, path, cli.output);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args, &ctx).await,
        Commands::Budget(args) => cmd_budget(args, &ctx).await,
        Commands::Config(args) => cmd_config(args, &ctx).await,
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {:#}", err);
            Err(err)
        }
    }
}
