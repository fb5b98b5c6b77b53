use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const LOCAL_ENV: &str = "config/local.env";
const LOCAL_CONFIG: &str = "config/gamecheck.yaml";

/// Export `KEY=value` lines from `config/local.env` for keys not already set.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV);
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (key, value) in parse_env_lines(&contents) {
                if env::var(&key).is_err() {
                    env::set_var(key, value);
                }
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = idx + 1, "invalid local.env entry; skipping");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.push((key.to_string(), unquote(value.trim())));
    }
    pairs
}

fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\\\"", "\"")
    } else {
        value.to_string()
    }
}

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

/// Resolve the config path: explicit flag, then `./config/gamecheck.yaml`,
/// then `<config_dir>/gamecheck/config.yaml`.
pub fn config_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("gamecheck");
    path.push("config.yaml");
    Ok(path)
}

/// Read the YAML config (defaults when absent) and apply environment
/// overrides once.
pub async fn load_config(explicit: Option<&PathBuf>) -> Result<LoadedConfig> {
    let path = config_path(explicit)?;

    let mut config = if path.exists() {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded configuration from: {}", path.display());
        config
    } else if explicit.is_some() {
        anyhow::bail!("config file {} does not exist", path.display());
    } else {
        warn!("Config file not found, using defaults: {}", path.display());
        Config::default()
    };

    config.apply_env_overrides();
    Ok(LoadedConfig { config, path })
}
