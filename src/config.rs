//! Application configuration
//!
//! One YAML document with a section per subsystem. Environment overrides are
//! applied once, right after loading, and never re-read afterwards.

use std::env;
use std::path::PathBuf;

use action_strategies::StrategyConfig;
use agent_loop::AdaptiveLoopConfig;
use anyhow::{bail, Result};
use cdp_driver::ChromeConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vision_llm::VisionLlmConfig;

/// Reasoning service switch plus client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub enabled: bool,
    #[serde(flatten)]
    pub client: VisionLlmConfig,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            client: VisionLlmConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub navigation_timeout_ms: u64,
    pub browser: ChromeConfig,
    pub strategies: StrategyConfig,
    pub adaptive: AdaptiveLoopConfig,
    pub reasoning: ReasoningConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("gamecheck-output"),
            navigation_timeout_ms: 30_000,
            browser: ChromeConfig::default(),
            strategies: StrategyConfig::default(),
            adaptive: AdaptiveLoopConfig::default(),
            reasoning: ReasoningConfig::default(),
        }
    }
}

impl Config {
    /// Apply `GAMECHECK_*` and `OPENAI_API_KEY` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("GAMECHECK_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("GAMECHECK_CHROME_PATH") {
            self.browser.executable = Some(PathBuf::from(path));
        }
        override_parsed(&lookup, "GAMECHECK_HEADLESS", &mut self.browser.headless);
        override_parsed(&lookup, "GAMECHECK_NO_SANDBOX", &mut self.browser.no_sandbox);
        override_parsed(&lookup, "GAMECHECK_MAX_BUDGET_USD", &mut self.adaptive.max_budget_usd);
        override_parsed(&lookup, "GAMECHECK_MAX_ACTIONS", &mut self.adaptive.max_actions);
        override_parsed(&lookup, "GAMECHECK_MAX_DURATION_MS", &mut self.adaptive.max_duration_ms);
        override_parsed(&lookup, "GAMECHECK_REASONING", &mut self.reasoning.enabled);
        if let Some(model) = lookup("GAMECHECK_LLM_MODEL") {
            self.reasoning.client.model = model;
        }
        if let Some(base) = lookup("GAMECHECK_LLM_API_BASE") {
            self.reasoning.client.api_base = base;
        }

        // Comma-separated; earlier keys are tried first.
        if let Some(keys) = lookup("OPENAI_API_KEY") {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
            if !keys.is_empty() {
                info!(count = keys.len(), "Using reasoning API keys from OPENAI_API_KEY");
                self.reasoning.client.api_keys = keys;
            }
        }
    }

    /// Reasoning runs only when switched on and a key is available.
    pub fn reasoning_active(&self) -> bool {
        self.reasoning.enabled && self.reasoning.client.has_keys()
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(reason) = self.adaptive.validate() {
            bail!("adaptive: {reason}");
        }
        let strategies = &self.strategies;
        if !(0.0..=1.0).contains(&strategies.min_confidence) {
            bail!("strategies.min_confidence must be within [0, 1]");
        }
        if strategies.resolve_timeout_ms == 0 {
            bail!("strategies.resolve_timeout_ms must be positive");
        }
        if self.navigation_timeout_ms == 0 {
            bail!("navigation_timeout_ms must be positive");
        }
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            bail!("browser window size must be non-zero");
        }
        Ok(())
    }
}

fn override_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warn!(key, value = %raw, "ignoring unparseable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(!config.reasoning_active());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
output_dir: /tmp/qa
adaptive:
  max_budget_usd: 1.0
  max_actions: 5
reasoning:
  model: gpt-4o
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/qa"));
        assert_eq!(config.adaptive.max_actions, 5);
        assert_eq!(config.adaptive.reserved_for_final_analysis_usd, 0.10);
        assert_eq!(config.reasoning.client.model, "gpt-4o");
        assert!(config.reasoning.enabled);
        assert_eq!(config.strategies.min_confidence, 0.7);
    }

    #[test]
    fn overrides_apply() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("GAMECHECK_HEADLESS", "false"),
            ("GAMECHECK_MAX_BUDGET_USD", "0.25"),
            ("GAMECHECK_MAX_ACTIONS", "not-a-number"),
            ("OPENAI_API_KEY", "sk-a, sk-b,"),
        ]));
        assert!(!config.browser.headless);
        assert_eq!(config.adaptive.max_budget_usd, 0.25);
        assert_eq!(config.adaptive.max_actions, 20);
        assert_eq!(config.reasoning.client.api_keys, vec!["sk-a", "sk-b"]);
        assert!(config.reasoning_active());
    }

    #[test]
    fn disabled_reasoning_is_inactive_even_with_keys() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("OPENAI_API_KEY", "sk-a"),
            ("GAMECHECK_REASONING", "false"),
        ]));
        assert!(!config.reasoning_active());
    }

    #[test]
    fn invalid_budget_is_rejected() {
        let mut config = Config::default();
        config.adaptive.reserved_for_final_analysis_usd = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().starts_with("adaptive:"));
    }

    #[test]
    #[serial_test::serial]
    fn process_environment_is_read() {
        env::set_var("GAMECHECK_OUTPUT_DIR", "/tmp/from-env");
        let mut config = Config::default();
        config.apply_env_overrides();
        env::remove_var("GAMECHECK_OUTPUT_DIR");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/from-env"));
    }
}
