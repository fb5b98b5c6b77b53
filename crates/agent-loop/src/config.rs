//! Configuration for the adaptive test loop.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::budget::{max_screenshots, CostModel};

/// Limits and pacing for one adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveLoopConfig {
    /// Total spend ceiling in USD.
    /// Default: 0.50
    pub max_budget_usd: f64,

    /// Held back for the final playability analysis.
    /// Default: 0.10
    pub reserved_for_final_analysis_usd: f64,

    /// Executed actions before the loop stops.
    /// Default: 20
    pub max_actions: u32,

    /// Wall-clock ceiling for the run in milliseconds.
    /// Default: 60000
    pub max_duration_ms: u64,

    pub cost_model: CostModel,

    /// Timeout per action dispatch in milliseconds.
    /// Default: 5000
    pub action_timeout_ms: u64,

    /// Timeout per reasoning-service call in milliseconds.
    /// Default: 30000
    pub reasoning_timeout_ms: u64,

    /// Pause after each cycle so the page can react.
    /// Default: 500
    pub wait_between_actions_ms: u64,

    /// Failed cycles in a row before giving up; 0 disables the limit.
    /// Default: 3
    pub max_consecutive_failures: u32,

    /// Cap on sanitized HTML sent with each state check.
    /// Default: 50000
    pub max_html_chars: usize,

    /// Natural-language goal handed to the reasoning service.
    pub goal: String,
}

impl Default for AdaptiveLoopConfig {
    fn default() -> Self {
        Self {
            max_budget_usd: 0.50,
            reserved_for_final_analysis_usd: 0.10,
            max_actions: 20,
            max_duration_ms: 60_000,
            cost_model: CostModel::default(),
            action_timeout_ms: 5_000,
            reasoning_timeout_ms: 30_000,
            wait_between_actions_ms: 500,
            max_consecutive_failures: 3,
            max_html_chars: 50_000,
            goal: "Play the game: exercise its controls and reach a game-over or win state"
                .to_string(),
        }
    }
}

impl AdaptiveLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal config for testing.
    pub fn minimal() -> Self {
        Self {
            max_duration_ms: 10_000,
            action_timeout_ms: 500,
            reasoning_timeout_ms: 1_000,
            wait_between_actions_ms: 0,
            max_html_chars: 5_000,
            ..Self::default()
        }
    }

    /// Builder: set the budget and the reserve.
    pub fn budget(mut self, max_usd: f64, reserved_usd: f64) -> Self {
        self.max_budget_usd = max_usd;
        self.reserved_for_final_analysis_usd = reserved_usd;
        self
    }

    /// Builder: set max actions.
    pub fn max_actions(mut self, count: u32) -> Self {
        self.max_actions = count;
        self
    }

    /// Builder: set the run duration ceiling.
    pub fn duration(mut self, ms: u64) -> Self {
        self.max_duration_ms = ms;
        self
    }

    /// Builder: set the consecutive-failure limit (0 disables it).
    pub fn consecutive_failures(mut self, limit: u32) -> Self {
        self.max_consecutive_failures = limit;
        self
    }

    /// Builder: set the goal.
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Whether `failures` failed cycles in a row should end the run.
    pub fn failure_limit_reached(&self, failures: u32) -> bool {
        self.max_consecutive_failures > 0 && failures >= self.max_consecutive_failures
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn reasoning_timeout(&self) -> Duration {
        Duration::from_millis(self.reasoning_timeout_ms)
    }

    /// Screenshot ceiling implied by the budget.
    pub fn max_screenshots(&self) -> u32 {
        max_screenshots(
            self.max_budget_usd,
            self.reserved_for_final_analysis_usd,
            self.cost_model.per_screenshot,
        )
    }

    /// Reject configurations no run could make progress with.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.max_budget_usd > 0.0) {
            return Err("max_budget_usd must be positive".to_string());
        }
        if self.reserved_for_final_analysis_usd < 0.0
            || self.reserved_for_final_analysis_usd >= self.max_budget_usd
        {
            return Err("reserved_for_final_analysis_usd must be in [0, max_budget_usd)".to_string());
        }
        if self.max_actions == 0 {
            return Err("max_actions must be at least 1".to_string());
        }
        if self.max_duration_ms == 0 {
            return Err("max_duration_ms must be positive".to_string());
        }
        Ok(())
    }
}
