//! Records produced by an adaptive run.

use std::path::PathBuf;

use gamecheck_core_types::{ActionProposal, Outcome, Recommendation, RunId};
use serde::{Deserialize, Serialize};

use crate::budget::BudgetState;

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Bootstrap,
    Iterating,
    Terminated,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The reasoning service recommended `complete`.
    GoalCompleted,
    TimeExhausted,
    ActionLimitReached,
    ScreenshotLimitReached,
    /// One more cycle would eat into the reserved budget.
    BudgetExhausted,
    ConsecutiveFailures,
    BootstrapFailed,
    /// A non-recoverable error ended the run.
    Aborted,
}

impl TerminationReason {
    /// Expected stopping conditions: the goal was reached or a limit ran out.
    pub fn is_clean(&self) -> bool {
        matches!(
            self,
            TerminationReason::GoalCompleted
                | TerminationReason::TimeExhausted
                | TerminationReason::ActionLimitReached
                | TerminationReason::ScreenshotLimitReached
                | TerminationReason::BudgetExhausted
        )
    }
}

/// Final status of the loop itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// Reached TERMINATED through a predicate or a `complete` recommendation.
    Completed,
    /// Start control could not be activated.
    BootstrapFailed,
    /// Non-recoverable error.
    Aborted,
}

/// One capture → recommend → execute cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleRecord {
    pub index: u32,
    pub success: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed: Option<ActionProposal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub spent_estimate_usd: f64,
}

impl CycleRecord {
    pub fn failed(index: u32, error: impl Into<String>) -> Self {
        Self {
            index,
            success: false,
            attempts: 0,
            recommendation: None,
            executed: None,
            screenshot: None,
            error: Some(error.into()),
            duration_ms: 0,
            spent_estimate_usd: 0.0,
        }
    }
}

/// Result of an adaptive run.
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveRunResult {
    pub run_id: RunId,
    pub status: LoopStatus,
    pub termination: TerminationReason,
    pub bootstrap: Outcome,
    pub cycles: Vec<CycleRecord>,
    pub budget: BudgetState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_time_ms: u64,
}

impl AdaptiveRunResult {
    pub fn is_success(&self) -> bool {
        self.status == LoopStatus::Completed
    }

    pub fn successful_cycles(&self) -> usize {
        self.cycles.iter().filter(|c| c.success).count()
    }

    pub fn failed_cycles(&self) -> usize {
        self.cycles.len() - self.successful_cycles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_terminations() {
        assert!(TerminationReason::GoalCompleted.is_clean());
        assert!(TerminationReason::BudgetExhausted.is_clean());
        assert!(!TerminationReason::ConsecutiveFailures.is_clean());
        assert!(!TerminationReason::Aborted.is_clean());
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&TerminationReason::ScreenshotLimitReached).unwrap();
        assert_eq!(json, "\"screenshot_limit_reached\"");
    }
}
