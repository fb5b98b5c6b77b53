//! Playability scoring over run results.
//!
//! 50 points for activating the start control, up to 30 for the share of
//! successful cycles, 20 for ending cleanly.

use agent_loop::{AdaptiveRunResult, LoopStatus, ScheduledCapture, TerminationReason};
use gamecheck_core_types::Outcome;
use serde::Serialize;

pub const START_POINTS: u32 = 50;
pub const CYCLE_POINTS: u32 = 30;
pub const COMPLETION_POINTS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayabilityScore {
    /// 0..=100
    pub score: u32,
    pub start_activated: bool,
    pub start_points: u32,
    pub cycle_points: u32,
    pub completion_points: u32,
    pub issues: Vec<String>,
}

impl PlayabilityScore {
    pub fn is_playable(&self) -> bool {
        self.start_activated && self.issues.is_empty()
    }
}

/// Score an adaptive run.
pub fn score_run(result: &AdaptiveRunResult) -> PlayabilityScore {
    let mut issues = Vec::new();
    let start_activated = result.bootstrap.success;
    if !start_activated {
        issues.push(start_issue(&result.bootstrap));
    }

    let cycle_points = fraction_points(result.successful_cycles(), result.cycles.len());
    let failed = result.failed_cycles();
    if failed > 0 {
        issues.push(format!("{} of {} cycles failed", failed, result.cycles.len()));
    }

    match (result.status, result.termination) {
        (LoopStatus::Aborted, _) => issues.push(format!(
            "Run aborted: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )),
        (_, TerminationReason::ConsecutiveFailures) => {
            issues.push("Stopped after repeated consecutive failures".to_string())
        }
        _ => {}
    }

    let clean = result.status == LoopStatus::Completed
        && result.termination.is_clean()
        && result.error.is_none();
    let completion_points = if start_activated && clean {
        COMPLETION_POINTS
    } else {
        0
    };

    build(start_activated, cycle_points, completion_points, issues)
}

/// Score a fixed-schedule run, where captures stand in for cycles.
pub fn score_schedule(bootstrap: &Outcome, captures: &[ScheduledCapture]) -> PlayabilityScore {
    let mut issues = Vec::new();
    let start_activated = bootstrap.success;
    if !start_activated {
        issues.push(start_issue(bootstrap));
    }

    let captured = captures.iter().filter(|c| c.is_success()).count();
    let cycle_points = fraction_points(captured, captures.len());
    if captured < captures.len() {
        issues.push(format!(
            "{} of {} scheduled screenshots failed",
            captures.len() - captured,
            captures.len()
        ));
    }

    let completion_points = if start_activated && captured == captures.len() {
        COMPLETION_POINTS
    } else {
        0
    };

    build(start_activated, cycle_points, completion_points, issues)
}

fn start_issue(bootstrap: &Outcome) -> String {
    format!(
        "Start control not activated: {}",
        bootstrap.error_message.as_deref().unwrap_or("no strategy succeeded")
    )
}

fn fraction_points(successes: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((CYCLE_POINTS as f64) * successes as f64 / total as f64).round() as u32
}

fn build(
    start_activated: bool,
    cycle_points: u32,
    completion_points: u32,
    issues: Vec<String>,
) -> PlayabilityScore {
    let start_points = if start_activated { START_POINTS } else { 0 };
    PlayabilityScore {
        score: start_points + cycle_points + completion_points,
        start_activated,
        start_points,
        cycle_points,
        completion_points,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_loop::{BudgetState, CostModel, CycleRecord};
    use gamecheck_core_types::RunId;
    use std::time::Duration;

    fn cycle(index: u32, success: bool) -> CycleRecord {
        let mut record = CycleRecord::failed(index, "no progress");
        if success {
            record.success = true;
            record.error = None;
        }
        record
    }

    fn result(
        bootstrap_ok: bool,
        cycles: Vec<CycleRecord>,
        status: LoopStatus,
        termination: TerminationReason,
    ) -> AdaptiveRunResult {
        let bootstrap = if bootstrap_ok {
            Outcome::succeeded("structural-selector", 1, Duration::from_millis(40))
        } else {
            Outcome::exhausted(4, Duration::from_millis(900))
        };
        AdaptiveRunResult {
            run_id: RunId::new(),
            status,
            termination,
            bootstrap,
            cycles,
            budget: BudgetState::new(0.5, 0.1, 20, 60_000, CostModel::default()),
            error: None,
            total_time_ms: 1_000,
        }
    }

    #[test]
    fn perfect_run_scores_100() {
        let run = result(
            true,
            vec![cycle(0, true), cycle(1, true)],
            LoopStatus::Completed,
            TerminationReason::GoalCompleted,
        );
        let score = score_run(&run);
        assert_eq!(score.score, 100);
        assert!(score.is_playable());
    }

    #[test]
    fn partial_cycles_scale_points() {
        let run = result(
            true,
            vec![cycle(0, true), cycle(1, false), cycle(2, true), cycle(3, true)],
            LoopStatus::Completed,
            TerminationReason::BudgetExhausted,
        );
        let score = score_run(&run);
        assert_eq!(score.cycle_points, 23);
        assert_eq!(score.score, 93);
        assert_eq!(score.issues, vec!["1 of 4 cycles failed".to_string()]);
    }

    #[test]
    fn failed_bootstrap_scores_zero() {
        let run = result(
            false,
            vec![],
            LoopStatus::BootstrapFailed,
            TerminationReason::BootstrapFailed,
        );
        let score = score_run(&run);
        assert_eq!(score.score, 0);
        assert!(!score.start_activated);
        assert!(score.issues[0].starts_with("Start control not activated"));
    }

    #[test]
    fn aborted_run_loses_completion_points() {
        let mut run = result(
            true,
            vec![cycle(0, true)],
            LoopStatus::Aborted,
            TerminationReason::Aborted,
        );
        run.error = Some("Browser init failed: crashed".to_string());
        let score = score_run(&run);
        assert_eq!(score.score, 80);
        assert!(score.issues.iter().any(|i| i.contains("crashed")));
    }

    #[test]
    fn consecutive_failures_are_an_issue() {
        let run = result(
            true,
            vec![cycle(0, false), cycle(1, false)],
            LoopStatus::Completed,
            TerminationReason::ConsecutiveFailures,
        );
        let score = score_run(&run);
        assert_eq!(score.score, 50);
        assert_eq!(score.issues.len(), 2);
    }

    #[test]
    fn schedule_scoring() {
        let bootstrap = Outcome::succeeded("vision-candidate", 1, Duration::from_millis(10));
        let ok = ScheduledCapture {
            offset_ms: 0,
            path: None,
            error: None,
        };
        let bad = ScheduledCapture {
            offset_ms: 2_000,
            path: None,
            error: Some("timeout".into()),
        };
        assert_eq!(score_schedule(&bootstrap, &[ok.clone(), ok.clone()]).score, 100);
        let partial = score_schedule(&bootstrap, &[ok, bad]);
        assert_eq!(partial.score, 65);
        assert_eq!(partial.issues.len(), 1);
    }
}
