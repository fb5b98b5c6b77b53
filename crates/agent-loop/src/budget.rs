//! Budget model: screenshot ceiling, running cost estimate and capture
//! schedule, plus the per-run `BudgetState`.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TerminationReason;

/// Fewest screenshots any run is planned with.
pub const MIN_SCREENSHOTS: u32 = 3;

/// Most screenshots any run is planned with.
pub const MAX_SCREENSHOTS: u32 = 20;

/// Post-start settle point, always part of a capture schedule.
pub const SETTLE_ANCHOR_MS: u64 = 2_000;

/// Absorbs binary rounding in budget divisions such as 0.40 / 0.02.
const EPSILON: f64 = 1e-9;

/// Estimated USD cost of each expensive operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    pub per_action: f64,
    pub per_screenshot: f64,
    pub per_state_check: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            per_action: 0.02,
            per_screenshot: 0.02,
            per_state_check: 0.03,
        }
    }
}

impl CostModel {
    /// Cost of one full adaptive cycle: screenshot, state check, action.
    pub fn cycle_cost(&self) -> f64 {
        self.per_screenshot + self.per_state_check + self.per_action
    }
}

/// `clamp(floor((budget - reserved) / cost_per_screenshot), 3, 20)`
pub fn max_screenshots(budget: f64, reserved: f64, cost_per_screenshot: f64) -> u32 {
    if !(cost_per_screenshot > 0.0) {
        return MAX_SCREENSHOTS;
    }
    let affordable = ((budget - reserved) / cost_per_screenshot + EPSILON).floor();
    if !affordable.is_finite() {
        return MIN_SCREENSHOTS;
    }
    affordable.clamp(MIN_SCREENSHOTS as f64, MAX_SCREENSHOTS as f64) as u32
}

/// Running cost of a run from its operation counts.
pub fn estimated_cost(
    action_count: u32,
    screenshot_count: u32,
    state_check_count: u32,
    costs: &CostModel,
) -> f64 {
    action_count as f64 * costs.per_action
        + screenshot_count as f64 * costs.per_screenshot
        + state_check_count as f64 * costs.per_state_check
}

/// Capture offsets in milliseconds, sorted ascending.
///
/// Always contains `0`, the settle anchor and `total_duration_ms`; the
/// remaining `count - 3` points are spread evenly between the settle anchor
/// and the end. A `count` below three still yields the three anchors.
pub fn distribute_screenshots(total_duration_ms: u64, count: u32) -> Vec<u64> {
    let mut offsets = vec![0, SETTLE_ANCHOR_MS, total_duration_ms];

    let interior = count.saturating_sub(MIN_SCREENSHOTS);
    let span = total_duration_ms.saturating_sub(SETTLE_ANCHOR_MS) as u128;
    let slots = interior as u128 + 1;
    for i in 1..=interior as u128 {
        offsets.push(SETTLE_ANCHOR_MS + (span * i / slots) as u64);
    }

    offsets.sort_unstable();
    offsets
}

/// Observation and spend counters for one run. Owned by a single loop
/// controller and never shared.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetState {
    pub max_budget_usd: f64,
    pub reserved_for_final_analysis_usd: f64,
    pub spent_estimate_usd: f64,
    pub screenshots_taken: u32,
    pub actions_taken: u32,
    pub state_checks_taken: u32,
    pub max_screenshots: u32,
    pub max_actions: u32,
    pub max_duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub costs: CostModel,
    #[serde(skip)]
    clock: Instant,
}

impl BudgetState {
    pub fn new(
        max_budget_usd: f64,
        reserved_for_final_analysis_usd: f64,
        max_actions: u32,
        max_duration_ms: u64,
        costs: CostModel,
    ) -> Self {
        Self {
            max_budget_usd,
            reserved_for_final_analysis_usd,
            spent_estimate_usd: 0.0,
            screenshots_taken: 0,
            actions_taken: 0,
            state_checks_taken: 0,
            max_screenshots: max_screenshots(
                max_budget_usd,
                reserved_for_final_analysis_usd,
                costs.per_screenshot,
            ),
            max_actions,
            max_duration_ms,
            started_at: Utc::now(),
            costs,
            clock: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Spend ceiling for the adaptive part of the run.
    pub fn available_usd(&self) -> f64 {
        self.max_budget_usd - self.reserved_for_final_analysis_usd
    }

    pub fn record_screenshot(&mut self) {
        self.screenshots_taken += 1;
        self.recompute();
    }

    pub fn record_state_check(&mut self) {
        self.state_checks_taken += 1;
        self.recompute();
    }

    pub fn record_action(&mut self) {
        self.actions_taken += 1;
        self.recompute();
    }

    /// Spend after one more full cycle.
    pub fn projected_cycle_spend(&self) -> f64 {
        self.spent_estimate_usd + self.costs.cycle_cost()
    }

    /// First stopping condition that holds, if any.
    pub fn termination(&self) -> Option<TerminationReason> {
        if self.elapsed() >= Duration::from_millis(self.max_duration_ms) {
            return Some(TerminationReason::TimeExhausted);
        }
        if self.actions_taken >= self.max_actions {
            return Some(TerminationReason::ActionLimitReached);
        }
        if self.screenshots_taken >= self.max_screenshots {
            return Some(TerminationReason::ScreenshotLimitReached);
        }
        if self.projected_cycle_spend() > self.available_usd() + EPSILON {
            return Some(TerminationReason::BudgetExhausted);
        }
        None
    }

    // Counters only grow, so the estimate never decreases.
    fn recompute(&mut self) {
        self.spent_estimate_usd = estimated_cost(
            self.actions_taken,
            self.screenshots_taken,
            self.state_checks_taken,
            &self.costs,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_max_screenshots_clamps() {
        assert_eq!(max_screenshots(0.50, 0.10, 0.02), 20);
        assert_eq!(max_screenshots(0.15, 0.10, 0.02), 3);
        assert_eq!(max_screenshots(2.00, 0.10, 0.02), 20);
        assert_eq!(max_screenshots(0.30, 0.10, 0.02), 10);
    }

    #[test]
    fn test_max_screenshots_degenerate_inputs() {
        assert_eq!(max_screenshots(0.05, 0.10, 0.02), 3);
        assert_eq!(max_screenshots(1.0, 0.0, 0.0), 20);
    }

    #[test]
    fn test_estimated_cost() {
        let costs = CostModel::default();
        assert!(close(estimated_cost(5, 6, 0, &costs), 0.22));
        assert!(close(estimated_cost(0, 0, 2, &costs), 0.06));
        assert!(close(estimated_cost(0, 0, 0, &costs), 0.0));
    }

    #[test]
    fn test_distribution_invariants() {
        for duration in [0u64, 1_500, 2_000, 10_000, 60_000, 123_457] {
            for count in 3..=20u32 {
                let offsets = distribute_screenshots(duration, count);
                assert_eq!(offsets.len(), count as usize);
                assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
                assert!(offsets.contains(&0));
                assert!(offsets.contains(&SETTLE_ANCHOR_MS));
                assert!(offsets.contains(&duration));
            }
        }
    }

    #[test]
    fn test_distribution_is_even() {
        assert_eq!(
            distribute_screenshots(10_000, 6),
            vec![0, 2_000, 4_000, 6_000, 8_000, 10_000]
        );
        assert_eq!(distribute_screenshots(30_000, 3), vec![0, 2_000, 30_000]);
    }

    #[test]
    fn test_distribution_below_minimum_keeps_anchors() {
        assert_eq!(distribute_screenshots(10_000, 1), vec![0, 2_000, 10_000]);
        assert_eq!(distribute_screenshots(1_000, 3), vec![0, 1_000, 2_000]);
    }

    #[test]
    fn test_budget_state_spend_grows() {
        let mut state = BudgetState::new(0.50, 0.10, 10, 60_000, CostModel::default());
        assert_eq!(state.max_screenshots, 20);

        let mut last = state.spent_estimate_usd;
        state.record_screenshot();
        assert!(state.spent_estimate_usd > last);
        last = state.spent_estimate_usd;
        state.record_state_check();
        assert!(state.spent_estimate_usd > last);
        last = state.spent_estimate_usd;
        state.record_action();
        assert!(state.spent_estimate_usd > last);
        assert!(close(state.spent_estimate_usd, 0.07));
    }

    #[test]
    fn test_budget_stops_before_overspend() {
        // 0.40 available, 0.07 per cycle: five cycles fit, the sixth would not.
        let mut state = BudgetState::new(0.50, 0.10, 100, 60_000, CostModel::default());
        let mut cycles = 0;
        while state.termination().is_none() {
            state.record_screenshot();
            state.record_state_check();
            state.record_action();
            cycles += 1;
        }
        assert_eq!(cycles, 5);
        assert_eq!(state.termination(), Some(TerminationReason::BudgetExhausted));
        assert!(state.spent_estimate_usd <= state.available_usd());
    }

    #[test]
    fn test_action_limit_terminates() {
        let mut state = BudgetState::new(10.0, 0.0, 2, 60_000, CostModel::default());
        state.record_action();
        assert!(state.termination().is_none());
        state.record_action();
        assert_eq!(state.termination(), Some(TerminationReason::ActionLimitReached));
    }

    #[test]
    fn test_time_limit_terminates() {
        let state = BudgetState::new(10.0, 0.0, 10, 0, CostModel::default());
        assert_eq!(state.termination(), Some(TerminationReason::TimeExhausted));
    }
}
