//! Recommendation execution path
//!
//! Shared by the state-recommendation strategy and the adaptive loop: run
//! the primary proposal, fall through to alternatives in order, stop at the
//! first proposal that executes.

use std::time::{Duration, Instant};

use gamecheck_core_types::{
    ActionKind, ActionProposal, ActionTarget, Outcome, Point, QaError, Recommendation,
};
use tracing::{debug, warn};

use crate::ports::BrowserDriver;
use crate::strategies::within;

/// Result of running one recommendation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRun {
    pub success: bool,
    /// Proposals tried; the primary is attempt 1.
    pub attempts: u32,
    /// The proposal that executed, if any.
    pub executed: Option<ActionProposal>,
    /// A `complete` proposal was reached.
    pub completed: bool,
    pub coordinates: Option<Point>,
    pub duration: Duration,
    pub last_error: Option<QaError>,
}

impl RecommendationRun {
    /// Fold the run into a strategy outcome.
    pub fn to_outcome(&self, strategy_name: &str, elapsed: Duration) -> Outcome {
        if self.success {
            let outcome = Outcome::succeeded(strategy_name, self.attempts, elapsed);
            return match self.coordinates {
                Some(point) => outcome.with_coordinates(point),
                None => outcome,
            };
        }
        match &self.last_error {
            Some(err) => Outcome::from_error(strategy_name, self.attempts, elapsed, err),
            None => Outcome::failed(
                strategy_name,
                self.attempts,
                elapsed,
                "Recommendation had no actionable proposal",
            ),
        }
    }
}

/// Execute `recommendation` against the driver, each action bounded by
/// `action_timeout`.
pub async fn execute_recommendation(
    driver: &dyn BrowserDriver,
    recommendation: &Recommendation,
    action_timeout: Duration,
) -> RecommendationRun {
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error = None;

    for proposal in recommendation.proposals() {
        attempts += 1;
        debug!(
            attempt = attempts,
            action = proposal.action.name(),
            confidence = proposal.confidence,
            "Executing proposal"
        );

        match execute_proposal(driver, proposal, action_timeout).await {
            Ok(coordinates) => {
                return RecommendationRun {
                    success: true,
                    attempts,
                    executed: Some(proposal.clone()),
                    completed: proposal.action == ActionKind::Complete,
                    coordinates,
                    duration: start.elapsed(),
                    last_error: None,
                };
            }
            Err(err) if err.is_recoverable() => {
                warn!(attempt = attempts, action = proposal.action.name(), %err, "Proposal failed");
                last_error = Some(err);
            }
            Err(err) => {
                last_error = Some(err);
                break;
            }
        }
    }

    RecommendationRun {
        success: false,
        attempts,
        executed: None,
        completed: false,
        coordinates: None,
        duration: start.elapsed(),
        last_error,
    }
}

async fn execute_proposal(
    driver: &dyn BrowserDriver,
    proposal: &ActionProposal,
    action_timeout: Duration,
) -> Result<Option<Point>, QaError> {
    match (proposal.action, &proposal.target) {
        (ActionKind::Complete, _) => Ok(None),
        (ActionKind::Click, ActionTarget::Point(point)) => {
            let point = point.rounded();
            within("click", action_timeout, driver.click_at(point.x, point.y)).await?;
            Ok(Some(point))
        }
        (ActionKind::Keypress, ActionTarget::Key(key)) if !key.trim().is_empty() => {
            within("keypress", action_timeout, driver.press_key(key.trim())).await?;
            Ok(None)
        }
        (ActionKind::Wait, target) => {
            let wait = wait_duration(target)?.min(action_timeout);
            tokio::time::sleep(wait).await;
            Ok(None)
        }
        (action, target) => Err(QaError::action(format!(
            "{} with target {:?} is not actionable",
            action.name(),
            target
        ))),
    }
}

fn wait_duration(target: &ActionTarget) -> Result<Duration, QaError> {
    match target {
        ActionTarget::DurationMs(ms) => Ok(Duration::from_millis(*ms)),
        ActionTarget::Key(raw) => raw
            .trim()
            .trim_end_matches("ms")
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| QaError::action(format!("unparseable wait duration '{raw}'"))),
        other => Err(QaError::action(format!("wait needs a duration, got {other:?}"))),
    }
}
