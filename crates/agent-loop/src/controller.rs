//! Adaptive Loop Controller - bootstrap, then capture → recommend → execute
//! cycles until a stopping condition holds.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use action_strategies::{
    execute_recommendation, sanitize_html, ReasoningService, RecommendationRequest,
    ResolveContext, StrategyDeps, StrategyKind, StrategyOrchestrator,
};
use gamecheck_core_types::{Outcome, QaError, RunId, NO_STRATEGY};
use tracing::{debug, error, info, warn};

use crate::budget::BudgetState;
use crate::config::AdaptiveLoopConfig;
use crate::types::{AdaptiveRunResult, CycleRecord, LoopPhase, LoopStatus, TerminationReason};

/// Internal state of one run.
struct LoopState {
    run_id: RunId,
    phase: LoopPhase,
    budget: BudgetState,
    cycles: Vec<CycleRecord>,
    prior_actions: Vec<String>,
    consecutive_failures: u32,
    started: Instant,
}

impl LoopState {
    fn new(config: &AdaptiveLoopConfig) -> Self {
        Self {
            run_id: RunId::new(),
            phase: LoopPhase::Bootstrap,
            budget: BudgetState::new(
                config.max_budget_usd,
                config.reserved_for_final_analysis_usd,
                config.max_actions,
                config.max_duration_ms,
                config.cost_model,
            ),
            cycles: Vec::new(),
            prior_actions: Vec::new(),
            consecutive_failures: 0,
            started: Instant::now(),
        }
    }

    fn transition(&mut self, phase: LoopPhase) {
        debug!(run_id = %self.run_id, "Loop phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn finish(
        mut self,
        status: LoopStatus,
        termination: TerminationReason,
        bootstrap: Outcome,
        error: Option<String>,
    ) -> AdaptiveRunResult {
        self.transition(LoopPhase::Terminated);
        info!(
            run_id = %self.run_id,
            cycles = self.cycles.len(),
            spent_usd = self.budget.spent_estimate_usd,
            "Adaptive run finished: {:?} ({:?})",
            status,
            termination
        );
        AdaptiveRunResult {
            run_id: self.run_id,
            status,
            termination,
            bootstrap,
            cycles: self.cycles,
            budget: self.budget,
            error,
            total_time_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// A cycle error plus whatever evidence the cycle captured before it.
struct CycleFailure {
    error: QaError,
    screenshot: Option<PathBuf>,
}

impl From<QaError> for CycleFailure {
    fn from(error: QaError) -> Self {
        Self {
            error,
            screenshot: None,
        }
    }
}

/// Drives one adaptive test run against a single page.
///
/// Every step runs sequentially; the page state observed in a cycle depends
/// on the previous cycle's action.
pub struct AdaptiveLoopController {
    config: AdaptiveLoopConfig,
    deps: StrategyDeps,
    reasoning: Arc<dyn ReasoningService>,
}

impl AdaptiveLoopController {
    /// Fails when `deps` carries no reasoning service; use a
    /// `ScreenshotSchedule` for runs without one.
    pub fn new(config: AdaptiveLoopConfig, deps: StrategyDeps) -> Result<Self, QaError> {
        let reasoning = deps
            .reasoning
            .clone()
            .ok_or_else(|| QaError::invalid_input("adaptive loop requires a reasoning service"))?;
        Ok(Self {
            config,
            deps,
            reasoning,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &AdaptiveLoopConfig {
        &self.config
    }

    /// Activate the start control through `bootstrap`, then iterate.
    pub async fn run(
        &self,
        bootstrap: &StrategyOrchestrator,
        start: &ResolveContext,
    ) -> AdaptiveRunResult {
        let mut state = LoopState::new(&self.config);
        info!(
            run_id = %state.run_id,
            max_screenshots = state.budget.max_screenshots,
            max_actions = state.budget.max_actions,
            "Adaptive run starting"
        );

        let bootstrap_outcome = match bootstrap.resolve(start).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(run_id = %state.run_id, "Bootstrap aborted: {}", err);
                let outcome =
                    Outcome::from_error(NO_STRATEGY, 0, state.started.elapsed(), &err);
                return state.finish(
                    LoopStatus::Aborted,
                    TerminationReason::Aborted,
                    outcome,
                    Some(err.to_string()),
                );
            }
        };
        if !bootstrap_outcome.success {
            warn!(run_id = %state.run_id, "Start control not activated");
            let error = bootstrap_outcome.error_message.clone();
            return state.finish(
                LoopStatus::BootstrapFailed,
                TerminationReason::BootstrapFailed,
                bootstrap_outcome,
                error,
            );
        }

        // Model-backed strategies spent a screenshot and a reasoning call.
        if StrategyKind::from_name(&bootstrap_outcome.strategy_name)
            .is_some_and(|kind| kind.uses_reasoning())
        {
            state.budget.record_screenshot();
            state.budget.record_state_check();
            debug!(
                run_id = %state.run_id,
                spent_usd = state.budget.spent_estimate_usd,
                "Charged bootstrap observation"
            );
        }

        state.prior_actions.push(format!(
            "activated start control via {}",
            bootstrap_outcome.strategy_name
        ));
        state.transition(LoopPhase::Iterating);

        let mut index = 0u32;
        loop {
            if let Some(reason) = state.budget.termination() {
                return state.finish(LoopStatus::Completed, reason, bootstrap_outcome, None);
            }
            if self.config.failure_limit_reached(state.consecutive_failures) {
                warn!(
                    run_id = %state.run_id,
                    "Too many consecutive failures: {}", state.consecutive_failures
                );
                return state.finish(
                    LoopStatus::Completed,
                    TerminationReason::ConsecutiveFailures,
                    bootstrap_outcome,
                    None,
                );
            }

            index += 1;
            let cycle_started = Instant::now();
            let result = self
                .cycle(index, &mut state.budget, &mut state.prior_actions)
                .await;

            match result {
                Ok(record) => {
                    let completed = record
                        .executed
                        .as_ref()
                        .is_some_and(|p| p.action == gamecheck_core_types::ActionKind::Complete);
                    if record.success {
                        state.consecutive_failures = 0;
                    } else {
                        state.consecutive_failures += 1;
                    }
                    state.cycles.push(record);
                    if completed {
                        info!(run_id = %state.run_id, cycle = index, "Goal reported complete");
                        return state.finish(
                            LoopStatus::Completed,
                            TerminationReason::GoalCompleted,
                            bootstrap_outcome,
                            None,
                        );
                    }
                }
                Err(failure) => {
                    let err = failure.error;
                    let mut record = CycleRecord::failed(index, err.to_string());
                    record.screenshot = failure.screenshot;
                    record.duration_ms = cycle_started.elapsed().as_millis() as u64;
                    record.spent_estimate_usd = state.budget.spent_estimate_usd;
                    state.cycles.push(record);

                    if !err.is_recoverable() {
                        error!(run_id = %state.run_id, cycle = index, "Cycle aborted run: {}", err);
                        return state.finish(
                            LoopStatus::Aborted,
                            TerminationReason::Aborted,
                            bootstrap_outcome,
                            Some(err.to_string()),
                        );
                    }
                    warn!(
                        run_id = %state.run_id,
                        cycle = index,
                        category = err.category().name(),
                        "Cycle failed: {}",
                        err
                    );
                    state.consecutive_failures += 1;
                }
            }

            if self.config.wait_between_actions_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.wait_between_actions_ms))
                    .await;
            }
        }
    }

    /// One capture → recommend → execute cycle.
    async fn cycle(
        &self,
        index: u32,
        budget: &mut BudgetState,
        prior_actions: &mut Vec<String>,
    ) -> Result<CycleRecord, CycleFailure> {
        let started = Instant::now();
        let action_timeout = self.config.action_timeout();
        let driver = self.deps.driver.as_ref();

        let label = format!("cycle-{index:03}");
        let screenshot = bounded("screenshot", action_timeout, self.deps.capture(&label)).await?;
        budget.record_screenshot();
        let evidence = |error: QaError| CycleFailure {
            error,
            screenshot: screenshot.path.clone(),
        };

        let html = bounded("page html", action_timeout, driver.page_html())
            .await
            .map_err(evidence)?;
        let request = RecommendationRequest {
            html: sanitize_html(&html, self.config.max_html_chars),
            screenshot: screenshot.clone(),
            prior_actions: prior_actions.clone(),
            goal: self.config.goal.clone(),
        };

        budget.record_state_check();
        let recommendation = bounded(
            "recommendation",
            self.config.reasoning_timeout(),
            self.reasoning.recommend_action(&request),
        )
        .await
        .map_err(evidence)?;
        debug!(
            cycle = index,
            confidence = recommendation.primary.confidence,
            "Recommended: {}",
            recommendation.primary.describe()
        );

        let run = execute_recommendation(driver, &recommendation, action_timeout).await;
        if run.attempts > 0 && !run.completed {
            budget.record_action();
        }
        if let Some(err) = run.last_error.as_ref().filter(|err| !err.is_recoverable()) {
            return Err(evidence(err.clone()));
        }

        prior_actions.push(match &run.executed {
            Some(proposal) => proposal.describe(),
            None => format!("failed: {}", recommendation.primary.describe()),
        });

        Ok(CycleRecord {
            index,
            success: run.success,
            attempts: run.attempts,
            executed: run.executed,
            error: run.last_error.map(|err| err.to_string()),
            recommendation: Some(recommendation),
            screenshot: screenshot.path,
            duration_ms: started.elapsed().as_millis() as u64,
            spent_estimate_usd: budget.spent_estimate_usd,
        })
    }
}

async fn bounded<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, QaError>
where
    F: Future<Output = Result<T, QaError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| QaError::timeout(operation, limit))?
}
