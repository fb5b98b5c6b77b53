//! Strategy orchestrator with first-success fallback chain

use std::sync::Arc;
use std::time::{Duration, Instant};

use gamecheck_core_types::{Outcome, QaError};
use tracing::{debug, error, info, warn};

use crate::config::{StrategyConfig, StrategyKind, StrategyToggles};
use crate::context::ResolveContext;
use crate::ports::StrategyDeps;
use crate::strategies::*;

const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered, pre-filtered list of strategies tried until one succeeds.
pub struct StrategyOrchestrator {
    strategies: Vec<Arc<dyn Strategy>>,
    timeout: Duration,
}

impl StrategyOrchestrator {
    /// Keep the strategies that are both enabled and available, in the
    /// order given. Availability is evaluated here, once.
    pub fn new(candidates: Vec<Arc<dyn Strategy>>, toggles: StrategyToggles) -> Self {
        let strategies: Vec<Arc<dyn Strategy>> = candidates
            .into_iter()
            .filter(|strategy| {
                let enabled = toggles.is_enabled(strategy.kind());
                let available = enabled && strategy.is_available();
                if !available {
                    debug!(
                        "Skipping strategy {} (enabled: {}, available: {})",
                        strategy.name(),
                        enabled,
                        available
                    );
                }
                available
            })
            .collect();

        Self {
            strategies,
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// All four start-control strategies bound to one request's
    /// dependencies, cheapest first.
    pub fn start_control(deps: StrategyDeps, config: &StrategyConfig) -> Self {
        let candidates: Vec<Arc<dyn Strategy>> = StrategyKind::priority_chain()
            .into_iter()
            .map(|kind| -> Arc<dyn Strategy> {
                match kind {
                    StrategyKind::StructuralSelector => {
                        Arc::new(StructuralSelectorStrategy::new(deps.driver.clone(), config))
                    }
                    StrategyKind::NaturalLanguage => {
                        Arc::new(NaturalLanguageStrategy::new(deps.driver.clone(), config))
                    }
                    StrategyKind::VisionCandidate => {
                        Arc::new(VisionCandidateStrategy::new(deps.clone(), config))
                    }
                    StrategyKind::StateRecommendation => {
                        Arc::new(StateRecommendationStrategy::new(deps.clone(), config))
                    }
                }
            })
            .collect();
        Self::new(candidates, config.toggles)
            .with_timeout(Duration::from_millis(config.resolve_timeout_ms))
    }

    /// Builder: set the ceiling shared by every strategy in one `resolve`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Names of the strategies that survived filtering, in order.
    pub fn strategies(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each strategy in order and return the first success.
    ///
    /// Failed outcomes and recoverable errors fall through to the next
    /// strategy. A non-recoverable error aborts resolution.
    pub async fn resolve(&self, ctx: &ResolveContext) -> Result<Outcome, QaError> {
        info!(
            "Resolving '{}' with {} strategies",
            ctx.goal,
            self.strategies.len()
        );
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut tried = 0u32;

        for strategy in &self.strategies {
            let Some(budget) = remaining(deadline) else {
                warn!(
                    "Resolve deadline of {}ms spent after {} strategies",
                    self.timeout.as_millis(),
                    tried
                );
                break;
            };

            tried += 1;
            debug!("Trying strategy: {}", strategy.name());

            let result = within(strategy.name(), budget, strategy.execute(ctx, budget)).await;
            match result {
                Ok(outcome) if outcome.success => {
                    info!(
                        "Resolved using {} strategy ({} attempts, {}ms)",
                        outcome.strategy_name, outcome.attempts, outcome.duration_ms
                    );
                    return Ok(outcome);
                }
                Ok(outcome) => {
                    debug!(
                        "Strategy {} did not succeed: {}",
                        strategy.name(),
                        outcome.error_message.as_deref().unwrap_or("no detail")
                    );
                }
                Err(err) if err.is_recoverable() => {
                    warn!(
                        category = err.category().name(),
                        "Strategy {} failed: {}",
                        strategy.name(),
                        err
                    );
                }
                Err(err) => {
                    error!(
                        category = err.category().name(),
                        "Strategy {} hit a non-recoverable error: {}",
                        strategy.name(),
                        err
                    );
                    return Err(err);
                }
            }
        }

        warn!("All strategies exhausted after {} tried", tried);
        Ok(Outcome::exhausted(tried, started.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SelectorSpec;
    use crate::testing::{FakeElement, ScriptedDriver, ScriptedReasoner, ScriptedStrategy};
    use gamecheck_core_types::{Candidate, NO_STRATEGY};
    use std::sync::Mutex;

    fn shared_log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let log = shared_log();
        let first = Arc::new(ScriptedStrategy::failing("first").logging_to(log.clone()));
        let second = Arc::new(ScriptedStrategy::succeeding("second").logging_to(log.clone()));
        let third = Arc::new(ScriptedStrategy::succeeding("third").logging_to(log.clone()));
        let orchestrator = StrategyOrchestrator::new(
            vec![first.clone(), second.clone(), third.clone()],
            StrategyToggles::default(),
        );

        let outcome = orchestrator.resolve(&ResolveContext::default()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.strategy_name, "second");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(third.invocations(), 0);
    }

    #[tokio::test]
    async fn test_timeout_error_continues_to_next_strategy() {
        let slow = Arc::new(ScriptedStrategy::erroring(
            "slow",
            QaError::timeout("click", Duration::from_millis(10)),
        ));
        let next = Arc::new(ScriptedStrategy::succeeding("next"));
        let orchestrator =
            StrategyOrchestrator::new(vec![slow.clone(), next.clone()], StrategyToggles::default());

        let outcome = orchestrator.resolve(&ResolveContext::default()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.strategy_name, "next");
        assert_eq!(slow.invocations(), 1);
        assert_eq!(next.invocations(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_strategies_tried() {
        let orchestrator = StrategyOrchestrator::new(
            vec![
                Arc::new(ScriptedStrategy::failing("a")),
                Arc::new(ScriptedStrategy::erroring("b", QaError::element("missing"))),
                Arc::new(ScriptedStrategy::failing("c")),
            ],
            StrategyToggles::default(),
        );

        let outcome = orchestrator.resolve(&ResolveContext::default()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.strategy_name, NO_STRATEGY);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.error_message.as_deref(), Some("All strategies exhausted"));
    }

    #[tokio::test]
    async fn test_filters_disabled_and_unavailable() {
        let vision = Arc::new(
            ScriptedStrategy::succeeding("vision").of_kind(StrategyKind::VisionCandidate),
        );
        let orchestrator = StrategyOrchestrator::new(
            vec![
                Arc::new(ScriptedStrategy::failing("structural")),
                Arc::new(
                    ScriptedStrategy::succeeding("nl")
                        .of_kind(StrategyKind::NaturalLanguage)
                        .unavailable(),
                ),
                vision.clone(),
                Arc::new(
                    ScriptedStrategy::succeeding("recommend")
                        .of_kind(StrategyKind::StateRecommendation),
                ),
            ],
            StrategyToggles::deterministic_only(),
        );

        assert_eq!(orchestrator.strategies(), vec!["structural"]);
        let outcome = orchestrator.resolve(&ResolveContext::default()).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(vision.invocations(), 0);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_aborts() {
        let after = Arc::new(ScriptedStrategy::succeeding("after"));
        let orchestrator = StrategyOrchestrator::new(
            vec![
                Arc::new(ScriptedStrategy::erroring(
                    "broken",
                    QaError::Navigation("net::ERR_NAME_NOT_RESOLVED".into()),
                )),
                after.clone(),
            ],
            StrategyToggles::default(),
        );

        let result = orchestrator.resolve(&ResolveContext::default()).await;
        assert!(matches!(result, Err(QaError::Navigation(_))));
        assert_eq!(after.invocations(), 0);
    }

    #[tokio::test]
    async fn test_shared_deadline_starves_later_strategies() {
        let slow = Arc::new(ScriptedStrategy::failing("slow").delayed(Duration::from_millis(200)));
        let later = Arc::new(ScriptedStrategy::succeeding("later"));
        let orchestrator =
            StrategyOrchestrator::new(vec![slow.clone(), later.clone()], StrategyToggles::default())
                .with_timeout(Duration::from_millis(30));

        let outcome = orchestrator.resolve(&ResolveContext::default()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(later.invocations(), 0);
    }

    #[tokio::test]
    async fn test_start_control_falls_back_to_vision() {
        let driver = Arc::new(
            ScriptedDriver::new().with_element(SelectorSpec::text("Play"), FakeElement::hidden()),
        );
        let reasoner = Arc::new(
            ScriptedReasoner::new()
                .with_candidates(vec![Candidate::new("Start Game", 100.0, 200.0, 0.9)]),
        );
        let deps = StrategyDeps::new(driver).with_reasoning(reasoner);
        let orchestrator = StrategyOrchestrator::start_control(deps, &StrategyConfig::minimal());

        assert_eq!(
            orchestrator.strategies(),
            vec![
                "structural-selector",
                "natural-language",
                "vision-candidate",
                "state-recommendation"
            ]
        );
        let outcome = orchestrator
            .resolve(&ResolveContext::new("start"))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.strategy_name, "vision-candidate");
    }

    #[test]
    fn test_start_control_without_reasoning_is_deterministic() {
        let deps = StrategyDeps::new(Arc::new(ScriptedDriver::new()));
        let orchestrator = StrategyOrchestrator::start_control(deps, &StrategyConfig::minimal());
        assert_eq!(
            orchestrator.strategies(),
            vec!["structural-selector", "natural-language"]
        );
    }

    #[test]
    fn test_start_control_follows_priority_chain() {
        let deps = StrategyDeps::new(Arc::new(ScriptedDriver::new()))
            .with_reasoning(Arc::new(ScriptedReasoner::new()));
        let orchestrator = StrategyOrchestrator::start_control(deps, &StrategyConfig::minimal());
        let expected: Vec<&str> = StrategyKind::priority_chain()
            .iter()
            .map(|kind| kind.name())
            .collect();
        assert_eq!(orchestrator.strategies(), expected);
    }
}
