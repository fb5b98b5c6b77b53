//! Vision-candidate strategy.
//!
//! Asks the reasoning service for labeled points on a screenshot, keeps the
//! keyword matches at or above the confidence floor and clicks the best one.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamecheck_core_types::{Outcome, QaError};
use tracing::{debug, info};

use super::{absorb, remaining, within, Strategy};
use crate::config::{StrategyConfig, StrategyKind};
use crate::context::ResolveContext;
use crate::ports::StrategyDeps;
use crate::selector::select_candidate;

/// Click the most confident keyword-matching candidate the reasoning
/// service finds on a screenshot.
pub struct VisionCandidateStrategy {
    deps: StrategyDeps,
    keywords: Vec<String>,
    min_confidence: f64,
    settle_delay: Duration,
}

impl VisionCandidateStrategy {
    pub fn new(deps: StrategyDeps, config: &StrategyConfig) -> Self {
        Self {
            deps,
            keywords: config.keywords.clone(),
            min_confidence: config.min_confidence,
            settle_delay: Duration::from_millis(config.settle_delay_ms),
        }
    }
}

#[async_trait]
impl Strategy for VisionCandidateStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::VisionCandidate
    }

    fn is_available(&self) -> bool {
        self.deps.reasoning.is_some()
    }

    async fn execute(&self, ctx: &ResolveContext, timeout: Duration) -> Result<Outcome, QaError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let Some(reasoning) = self.deps.reasoning.as_ref() else {
            return Ok(Outcome::failed(
                self.name(),
                0,
                started.elapsed(),
                "Reasoning service not configured",
            ));
        };

        let screenshot = match &ctx.screenshot {
            Some(shot) => shot.clone(),
            None => {
                let budget = remaining(deadline).unwrap_or(Duration::ZERO);
                match within("screenshot", budget, self.deps.capture("start-detection")).await {
                    Ok(shot) => shot,
                    Err(err) => return absorb(self.name(), 0, started, err),
                }
            }
        };

        let budget = remaining(deadline).unwrap_or(Duration::ZERO);
        let candidates = match within(
            "candidate detection",
            budget,
            reasoning.detect_candidates(&screenshot),
        )
        .await
        {
            Ok(candidates) => candidates,
            Err(err) => return absorb(self.name(), 1, started, err),
        };

        if candidates.is_empty() {
            return Ok(Outcome::failed(
                self.name(),
                1,
                started.elapsed(),
                "No candidates detected",
            ));
        }

        let Some(best) = select_candidate(&candidates, &self.keywords, self.min_confidence) else {
            debug!(count = candidates.len(), "No candidate passed keyword/confidence filter");
            return Ok(Outcome::failed(
                self.name(),
                1,
                started.elapsed(),
                format!("{} candidates found, none high-confidence", candidates.len()),
            ));
        };

        let point = best.point().rounded();
        let budget = remaining(deadline).unwrap_or(Duration::ZERO);
        if let Err(err) = within("click", budget, self.deps.driver.click_at(point.x, point.y)).await
        {
            return absorb(self.name(), 1, started, err);
        }
        info!(
            strategy = self.name(),
            confidence = best.confidence,
            "Clicked candidate '{}' at ({}, {})",
            best.label,
            point.x,
            point.y
        );

        let settle = remaining(deadline).unwrap_or(Duration::ZERO).min(self.settle_delay);
        tokio::time::sleep(settle).await;
        Ok(Outcome::succeeded(self.name(), 1, started.elapsed()).with_coordinates(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Screenshot;
    use crate::testing::{DriverCall, MemoryArtifactStore, ScriptedDriver, ScriptedReasoner};
    use gamecheck_core_types::{Candidate, ErrorCategory, Point};
    use std::sync::Arc;

    fn strategy(
        driver: ScriptedDriver,
        reasoner: ScriptedReasoner,
    ) -> (Arc<ScriptedDriver>, Arc<ScriptedReasoner>, VisionCandidateStrategy) {
        let driver = Arc::new(driver);
        let reasoner = Arc::new(reasoner);
        let deps = StrategyDeps::new(driver.clone()).with_reasoning(reasoner.clone());
        let strategy = VisionCandidateStrategy::new(deps, &StrategyConfig::minimal());
        (driver, reasoner, strategy)
    }

    #[tokio::test]
    async fn test_clicks_rounded_best_candidate() {
        let (driver, _reasoner, strategy) = strategy(
            ScriptedDriver::new(),
            ScriptedReasoner::new().with_candidates(vec![
                Candidate::new("Settings", 10.0, 10.0, 0.9),
                Candidate::new("Start Game", 320.4, 240.6, 0.95),
                Candidate::new("Play", 50.0, 50.0, 0.8),
            ]),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.coordinates, Some(Point::new(320.0, 241.0)));
        assert_eq!(
            driver.calls(),
            vec![DriverCall::Screenshot, DriverCall::ClickAt(320.0, 241.0)]
        );
    }

    #[tokio::test]
    async fn test_zero_candidates_message() {
        let (_driver, _reasoner, strategy) =
            strategy(ScriptedDriver::new(), ScriptedReasoner::new().with_candidates(vec![]));

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("No candidates detected"));
    }

    #[tokio::test]
    async fn test_low_confidence_candidates_message() {
        let (driver, _reasoner, strategy) = strategy(
            ScriptedDriver::new(),
            ScriptedReasoner::new().with_candidates(vec![
                Candidate::new("Start", 1.0, 1.0, 0.5),
                Candidate::new("Play", 2.0, 2.0, 0.69),
                Candidate::new("Menu", 3.0, 3.0, 0.99),
            ]),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("3 candidates found, none high-confidence")
        );
        assert_eq!(driver.count(|c| matches!(c, DriverCall::ClickAt(..))), 0);
    }

    #[tokio::test]
    async fn test_reuses_supplied_screenshot() {
        let (driver, reasoner, strategy) = strategy(
            ScriptedDriver::new(),
            ScriptedReasoner::new().with_candidates(vec![Candidate::new("Play", 5.0, 5.0, 0.9)]),
        );
        let ctx = ResolveContext::default().with_screenshot(Screenshot::new(vec![1, 2, 3]));

        let outcome = strategy.execute(&ctx, Duration::from_secs(1)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(reasoner.detect_calls(), 1);
        assert_eq!(driver.count(|c| matches!(c, DriverCall::Screenshot)), 0);
    }

    #[tokio::test]
    async fn test_reasoning_error_becomes_failed_outcome() {
        let (_driver, _reasoner, strategy) = strategy(
            ScriptedDriver::new(),
            ScriptedReasoner::new().with_detection_error(QaError::reasoning("rate limited")),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_category, Some(ErrorCategory::ReasoningService));
    }

    #[tokio::test]
    async fn test_slow_detection_times_out() {
        let (_driver, _reasoner, strategy) = strategy(
            ScriptedDriver::new(),
            ScriptedReasoner::new().delay(Duration::from_millis(500)),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_millis(20))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Timeout));
    }

    #[tokio::test]
    async fn test_screenshot_is_persisted_when_store_attached() {
        let driver = Arc::new(ScriptedDriver::new());
        let reasoner = Arc::new(ScriptedReasoner::new());
        let store = Arc::new(MemoryArtifactStore::new());
        let deps = StrategyDeps::new(driver)
            .with_reasoning(reasoner)
            .with_artifacts(store.clone());
        let strategy = VisionCandidateStrategy::new(deps, &StrategyConfig::minimal());

        strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.labels(), vec!["start-detection".to_string()]);
    }

    #[tokio::test]
    async fn test_settle_delay_respects_deadline() {
        let driver = Arc::new(ScriptedDriver::new());
        let reasoner = Arc::new(
            ScriptedReasoner::new().with_candidates(vec![Candidate::new("Start", 5.0, 5.0, 0.9)]),
        );
        let deps = StrategyDeps::new(driver).with_reasoning(reasoner);
        let strategy =
            VisionCandidateStrategy::new(deps, &StrategyConfig::minimal().settle_delay(10_000));

        let started = Instant::now();
        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_slow_click_times_out() {
        let (driver, _reasoner, strategy) = strategy(
            ScriptedDriver::new().click_delay(Duration::from_millis(500)),
            ScriptedReasoner::new().with_candidates(vec![Candidate::new("Play", 5.0, 5.0, 0.9)]),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Timeout));
        assert_eq!(driver.count(|c| matches!(c, DriverCall::ClickAt(..))), 0);
    }

    #[test]
    fn test_unavailable_without_reasoning() {
        let deps = StrategyDeps::new(Arc::new(ScriptedDriver::new()));
        assert!(!VisionCandidateStrategy::new(deps, &StrategyConfig::minimal()).is_available());
    }
}
