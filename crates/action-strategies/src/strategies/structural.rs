//! Structural-selector strategy: DOM lookups tried most specific first.
//!
//! A selector only counts when its element turns visible within the probe
//! timeout. The first successful click ends the search.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamecheck_core_types::{Outcome, QaError};
use tracing::{debug, info, warn};

use super::{remaining, within, Strategy};
use crate::config::{SelectorRule, StrategyConfig, StrategyKind};
use crate::context::ResolveContext;
use crate::ports::{BrowserDriver, ElementHandle};

/// Tiered selector lookup: exact id, attribute substring, then text content.
pub struct StructuralSelectorStrategy {
    driver: Arc<dyn BrowserDriver>,
    selectors: Vec<SelectorRule>,
    visibility_timeout: Duration,
}

impl StructuralSelectorStrategy {
    /// Create a new structural strategy with the config's selectors,
    /// most specific first.
    pub fn new(driver: Arc<dyn BrowserDriver>, config: &StrategyConfig) -> Self {
        Self {
            driver,
            selectors: config.ordered_selectors(),
            visibility_timeout: Duration::from_millis(config.visibility_timeout_ms),
        }
    }

    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    /// Locate and visibility-check one selector.
    async fn visible_element(
        &self,
        rule: &SelectorRule,
        budget: Duration,
    ) -> Result<Option<Box<dyn ElementHandle>>, QaError> {
        let Some(element) = within("locate", budget, self.driver.locate(&rule.selector)).await?
        else {
            return Ok(None);
        };
        let probe = self.visibility_timeout.min(budget);
        let visible = within("visibility check", probe, element.is_visible(probe)).await?;
        Ok(visible.then_some(element))
    }
}

#[async_trait]
impl Strategy for StructuralSelectorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuralSelector
    }

    fn is_available(&self) -> bool {
        !self.selectors.is_empty()
    }

    async fn execute(&self, _ctx: &ResolveContext, timeout: Duration) -> Result<Outcome, QaError> {
        let started = Instant::now();
        let deadline = started + timeout;

        for (index, rule) in self.selectors.iter().enumerate() {
            let Some(budget) = remaining(deadline) else {
                let err = QaError::timeout("structural selector search", timeout);
                return super::absorb(self.name(), index as u32, started, err);
            };

            let element = match self.visible_element(rule, budget).await {
                Ok(Some(element)) => element,
                Ok(None) => {
                    debug!("Selector {} not visible", rule.selector);
                    continue;
                }
                Err(err) if err.is_recoverable() => {
                    debug!("Selector {} lookup failed: {}", rule.selector, err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let budget = remaining(deadline).unwrap_or(Duration::ZERO);
            match within("click", budget, element.click()).await {
                Ok(()) => {
                    let attempts = index as u32 + 1;
                    let mut outcome = Outcome::succeeded(self.name(), attempts, started.elapsed());
                    // Coordinates are telemetry only.
                    match within("bounding box", self.visibility_timeout, element.bounding_box())
                        .await
                    {
                        Ok(Some(bounds)) => outcome = outcome.with_coordinates(bounds.center()),
                        Ok(None) => {}
                        Err(err) => debug!("Bounding box unavailable for {}: {}", rule.selector, err),
                    }
                    info!(
                        strategy = self.name(),
                        attempts, "Clicked start control via {}", rule.selector
                    );
                    return Ok(outcome);
                }
                Err(err) if err.is_recoverable() => {
                    warn!("Click on {} failed: {}", rule.selector, err);
                }
                Err(err) => return Err(err),
            }
        }

        Ok(Outcome::failed(
            self.name(),
            self.selectors.len() as u32,
            started.elapsed(),
            "No selectors matched",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SelectorSpec;
    use crate::testing::{DriverCall, FakeElement, ScriptedDriver};
    use gamecheck_core_types::Point;

    fn config() -> StrategyConfig {
        StrategyConfig::minimal().selectors(vec![
            SelectorRule::text("Play"),
            SelectorRule::exact_id("start"),
            SelectorRule::attribute("class", "start"),
        ])
    }

    fn strategy(driver: ScriptedDriver) -> (Arc<ScriptedDriver>, StructuralSelectorStrategy) {
        let driver = Arc::new(driver);
        let strategy = StructuralSelectorStrategy::new(driver.clone(), &config());
        (driver, strategy)
    }

    #[tokio::test]
    async fn test_most_specific_visible_selector_wins() {
        let (driver, strategy) = strategy(
            ScriptedDriver::new()
                .with_element(SelectorSpec::css("#start"), FakeElement::hidden())
                .with_element(
                    SelectorSpec::css("[class*=\"start\" i]"),
                    FakeElement::visible().with_box(10.0, 20.0, 100.0, 40.0),
                )
                .with_element(SelectorSpec::text("Play"), FakeElement::visible()),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.strategy_name, "structural-selector");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.coordinates, Some(Point::new(60.0, 40.0)));
        assert_eq!(driver.count(|c| matches!(c, DriverCall::ClickElement(_))), 1);
        assert!(!driver
            .calls()
            .contains(&DriverCall::Locate(SelectorSpec::text("Play"))));
    }

    #[tokio::test]
    async fn test_all_invisible_exhausts_selectors() {
        let (driver, strategy) = strategy(
            ScriptedDriver::new()
                .with_element(SelectorSpec::css("#start"), FakeElement::hidden())
                .with_element(SelectorSpec::text("Play"), FakeElement::hidden()),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, strategy.selector_count() as u32);
        assert_eq!(outcome.error_message.as_deref(), Some("No selectors matched"));
        assert!(outcome.coordinates.is_none());
        assert_eq!(driver.count(|c| matches!(c, DriverCall::ClickElement(_))), 0);
    }

    #[tokio::test]
    async fn test_click_failure_falls_through() {
        let (driver, strategy) = strategy(
            ScriptedDriver::new()
                .with_element(
                    SelectorSpec::css("#start"),
                    FakeElement::visible().failing_click(QaError::action("intercepted")),
                )
                .with_element(SelectorSpec::text("Play"), FakeElement::visible()),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(driver.count(|c| matches!(c, DriverCall::ClickElement(_))), 2);
    }

    #[tokio::test]
    async fn test_bounding_box_failure_keeps_success() {
        let (_driver, strategy) = strategy(ScriptedDriver::new().with_element(
            SelectorSpec::css("#start"),
            FakeElement::visible().with_broken_box(),
        ));

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.coordinates.is_none());
    }

    #[tokio::test]
    async fn test_recoverable_lookup_error_is_skipped() {
        let (_driver, strategy) = strategy(
            ScriptedDriver::new()
                .with_locate_error(SelectorSpec::css("#start"), QaError::element("bad selector"))
                .with_element(SelectorSpec::text("Play"), FakeElement::visible()),
        );

        let outcome = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_non_recoverable_error_propagates() {
        let (_driver, strategy) = strategy(ScriptedDriver::new().with_locate_error(
            SelectorSpec::css("#start"),
            QaError::BrowserInit("target closed".into()),
        ));

        let result = strategy
            .execute(&ResolveContext::default(), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(QaError::BrowserInit(_))));
    }

    #[test]
    fn test_empty_selector_list_is_unavailable() {
        let driver = Arc::new(ScriptedDriver::new());
        let strategy =
            StructuralSelectorStrategy::new(driver, &StrategyConfig::minimal().selectors(vec![]));
        assert!(!strategy.is_available());
    }
}
