//! Action resolution strategies
//!
//! Four strategies in fallback order:
//! 1. Structural - tiered DOM selectors
//! 2. Natural language - driver-executed instructions
//! 3. Vision - confidence-filtered candidate points
//! 4. Recommendation - reasoning-service next action with alternatives

mod instruction;
mod recommendation;
mod structural;
mod vision;

pub use instruction::NaturalLanguageStrategy;
pub use recommendation::StateRecommendationStrategy;
pub use structural::StructuralSelectorStrategy;
pub use vision::VisionCandidateStrategy;

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamecheck_core_types::{Outcome, QaError};
use tracing::warn;

use crate::config::StrategyKind;
use crate::context::ResolveContext;

/// Strategy trait for action resolution
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Get strategy category
    fn kind(&self) -> StrategyKind;

    /// Get strategy name
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Whether the strategy can run at all with its bound dependencies.
    /// Must not touch the page.
    fn is_available(&self) -> bool;

    /// Attempt the action within `timeout`.
    ///
    /// Recoverable failures come back as a failed `Outcome`; only
    /// non-recoverable errors are returned as `Err`.
    async fn execute(&self, ctx: &ResolveContext, timeout: Duration) -> Result<Outcome, QaError>;
}

/// Run `fut` under `limit`, mapping expiry to a timeout error.
pub(crate) async fn within<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T, QaError>
where
    F: Future<Output = Result<T, QaError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(QaError::timeout(operation, limit)),
    }
}

/// Convert a recoverable error into a failed outcome; pass the rest through.
pub(crate) fn absorb(
    strategy: &str,
    attempts: u32,
    started: Instant,
    err: QaError,
) -> Result<Outcome, QaError> {
    if !err.is_recoverable() {
        return Err(err);
    }
    warn!(
        strategy,
        category = err.category().name(),
        "Strategy attempt failed: {}",
        err
    );
    Ok(Outcome::from_error(strategy, attempts, started.elapsed(), &err))
}

/// Time left before `deadline`, or `None` once it has passed.
pub(crate) fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecheck_core_types::ErrorCategory;

    #[tokio::test]
    async fn within_maps_expiry_to_timeout() {
        let err = within("probe", Duration::from_millis(5), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, QaError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(err.to_string().starts_with("probe timed out"));
    }

    #[test]
    fn absorb_only_swallows_recoverable_errors() {
        let started = Instant::now();
        let outcome = absorb("vision-candidate", 1, started, QaError::element("gone")).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.error_category, Some(ErrorCategory::ElementDetection));

        let err = absorb("vision-candidate", 1, started, QaError::Navigation("404".into()));
        assert!(matches!(err, Err(QaError::Navigation(_))));
    }

    #[test]
    fn remaining_is_none_after_deadline() {
        assert!(remaining(Instant::now()).is_none());
        assert!(remaining(Instant::now() + Duration::from_secs(5)).is_some());
    }
}
