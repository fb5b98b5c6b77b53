//! State-recommendation strategy.
//!
//! Sends sanitized page HTML, a screenshot and the goal to the reasoning
//! service, then runs the returned proposal and its alternatives through
//! [`execute_recommendation`](crate::execution::execute_recommendation).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use gamecheck_core_types::{Outcome, QaError};
use tracing::info;

use super::{absorb, remaining, within, Strategy};
use crate::config::{StrategyConfig, StrategyKind};
use crate::context::ResolveContext;
use crate::execution::execute_recommendation;
use crate::html::sanitize_html;
use crate::ports::{RecommendationRequest, StrategyDeps};

/// Ask the reasoning service what to do next and execute it, falling
/// through the proposed alternatives.
pub struct StateRecommendationStrategy {
    deps: StrategyDeps,
    goal: String,
    max_html_chars: usize,
}

impl StateRecommendationStrategy {
    pub fn new(deps: StrategyDeps, config: &StrategyConfig) -> Self {
        Self {
            deps,
            goal: config.goal.clone(),
            max_html_chars: config.max_html_chars,
        }
    }

    async fn build_request(
        &self,
        ctx: &ResolveContext,
        deadline: Instant,
    ) -> Result<RecommendationRequest, QaError> {
        let html = match &ctx.html {
            Some(html) => html.clone(),
            None => {
                let budget = remaining(deadline).unwrap_or(Duration::ZERO);
                within("page html", budget, self.deps.driver.page_html()).await?
            }
        };
        let screenshot = match &ctx.screenshot {
            Some(shot) => shot.clone(),
            None => {
                let budget = remaining(deadline).unwrap_or(Duration::ZERO);
                within("screenshot", budget, self.deps.capture("state-check")).await?
            }
        };
        let goal = if ctx.goal.trim().is_empty() {
            self.goal.clone()
        } else {
            ctx.goal.clone()
        };

        Ok(RecommendationRequest {
            html: sanitize_html(&html, self.max_html_chars),
            screenshot,
            prior_actions: ctx.prior_actions.clone(),
            goal,
        })
    }
}

#[async_trait]
impl Strategy for StateRecommendationStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StateRecommendation
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

        let request = match self.build_request(ctx, deadline).await {
            Ok(request) => request,
            Err(err) => return absorb(self.name(), 0, started, err),
        };

        let budget = remaining(deadline).unwrap_or(Duration::ZERO);
        let recommendation =
            match within("recommendation", budget, reasoning.recommend_action(&request)).await {
                Ok(recommendation) => recommendation,
                Err(err) => return absorb(self.name(), 0, started, err),
            };
        info!(
            strategy = self.name(),
            confidence = recommendation.primary.confidence,
            alternatives = recommendation.alternatives.len(),
            "Recommended: {}",
            recommendation.primary.describe()
        );

        let budget = remaining(deadline).unwrap_or(Duration::ZERO);
        let run = execute_recommendation(self.deps.driver.as_ref(), &recommendation, budget).await;
        if let Some(err) = run.last_error.as_ref().filter(|err| !err.is_recoverable()) {
            return Err(err.clone());
        }
        Ok(run.to_outcome(self.name(), started.elapsed()))
    }
}
