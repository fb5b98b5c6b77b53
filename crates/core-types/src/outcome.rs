//! Uniform result record produced by every strategy and by the orchestrator

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ErrorCategory, Point, QaError};

/// Name reported when the orchestrator exhausts every strategy.
pub const NO_STRATEGY: &str = "none";

/// Success/failure record for one resolution attempt.
///
/// `attempts` and `duration_ms` are always populated; `coordinates` only
/// accompanies a successful point-target action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub strategy_name: String,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
}

impl Outcome {
    pub fn succeeded(strategy_name: impl Into<String>, attempts: u32, elapsed: Duration) -> Self {
        Self {
            success: true,
            strategy_name: strategy_name.into(),
            attempts,
            duration_ms: elapsed.as_millis() as u64,
            coordinates: None,
            error_message: None,
            error_category: None,
        }
    }

    pub fn failed(
        strategy_name: impl Into<String>,
        attempts: u32,
        elapsed: Duration,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            strategy_name: strategy_name.into(),
            attempts,
            duration_ms: elapsed.as_millis() as u64,
            coordinates: None,
            error_message: Some(message.into()),
            error_category: None,
        }
    }

    /// Failed outcome carrying the classification of the error that caused it.
    pub fn from_error(
        strategy_name: impl Into<String>,
        attempts: u32,
        elapsed: Duration,
        error: &QaError,
    ) -> Self {
        Self::failed(strategy_name, attempts, elapsed, error.to_string())
            .with_category(error.category())
    }

    /// Synthetic result when no strategy succeeded.
    pub fn exhausted(strategies_tried: u32, elapsed: Duration) -> Self {
        Self::failed(
            NO_STRATEGY,
            strategies_tried,
            elapsed,
            "All strategies exhausted",
        )
    }

    pub fn with_coordinates(mut self, point: Point) -> Self {
        if self.success {
            self.coordinates = Some(point);
        }
        self
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.error_category = Some(category);
        self
    }
}
