//! Fixed-schedule capture, used when no reasoning service is configured.

use std::path::PathBuf;
use std::time::Duration;

use action_strategies::StrategyDeps;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::budget::distribute_screenshots;
use crate::config::AdaptiveLoopConfig;

/// One planned capture and what came of it.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledCapture {
    pub offset_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduledCapture {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Capture offsets relative to the start of the observation window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotSchedule {
    offsets_ms: Vec<u64>,
}

impl ScreenshotSchedule {
    pub fn new(total_duration_ms: u64, count: u32) -> Self {
        Self {
            offsets_ms: distribute_screenshots(total_duration_ms, count),
        }
    }

    /// Schedule sized by the config's budget and duration.
    pub fn for_config(config: &AdaptiveLoopConfig) -> Self {
        Self::new(config.max_duration_ms, config.max_screenshots())
    }

    pub fn from_offsets(mut offsets_ms: Vec<u64>) -> Self {
        offsets_ms.sort_unstable();
        Self { offsets_ms }
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets_ms
    }

    pub fn len(&self) -> usize {
        self.offsets_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets_ms.is_empty()
    }

    /// Sleep to each offset and capture. A failed capture is recorded and
    /// the schedule moves on.
    pub async fn capture(&self, deps: &StrategyDeps) -> Vec<ScheduledCapture> {
        let start = Instant::now();
        let mut captures = Vec::with_capacity(self.offsets_ms.len());

        for (index, offset) in self.offsets_ms.iter().copied().enumerate() {
            tokio::time::sleep_until(start + Duration::from_millis(offset)).await;
            let label = format!("scheduled-{index:02}-{offset}ms");
            match deps.capture(&label).await {
                Ok(screenshot) => {
                    debug!(offset, "Captured scheduled screenshot");
                    captures.push(ScheduledCapture {
                        offset_ms: offset,
                        path: screenshot.path,
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(offset, "Scheduled capture failed: {}", err);
                    captures.push(ScheduledCapture {
                        offset_ms: offset,
                        path: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        captures
    }
}
