use std::path::{Path, PathBuf};

use agent_loop::{AdaptiveRunResult, ScheduledCapture};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gamecheck_core_types::Outcome;
use serde::Serialize;
use tokio::fs;

use crate::artifacts::ArtifactEntry;
use crate::scoring::PlayabilityScore;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Adaptive,
    FixedSchedule,
}

/// Everything a run produced, as written to `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub tool_version: &'static str,
    pub git_hash: &'static str,
    pub url: String,
    pub goal: String,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub score: PlayabilityScore,
    pub bootstrap: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adaptive: Option<AdaptiveRunResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Vec<ScheduledCapture>>,
    pub artifacts: Vec<ArtifactEntry>,
}

impl RunReport {
    pub fn new(
        url: impl Into<String>,
        goal: impl Into<String>,
        mode: RunMode,
        started_at: DateTime<Utc>,
        score: PlayabilityScore,
        bootstrap: Outcome,
    ) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION"),
            git_hash: env!("GIT_HASH"),
            url: url.into(),
            goal: goal.into(),
            mode,
            started_at,
            finished_at: Utc::now(),
            score,
            bootstrap,
            adaptive: None,
            schedule: None,
            artifacts: Vec::new(),
        }
    }

    pub fn with_adaptive(mut self, result: AdaptiveRunResult) -> Self {
        self.adaptive = Some(result);
        self
    }

    pub fn with_schedule(mut self, captures: Vec<ScheduledCapture>) -> Self {
        self.schedule = Some(captures);
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactEntry>) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Write pretty JSON to `<dir>/report.json`.
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self).context("serializing report")?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}
