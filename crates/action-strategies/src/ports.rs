//! Collaborator contracts the engine depends on
//!
//! The browser automation library and the reasoning service are adapted to
//! these traits at the boundary, which keeps the strategies mockable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gamecheck_core_types::{BoundingBox, Candidate, QaError, Recommendation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Element lookup expression understood by every driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorSpec {
    /// Plain CSS selector
    Css(String),
    /// Case-insensitive visible text match
    Text(String),
}

impl SelectorSpec {
    pub fn css(selector: impl Into<String>) -> Self {
        SelectorSpec::Css(selector.into())
    }

    pub fn text(content: impl Into<String>) -> Self {
        SelectorSpec::Text(content.into())
    }
}

impl std::fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorSpec::Css(selector) => write!(f, "css={}", selector),
            SelectorSpec::Text(content) => write!(f, "text={}", content),
        }
    }
}

/// Handle to one located element.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn is_visible(&self, timeout: Duration) -> Result<bool, QaError>;

    async fn click(&self) -> Result<(), QaError>;

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, QaError>;
}

/// Minimal browser capability surface required by the strategies.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn locate(&self, selector: &SelectorSpec)
        -> Result<Option<Box<dyn ElementHandle>>, QaError>;

    /// Whether `perform_instruction` is backed by a real capability.
    fn supports_instructions(&self) -> bool {
        false
    }

    async fn perform_instruction(&self, instruction: &str) -> Result<(), QaError> {
        Err(QaError::action(format!(
            "instruction capability unavailable: {instruction}"
        )))
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), QaError>;

    async fn press_key(&self, key: &str) -> Result<(), QaError>;

    async fn capture_screenshot(&self) -> Result<Vec<u8>, QaError>;

    async fn evaluate(&self, expression: &str) -> Result<Value, QaError>;

    async fn page_html(&self) -> Result<String, QaError> {
        let value = self
            .evaluate("document.documentElement.outerHTML")
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| QaError::element("page HTML was not a string"))
    }
}

/// Captured viewport image plus where it was persisted, if anywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Screenshot {
    pub bytes: Vec<u8>,
    pub path: Option<PathBuf>,
}

impl Screenshot {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, path: None }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }
}

/// Input for one state-to-action recommendation.
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub html: String,
    pub screenshot: Screenshot,
    pub prior_actions: Vec<String>,
    pub goal: String,
}

/// Vision/language reasoning capability.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn detect_candidates(&self, screenshot: &Screenshot) -> Result<Vec<Candidate>, QaError>;

    async fn recommend_action(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, QaError>;
}

/// Persistence for screenshots; paths are opaque to the engine.
pub trait ArtifactStore: Send + Sync {
    fn save_screenshot(&self, label: &str, bytes: &[u8]) -> Result<PathBuf, QaError>;
}

/// Dependencies a strategy is bound to for one detection request.
#[derive(Clone)]
pub struct StrategyDeps {
    pub driver: Arc<dyn BrowserDriver>,
    pub reasoning: Option<Arc<dyn ReasoningService>>,
    pub artifacts: Option<Arc<dyn ArtifactStore>>,
}

impl StrategyDeps {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            reasoning: None,
            artifacts: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: Arc<dyn ReasoningService>) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactStore>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Capture a screenshot and persist it when a store is attached.
    /// A failing store only loses the path, never the capture.
    pub async fn capture(&self, label: &str) -> Result<Screenshot, QaError> {
        let bytes = self.driver.capture_screenshot().await?;
        let mut screenshot = Screenshot::new(bytes);
        if let Some(store) = &self.artifacts {
            match store.save_screenshot(label, &screenshot.bytes) {
                Ok(path) => screenshot.path = Some(path),
                Err(err) => tracing::warn!(label, %err, "failed to persist screenshot"),
            }
        }
        Ok(screenshot)
    }
}
