//! Scripted collaborators for unit and downstream tests
//!
//! Every fake records the calls it receives so tests can assert on ordering
//! and on the absence of side effects.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gamecheck_core_types::{BoundingBox, Candidate, Outcome, QaError, Recommendation};
use serde_json::Value;

use crate::config::StrategyKind;
use crate::context::ResolveContext;
use crate::ports::{
    ArtifactStore, BrowserDriver, ElementHandle, ReasoningService, RecommendationRequest,
    Screenshot, SelectorSpec,
};
use crate::strategies::Strategy;

/// One observed driver interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Locate(SelectorSpec),
    ClickElement(SelectorSpec),
    ClickAt(f64, f64),
    PressKey(String),
    Instruction(String),
    Screenshot,
    Evaluate(String),
}

/// Scripted behavior of a located element.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub visible: bool,
    pub click_error: Option<QaError>,
    pub bounding_box: Option<BoundingBox>,
    pub broken_bounding_box: bool,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn failing_click(mut self, error: QaError) -> Self {
        self.click_error = Some(error);
        self
    }

    pub fn with_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox {
            x,
            y,
            width,
            height,
        });
        self
    }

    pub fn with_broken_box(mut self) -> Self {
        self.broken_bounding_box = true;
        self
    }
}

struct ScriptedElement {
    selector: SelectorSpec,
    spec: FakeElement,
    calls: Arc<Mutex<Vec<DriverCall>>>,
}

#[async_trait]
impl ElementHandle for ScriptedElement {
    async fn is_visible(&self, _timeout: Duration) -> Result<bool, QaError> {
        Ok(self.spec.visible)
    }

    async fn click(&self) -> Result<(), QaError> {
        record(&self.calls, DriverCall::ClickElement(self.selector.clone()));
        match &self.spec.click_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, QaError> {
        if self.spec.broken_bounding_box {
            return Err(QaError::element("element detached"));
        }
        Ok(self.spec.bounding_box)
    }
}

/// Browser driver whose page is a fixed script.
#[derive(Default)]
pub struct ScriptedDriver {
    elements: Vec<(SelectorSpec, FakeElement)>,
    locate_errors: Vec<(SelectorSpec, QaError)>,
    instructions: bool,
    rejected_instructions: HashSet<String>,
    fail_click_at: bool,
    fail_press_key: bool,
    click_delay: Option<Duration>,
    screenshot_error: Option<QaError>,
    html: String,
    calls: Arc<Mutex<Vec<DriverCall>>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            html: "<html><body></body></html>".to_string(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, selector: SelectorSpec, element: FakeElement) -> Self {
        self.elements.push((selector, element));
        self
    }

    pub fn with_locate_error(mut self, selector: SelectorSpec, error: QaError) -> Self {
        self.locate_errors.push((selector, error));
        self
    }

    /// Advertise the instruction capability.
    pub fn with_instructions(mut self) -> Self {
        self.instructions = true;
        self
    }

    pub fn reject_instruction(mut self, phrase: &str) -> Self {
        self.rejected_instructions.insert(phrase.to_string());
        self
    }

    pub fn fail_click_at(mut self) -> Self {
        self.fail_click_at = true;
        self
    }

    pub fn fail_press_key(mut self) -> Self {
        self.fail_press_key = true;
        self
    }

    pub fn click_delay(mut self, delay: Duration) -> Self {
        self.click_delay = Some(delay);
        self
    }

    pub fn fail_screenshot(mut self, error: QaError) -> Self {
        self.screenshot_error = Some(error);
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = html.into();
        self
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, matches: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }
}

fn record(calls: &Arc<Mutex<Vec<DriverCall>>>, call: DriverCall) {
    calls.lock().expect("calls lock").push(call);
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn locate(
        &self,
        selector: &SelectorSpec,
    ) -> Result<Option<Box<dyn ElementHandle>>, QaError> {
        record(&self.calls, DriverCall::Locate(selector.clone()));
        if let Some((_, err)) = self.locate_errors.iter().find(|(s, _)| s == selector) {
            return Err(err.clone());
        }
        Ok(self
            .elements
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(s, spec)| {
                Box::new(ScriptedElement {
                    selector: s.clone(),
                    spec: spec.clone(),
                    calls: self.calls.clone(),
                }) as Box<dyn ElementHandle>
            }))
    }

    fn supports_instructions(&self) -> bool {
        self.instructions
    }

    async fn perform_instruction(&self, instruction: &str) -> Result<(), QaError> {
        record(&self.calls, DriverCall::Instruction(instruction.to_string()));
        if !self.instructions || self.rejected_instructions.contains(instruction) {
            return Err(QaError::action(format!("instruction rejected: {instruction}")));
        }
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), QaError> {
        if let Some(delay) = self.click_delay {
            tokio::time::sleep(delay).await;
        }
        record(&self.calls, DriverCall::ClickAt(x, y));
        if self.fail_click_at {
            return Err(QaError::action("click dispatch failed"));
        }
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), QaError> {
        record(&self.calls, DriverCall::PressKey(key.to_string()));
        if self.fail_press_key {
            return Err(QaError::action("key dispatch failed"));
        }
        Ok(())
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, QaError> {
        record(&self.calls, DriverCall::Screenshot);
        match &self.screenshot_error {
            Some(err) => Err(err.clone()),
            None => Ok(vec![0x89, b'P', b'N', b'G']),
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, QaError> {
        record(&self.calls, DriverCall::Evaluate(expression.to_string()));
        if expression.contains("outerHTML") {
            return Ok(Value::String(self.html.clone()));
        }
        Ok(Value::Null)
    }
}

/// Reasoning service replaying queued responses.
#[derive(Default)]
pub struct ScriptedReasoner {
    candidates: Mutex<VecDeque<Result<Vec<Candidate>, QaError>>>,
    recommendations: Mutex<VecDeque<Result<Recommendation, QaError>>>,
    fallback_recommendation: Option<Recommendation>,
    delay: Option<Duration>,
    detect_calls: AtomicUsize,
    requests: Mutex<Vec<RecommendationRequest>>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(self, candidates: Vec<Candidate>) -> Self {
        self.push_candidates(Ok(candidates));
        self
    }

    pub fn with_detection_error(self, error: QaError) -> Self {
        self.push_candidates(Err(error));
        self
    }

    pub fn with_recommendation(self, recommendation: Recommendation) -> Self {
        self.push_recommendation(Ok(recommendation));
        self
    }

    pub fn with_recommendation_error(self, error: QaError) -> Self {
        self.push_recommendation(Err(error));
        self
    }

    /// Returned once the queue is drained.
    pub fn repeating(mut self, recommendation: Recommendation) -> Self {
        self.fallback_recommendation = Some(recommendation);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_candidates(&self, result: Result<Vec<Candidate>, QaError>) {
        self.candidates.lock().expect("candidates lock").push_back(result);
    }

    pub fn push_recommendation(&self, result: Result<Recommendation, QaError>) {
        self.recommendations
            .lock()
            .expect("recommendations lock")
            .push_back(result);
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecommendationRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoner {
    async fn detect_candidates(&self, _screenshot: &Screenshot) -> Result<Vec<Candidate>, QaError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.candidates
            .lock()
            .expect("candidates lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn recommend_action(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Recommendation, QaError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let queued = self
            .recommendations
            .lock()
            .expect("recommendations lock")
            .pop_front();
        match (queued, &self.fallback_recommendation) {
            (Some(result), _) => result,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(QaError::reasoning("no scripted recommendation")),
        }
    }
}

/// Artifact store keeping labels in memory.
#[derive(Default)]
pub struct MemoryArtifactStore {
    saved: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.saved.lock().expect("saved lock").clone()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save_screenshot(&self, label: &str, _bytes: &[u8]) -> Result<PathBuf, QaError> {
        if self.fail {
            return Err(QaError::Unknown("disk full".to_string()));
        }
        self.saved.lock().expect("saved lock").push(label.to_string());
        Ok(PathBuf::from(format!("memory/{label}.png")))
    }
}

/// Strategy with a fixed answer that logs each invocation by name.
pub struct ScriptedStrategy {
    kind: StrategyKind,
    name: &'static str,
    available: bool,
    result: Result<Outcome, QaError>,
    delay: Option<Duration>,
    invocations: AtomicUsize,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedStrategy {
    pub fn succeeding(name: &'static str) -> Self {
        Self::with_result(name, Ok(Outcome::succeeded(name, 1, Duration::ZERO)))
    }

    pub fn failing(name: &'static str) -> Self {
        Self::with_result(
            name,
            Ok(Outcome::failed(name, 1, Duration::ZERO, "scripted failure")),
        )
    }

    pub fn erroring(name: &'static str, error: QaError) -> Self {
        Self::with_result(name, Err(error))
    }

    fn with_result(name: &'static str, result: Result<Outcome, QaError>) -> Self {
        Self {
            kind: StrategyKind::StructuralSelector,
            name,
            available: true,
            result,
            delay: None,
            invocations: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn of_kind(mut self, kind: StrategyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Share an invocation log across several strategies.
    pub fn logging_to(mut self, log: Arc<Mutex<Vec<&'static str>>>) -> Self {
        self.log = log;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Strategy for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn execute(&self, _ctx: &ResolveContext, _timeout: Duration) -> Result<Outcome, QaError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.log.lock().expect("log lock").push(self.name);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
