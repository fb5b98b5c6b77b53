//! Records exchanged with the vision/language reasoning service

use serde::{Deserialize, Serialize};

use crate::Point;

/// Labeled, confidence-scored point returned by vision detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl Candidate {
    pub fn new(label: impl Into<String>, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            confidence,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Case-insensitive substring match against any keyword.
    pub fn matches_keywords(&self, keywords: &[String]) -> bool {
        let label = self.label.to_lowercase();
        keywords
            .iter()
            .any(|keyword| label.contains(&keyword.to_lowercase()))
    }

    pub fn is_confident(&self, min_confidence: f64) -> bool {
        self.confidence >= min_confidence
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Keypress,
    Wait,
    Complete,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Keypress => "keypress",
            ActionKind::Wait => "wait",
            ActionKind::Complete => "complete",
        }
    }
}

/// What an action points at: a coordinate, a key name or a duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ActionTarget {
    Point(Point),
    DurationMs(u64),
    Key(String),
    #[default]
    None,
}

/// One proposed action. Alternatives are plain proposals, so they cannot
/// carry nested alternatives of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionProposal {
    pub action: ActionKind,
    #[serde(default)]
    pub target: ActionTarget,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub confidence: f64,
}

impl ActionProposal {
    pub fn new(action: ActionKind, target: ActionTarget) -> Self {
        Self {
            action,
            target,
            reasoning: String::new(),
            confidence: 0.0,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>, confidence: f64) -> Self {
        self.reasoning = reasoning.into();
        self.confidence = confidence;
        self
    }

    /// Short human-readable form used in prior-action history.
    pub fn describe(&self) -> String {
        match &self.target {
            ActionTarget::Point(p) => format!("{} at ({:.0}, {:.0})", self.action.name(), p.x, p.y),
            ActionTarget::Key(key) => format!("{} {}", self.action.name(), key),
            ActionTarget::DurationMs(ms) => format!("{} {}ms", self.action.name(), ms),
            ActionTarget::None => self.action.name().to_string(),
        }
    }
}

/// Next-action recommendation with ordered fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub primary: ActionProposal,
    #[serde(default)]
    pub alternatives: Vec<ActionProposal>,
}

impl Recommendation {
    pub fn new(primary: ActionProposal) -> Self {
        Self {
            primary,
            alternatives: Vec::new(),
        }
    }

    pub fn with_alternative(mut self, alternative: ActionProposal) -> Self {
        self.alternatives.push(alternative);
        self
    }

    /// Primary first, then alternatives in order.
    pub fn proposals(&self) -> impl Iterator<Item = &ActionProposal> {
        std::iter::once(&self.primary).chain(self.alternatives.iter())
    }
}
