//! Strategy kinds and tunable strategy configuration

use serde::{Deserialize, Serialize};

use crate::ports::SelectorSpec;

/// Strategy category enumeration
///
/// Declared in priority order: cheapest and most deterministic first,
/// most expensive and most uncertain last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Selector lookup against the DOM
    StructuralSelector,

    /// Imperative phrase executed by the driver
    NaturalLanguage,

    /// Vision-detected candidate points
    VisionCandidate,

    /// Reasoning-service next-action recommendation
    StateRecommendation,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::StructuralSelector => "structural-selector",
            StrategyKind::NaturalLanguage => "natural-language",
            StrategyKind::VisionCandidate => "vision-candidate",
            StrategyKind::StateRecommendation => "state-recommendation",
        }
    }

    /// All strategy kinds in priority order
    pub fn priority_chain() -> [StrategyKind; 4] {
        [
            StrategyKind::StructuralSelector,
            StrategyKind::NaturalLanguage,
            StrategyKind::VisionCandidate,
            StrategyKind::StateRecommendation,
        ]
    }

    /// Kind whose [`name`](Self::name) is `name`.
    pub fn from_name(name: &str) -> Option<StrategyKind> {
        Self::priority_chain().into_iter().find(|kind| kind.name() == name)
    }

    /// Spends a screenshot and a reasoning-service call per execution.
    pub fn uses_reasoning(&self) -> bool {
        matches!(
            self,
            StrategyKind::VisionCandidate | StrategyKind::StateRecommendation
        )
    }
}

/// Per-category enable flags, resolved once at orchestrator construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyToggles {
    pub structural: bool,
    pub natural_language: bool,
    pub vision: bool,
    pub recommendation: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            structural: true,
            natural_language: true,
            vision: true,
            recommendation: true,
        }
    }
}

impl StrategyToggles {
    pub fn is_enabled(&self, kind: StrategyKind) -> bool {
        match kind {
            StrategyKind::StructuralSelector => self.structural,
            StrategyKind::NaturalLanguage => self.natural_language,
            StrategyKind::VisionCandidate => self.vision,
            StrategyKind::StateRecommendation => self.recommendation,
        }
    }

    /// Only the deterministic, model-free techniques.
    pub fn deterministic_only() -> Self {
        Self {
            structural: true,
            natural_language: true,
            vision: false,
            recommendation: false,
        }
    }
}

/// Specificity tier of a structural selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorTier {
    ExactId,
    AttributeMatch,
    TextMatch,
}

/// Tier ranking; higher is tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierScores {
    pub exact_id: u8,
    pub attribute_match: u8,
    pub text_match: u8,
}

impl Default for TierScores {
    fn default() -> Self {
        Self {
            exact_id: 3,
            attribute_match: 2,
            text_match: 1,
        }
    }
}

impl TierScores {
    pub fn score(&self, tier: SelectorTier) -> u8 {
        match tier {
            SelectorTier::ExactId => self.exact_id,
            SelectorTier::AttributeMatch => self.attribute_match,
            SelectorTier::TextMatch => self.text_match,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRule {
    pub tier: SelectorTier,
    pub selector: SelectorSpec,
}

impl SelectorRule {
    pub fn exact_id(id: &str) -> Self {
        Self {
            tier: SelectorTier::ExactId,
            selector: SelectorSpec::css(format!("#{}", id)),
        }
    }

    /// Case-insensitive attribute substring selector.
    pub fn attribute(attribute: &str, needle: &str) -> Self {
        Self {
            tier: SelectorTier::AttributeMatch,
            selector: SelectorSpec::css(format!("[{}*=\"{}\" i]", attribute, needle)),
        }
    }

    pub fn text(content: &str) -> Self {
        Self {
            tier: SelectorTier::TextMatch,
            selector: SelectorSpec::text(content),
        }
    }
}

/// Tuned heuristics for start-control detection.
///
/// The tier scores and the 0.7 confidence floor are defaults, not invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub toggles: StrategyToggles,
    pub selectors: Vec<SelectorRule>,
    pub tier_scores: TierScores,
    pub phrases: Vec<String>,
    pub keywords: Vec<String>,
    pub min_confidence: f64,
    pub visibility_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub resolve_timeout_ms: u64,
    pub max_html_chars: usize,
    pub goal: String,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            toggles: StrategyToggles::default(),
            selectors: default_start_selectors(),
            tier_scores: TierScores::default(),
            phrases: vec![
                "click the start button".to_string(),
                "click the play button".to_string(),
                "click the button that begins the game".to_string(),
                "press the start or play control".to_string(),
            ],
            keywords: ["start", "play", "begin", "go", "continue"]
                .into_iter()
                .map(String::from)
                .collect(),
            min_confidence: 0.7,
            visibility_timeout_ms: 1_000,
            settle_delay_ms: 1_000,
            resolve_timeout_ms: 30_000,
            max_html_chars: 50_000,
            goal: "Find and activate the control that starts the game".to_string(),
        }
    }
}

impl StrategyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-delay config for tests.
    pub fn minimal() -> Self {
        Self {
            visibility_timeout_ms: 100,
            settle_delay_ms: 0,
            resolve_timeout_ms: 5_000,
            ..Self::default()
        }
    }

    /// Builder: set toggles.
    pub fn toggles(mut self, toggles: StrategyToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Builder: replace selector rules.
    pub fn selectors(mut self, selectors: Vec<SelectorRule>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Builder: replace instruction phrases.
    pub fn phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the post-click settle delay.
    pub fn settle_delay(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    /// Builder: set the shared resolve ceiling.
    pub fn resolve_timeout(mut self, ms: u64) -> Self {
        self.resolve_timeout_ms = ms;
        self
    }

    /// Selector rules sorted most-specific first; equal tiers keep
    /// their declared order.
    pub fn ordered_selectors(&self) -> Vec<SelectorRule> {
        let mut rules = self.selectors.clone();
        rules.sort_by_key(|rule| std::cmp::Reverse(self.tier_scores.score(rule.tier)));
        rules
    }
}

fn default_start_selectors() -> Vec<SelectorRule> {
    let mut rules = Vec::new();
    for id in [
        "start-button",
        "startButton",
        "start-btn",
        "start",
        "play-button",
        "playButton",
        "play-btn",
        "play",
        "btnStart",
        "btnPlay",
    ] {
        rules.push(SelectorRule::exact_id(id));
    }
    for needle in ["start", "play", "begin"] {
        for attribute in ["id", "class", "aria-label", "data-action"] {
            rules.push(SelectorRule::attribute(attribute, needle));
        }
    }
    for text in ["Start Game", "Play Game", "Start", "Play", "Begin", "New Game"] {
        rules.push(SelectorRule::text(text));
    }
    rules
}
