//! Per-request resolution context

use crate::ports::Screenshot;

/// Inputs shared by every strategy during one `resolve` call.
///
/// A pre-captured screenshot or HTML snapshot is reused instead of
/// capturing a fresh one.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    pub goal: String,
    pub prior_actions: Vec<String>,
    pub screenshot: Option<Screenshot>,
    pub html: Option<String>,
}

impl ResolveContext {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_prior_actions(mut self, actions: Vec<String>) -> Self {
        self.prior_actions = actions;
        self
    }
}
