use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoint and model settings for the reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionLlmConfig {
    /// Tried in order; a 429 moves on to the next key.
    #[serde(skip_serializing)]
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// `low`, `high` or `auto`.
    pub image_detail: String,
}

impl Default for VisionLlmConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.0,
            max_tokens: 800,
            timeout_ms: 30_000,
            image_detail: "low".to_string(),
        }
    }
}

impl VisionLlmConfig {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_keys.push(key.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn has_keys(&self) -> bool {
        self.api_keys.iter().any(|k| !k.trim().is_empty())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}
