use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Chromium launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeConfig {
    pub headless: bool,
    /// Chrome/Chromium binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub no_sandbox: bool,
    pub launch_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub extra_args: Vec<String>,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1280,
            window_height: 720,
            no_sandbox: false,
            launch_timeout_ms: 20_000,
            request_timeout_ms: 30_000,
            extra_args: Vec::new(),
        }
    }
}

impl ChromeConfig {
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Command-line switches passed to Chromium.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-breakpad",
            "--disable-component-update",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-sync",
            "--no-first-run",
            "--no-default-browser-check",
            "--autoplay-policy=no-user-gesture-required",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        if self.headless {
            args.push("--hide-scrollbars".to_string());
            args.push("--mute-audio".to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_args() {
        let config = ChromeConfig::default();
        assert!(config.launch_args().contains(&"--mute-audio".to_string()));

        let headed = ChromeConfig {
            headless: false,
            extra_args: vec!["--lang=en-US".into()],
            ..ChromeConfig::default()
        };
        let args = headed.launch_args();
        assert!(!args.contains(&"--mute-audio".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("--lang=en-US"));
    }
}
