//! Error taxonomy shared by strategies, the orchestrator and the loop controller

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type QaResult<T> = Result<T, QaError>;

/// Coarse classification used to decide whether a run can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Timeout,
    BrowserInit,
    Navigation,
    ElementDetection,
    ActionExecution,
    ReasoningService,
    Unknown,
}

impl ErrorCategory {
    /// Recoverable errors let the caller move on to the next strategy,
    /// alternative or cycle. Anything unclassified fails closed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Timeout
                | ErrorCategory::ElementDetection
                | ErrorCategory::ActionExecution
                | ErrorCategory::ReasoningService
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::BrowserInit => "browser-init",
            ErrorCategory::Navigation => "navigation",
            ErrorCategory::ElementDetection => "element-detection",
            ErrorCategory::ActionExecution => "action-execution",
            ErrorCategory::ReasoningService => "reasoning-service",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

/// Error enumeration for every fallible collaborator call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QaError {
    /// Operation exceeded its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Browser could not be launched or attached
    #[error("Browser init failed: {0}")]
    BrowserInit(String),

    /// Page could not be loaded
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Element lookup or visibility probe failed
    #[error("Element detection failed: {0}")]
    ElementDetection(String),

    /// Click, key press or instruction dispatch failed
    #[error("Action failed: {0}")]
    ActionExecution(String),

    /// Vision/language service call failed or returned garbage
    #[error("Reasoning service error: {0}")]
    ReasoningService(String),

    /// Malformed input supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Anything we could not classify
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl QaError {
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        QaError::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn element(message: impl Into<String>) -> Self {
        QaError::ElementDetection(message.into())
    }

    pub fn action(message: impl Into<String>) -> Self {
        QaError::ActionExecution(message.into())
    }

    pub fn reasoning(message: impl Into<String>) -> Self {
        QaError::ReasoningService(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        QaError::InvalidInput(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            QaError::Timeout { .. } => ErrorCategory::Timeout,
            QaError::BrowserInit(_) => ErrorCategory::BrowserInit,
            QaError::Navigation(_) => ErrorCategory::Navigation,
            QaError::ElementDetection(_) => ErrorCategory::ElementDetection,
            QaError::ActionExecution(_) => ErrorCategory::ActionExecution,
            QaError::ReasoningService(_) => ErrorCategory::ReasoningService,
            QaError::InvalidInput(_) | QaError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.category().is_recoverable()
    }
}

impl From<serde_json::Error> for QaError {
    fn from(err: serde_json::Error) -> Self {
        QaError::ReasoningService(format!("malformed payload: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_categories() {
        assert!(QaError::timeout("click", Duration::from_millis(500)).is_recoverable());
        assert!(QaError::element("gone").is_recoverable());
        assert!(QaError::action("detached").is_recoverable());
        assert!(QaError::reasoning("503").is_recoverable());
    }

    #[test]
    fn fatal_categories_fail_closed() {
        assert!(!QaError::BrowserInit("no chrome".into()).is_recoverable());
        assert!(!QaError::Navigation("dns".into()).is_recoverable());
        assert!(!QaError::Unknown("??".into()).is_recoverable());
        assert_eq!(
            QaError::invalid_input("empty").category(),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn timeout_message_carries_budget() {
        let err = QaError::timeout("screenshot", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "screenshot timed out after 1500ms");
    }
}
