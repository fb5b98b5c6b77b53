//! Mapping of chromiumoxide errors onto [`QaError`] categories.
//!
//! Transport or target loss means the page under test is gone, so it maps to
//! the non-recoverable browser category. Everything else keeps the category of
//! the operation that failed.

use std::time::Duration;

use chromiumoxide::error::CdpError;
use gamecheck_core_types::QaError;

/// Protocol messages Chromium sends once the target or its session is gone.
const LOST_TARGET_MARKERS: &[&str] = &[
    "target closed",
    "target crashed",
    "no target with given id",
    "session with given id not found",
    "inspected target navigated or closed",
];

/// True when no further command can succeed on this page.
pub fn is_page_lost(err: &CdpError) -> bool {
    match err {
        CdpError::Ws(_)
        | CdpError::Io(_)
        | CdpError::ChannelSendError(_)
        | CdpError::NoResponse
        | CdpError::LaunchExit(..)
        | CdpError::LaunchTimeout(_)
        | CdpError::LaunchIo(..) => true,
        CdpError::Chrome(_) => {
            let message = err.to_string().to_lowercase();
            LOST_TARGET_MARKERS.iter().any(|marker| message.contains(marker))
        }
        _ => false,
    }
}

/// Classify `err` raised by `operation`.
///
/// `fallback` builds the error for failures that leave the page usable.
pub fn classify(
    err: CdpError,
    operation: &str,
    timeout: Duration,
    fallback: fn(String) -> QaError,
) -> QaError {
    if is_page_lost(&err) {
        return QaError::BrowserInit(format!("page lost during {operation}: {err}"));
    }
    match err {
        CdpError::Timeout => QaError::timeout(operation, timeout),
        other => fallback(format!("{operation} failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamecheck_core_types::ErrorCategory;

    const LIMIT: Duration = Duration::from_secs(5);

    fn chrome(message: &str) -> CdpError {
        CdpError::Chrome(chromiumoxide_types::Error {
            code: -32000,
            message: message.to_string(),
        })
    }

    #[test]
    fn test_lost_connection_is_not_recoverable() {
        let err = classify(CdpError::NoResponse, "element lookup", LIMIT, QaError::ElementDetection);
        assert_eq!(err.category(), ErrorCategory::BrowserInit);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_closed_target_is_not_recoverable() {
        let err = classify(chrome("Target closed"), "screenshot", LIMIT, QaError::ActionExecution);
        assert_eq!(err.category(), ErrorCategory::BrowserInit);
        assert!(err.to_string().contains("screenshot"));
    }

    #[test]
    fn test_query_error_stays_detection() {
        let err = classify(
            chrome("DOM Error while querying"),
            "element lookup",
            LIMIT,
            QaError::ElementDetection,
        );
        assert_eq!(err.category(), ErrorCategory::ElementDetection);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_request_timeout_maps_to_timeout() {
        let err = classify(CdpError::Timeout, "evaluation", LIMIT, QaError::ActionExecution);
        assert_eq!(
            err,
            QaError::Timeout {
                operation: "evaluation".into(),
                timeout_ms: 5_000
            }
        );
    }

    #[test]
    fn test_other_failures_use_operation_category() {
        let err = classify(
            CdpError::ScrollingFailed("detached".into()),
            "element click",
            LIMIT,
            QaError::ActionExecution,
        );
        assert_eq!(err.category(), ErrorCategory::ActionExecution);
    }
}
