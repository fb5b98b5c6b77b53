use std::time::Duration;

use action_strategies::{BrowserDriver, ElementHandle, SelectorSpec};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Element, Page};
use gamecheck_core_types::{BoundingBox, QaError};
use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::{classify, is_page_lost};
use crate::keys::key_definition;

/// Visibility predicate evaluated with the element bound to `this`.
const VISIBILITY_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && Number(style.opacity) > 0;
}"#;

const VISIBILITY_POLL: Duration = Duration::from_millis(100);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`BrowserDriver`] over a single chromiumoxide page.
#[derive(Clone)]
pub struct ChromeDriver {
    page: Page,
    request_timeout: Duration,
}

impl ChromeDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// CDP request timeout, reported when a command times out.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn dispatch_mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<(), QaError> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if kind != DispatchMouseEventType::MouseMoved {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(QaError::action)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| classify(e, "mouse event", self.request_timeout, QaError::ActionExecution))?;
        Ok(())
    }

    async fn dispatch_key(&self, kind: DispatchKeyEventType, key: &str) -> Result<(), QaError> {
        let def = key_definition(key);
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(def.key)
            .code(def.code)
            .windows_virtual_key_code(def.virtual_key_code);
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = def.text {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(QaError::action)?;
        self.page
            .execute(params)
            .await
            .map_err(|e| classify(e, "key event", self.request_timeout, QaError::ActionExecution))?;
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn locate(
        &self,
        selector: &SelectorSpec,
    ) -> Result<Option<Box<dyn ElementHandle>>, QaError> {
        let found = match selector {
            SelectorSpec::Css(css) => self.page.find_element(css.as_str()).await,
            SelectorSpec::Text(text) => self.page.find_xpath(text_xpath(text)).await,
        };
        match found {
            Ok(element) => Ok(Some(Box::new(ChromeElement {
                element,
                request_timeout: self.request_timeout,
            }))),
            Err(err) => lookup_result(err, self.request_timeout),
        }
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), QaError> {
        debug!(x, y, "dispatching click");
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, x, y).await?;
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, x, y).await
    }

    async fn press_key(&self, key: &str) -> Result<(), QaError> {
        debug!(key, "dispatching key press");
        self.dispatch_key(DispatchKeyEventType::KeyDown, key).await?;
        self.dispatch_key(DispatchKeyEventType::KeyUp, key).await
    }

    async fn capture_screenshot(&self) -> Result<Vec<u8>, QaError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| classify(e, "screenshot", self.request_timeout, QaError::ActionExecution))
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, QaError> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| classify(e, "evaluation", self.request_timeout, QaError::ActionExecution))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }
}

/// Located DOM node.
pub struct ChromeElement {
    element: Element,
    request_timeout: Duration,
}

impl ChromeElement {
    async fn visible_now(&self) -> Result<bool, QaError> {
        let returns = self
            .element
            .call_js_fn(VISIBILITY_JS, false)
            .await
            .map_err(|e| {
                classify(e, "visibility check", self.request_timeout, QaError::ElementDetection)
            })?;
        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

#[async_trait]
impl ElementHandle for ChromeElement {
    async fn is_visible(&self, timeout: Duration) -> Result<bool, QaError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.visible_now().await? {
                return Ok(true);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(VISIBILITY_POLL.min(deadline - now)).await;
        }
    }

    async fn click(&self) -> Result<(), QaError> {
        self.element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| classify(e, "element click", self.request_timeout, QaError::ActionExecution))
    }

    async fn bounding_box(&self) -> Result<Option<BoundingBox>, QaError> {
        match self.element.bounding_box().await {
            Ok(b) => Ok(Some(BoundingBox {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
            })),
            Err(err) if is_page_lost(&err) => Err(classify(
                err,
                "bounding box",
                self.request_timeout,
                QaError::ElementDetection,
            )),
            Err(err) => {
                trace!(%err, "element has no box model");
                Ok(None)
            }
        }
    }
}

/// A lookup error is a miss unless the page itself is gone or the query
/// could not run.
fn lookup_result(
    err: CdpError,
    timeout: Duration,
) -> Result<Option<Box<dyn ElementHandle>>, QaError> {
    match err {
        CdpError::NotFound => Ok(None),
        err => {
            trace!(%err, "element lookup failed");
            Err(classify(err, "element lookup", timeout, QaError::ElementDetection))
        }
    }
}

/// XPath matching elements whose normalized text, or an input's value,
/// contains `needle` case-insensitively.
pub fn text_xpath(needle: &str) -> String {
    const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
    let literal = xpath_literal(&needle.to_lowercase());
    format!(
        "//*[text()[contains(translate(normalize-space(.),'{UPPER}','{LOWER}'),{literal})]] \
         | //input[contains(translate(@value,'{UPPER}','{LOWER}'),{literal})]"
    )
}

/// Quote a string for XPath 1.0, which has no escape sequences.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_element_is_a_miss() {
        assert!(matches!(lookup_result(CdpError::NotFound, DEFAULT_REQUEST_TIMEOUT), Ok(None)));
    }

    #[test]
    fn test_lookup_on_lost_page_is_not_recoverable() {
        let err = lookup_result(CdpError::NoResponse, DEFAULT_REQUEST_TIMEOUT)
            .err()
            .unwrap();
        assert!(matches!(err, QaError::BrowserInit(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_failed_query_is_detection_error() {
        let err = lookup_result(
            CdpError::Chrome(chromiumoxide_types::Error {
                code: -32000,
                message: "DOM Error while querying".into(),
            }),
            DEFAULT_REQUEST_TIMEOUT,
        )
        .err()
        .unwrap();
        assert!(matches!(err, QaError::ElementDetection(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_text_xpath_lowercases_needle() {
        let xpath = text_xpath("Start Game");
        assert!(xpath.contains("'start game'"));
        assert!(xpath.starts_with("//*[text()"));
        assert!(xpath.contains("//input"));
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("play"), "'play'");
        assert_eq!(xpath_literal("let's go"), "\"let's go\"");
        assert_eq!(
            xpath_literal("it's \"on\""),
            "concat('it', \"'\", 's \"on\"')"
        );
    }
}
