use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use gamecheck_core_types::QaError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ChromeConfig;
use crate::driver::ChromeDriver;

/// A launched Chromium with one page under test.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    driver: Arc<ChromeDriver>,
}

impl ChromeSession {
    pub async fn launch(config: &ChromeConfig) -> Result<Self, QaError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.window_width, config.window_height)
            .launch_timeout(config.launch_timeout())
            .request_timeout(config.request_timeout())
            .args(config.launch_args());
        if !config.headless {
            builder = builder.with_head();
        }
        if config.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(QaError::BrowserInit)?;

        info!(headless = config.headless, "Launching Chromium");
        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| QaError::BrowserInit(format!("launch failed: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(%err, "CDP handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(QaError::BrowserInit(format!("failed to open page: {err}")));
            }
        };

        Ok(Self {
            browser,
            handler,
            driver: Arc::new(
                ChromeDriver::new(page).with_request_timeout(config.request_timeout()),
            ),
        })
    }

    /// Load `url` in the page under test.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), QaError> {
        let parsed = Url::parse(url)
            .map_err(|e| QaError::Navigation(format!("invalid url '{url}': {e}")))?;
        info!(url = %parsed, "Navigating");

        match tokio::time::timeout(timeout, self.driver.page().goto(parsed.as_str())).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(QaError::Navigation(format!("{parsed}: {err}"))),
            Err(_) => Err(QaError::timeout("navigation", timeout)),
        }
    }

    pub fn driver(&self) -> Arc<ChromeDriver> {
        self.driver.clone()
    }

    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!(%err, "Chromium did not close cleanly");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}
