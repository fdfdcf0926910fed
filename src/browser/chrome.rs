use crate::core::{BrowserConfig, BrowserHandle, WaitKind};
use crate::errors::{DriverError, DriverResult};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chrome implementation of [`BrowserHandle`], one browser process and
/// one tab per handle.
pub struct ChromeHandle {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

#[async_trait]
impl BrowserHandle for ChromeHandle {
    async fn launch(config: &BrowserConfig) -> DriverResult<Self> {
        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args: Vec<&OsStr> = Vec::new();
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window.width, config.window.height)))
            .path(config.binary_path.clone())
            .args(args)
            .build()
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::LaunchFailed(e.to_string()))?;

        Ok(Self {
            browser: Some(browser),
            tab,
        })
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| DriverError::NavigationFailed(e.to_string()))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| DriverError::NavigationFailed(e.to_string()))?;

        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        kind: WaitKind,
        timeout: Duration,
    ) -> DriverResult<()> {
        let start = Instant::now();
        loop {
            if let Ok(element) = self.tab.find_element(selector) {
                if kind == WaitKind::Interactable {
                    element
                        .scroll_into_view()
                        .map_err(|e| DriverError::Backend(e.to_string()))?;
                }
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::WaitTimeout {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;

        element
            .click()
            .map_err(|e| DriverError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, clear_first: bool) -> DriverResult<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?;

        if clear_first {
            element
                .call_js_fn("function() { this.value = ''; }", vec![], false)
                .map_err(|e| DriverError::Backend(e.to_string()))?;
        }

        element
            .type_into(text)
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn inner_text(&self, selector: &str) -> DriverResult<String> {
        self.tab
            .find_element(selector)
            .map_err(|_| DriverError::ElementNotFound(selector.to_string()))?
            .get_inner_text()
            .map_err(|e| DriverError::Backend(e.to_string()))
    }

    async fn capture_screenshot(&self) -> DriverResult<Vec<u8>> {
        self.tab
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| DriverError::ScreenshotFailed(e.to_string()))
    }

    async fn current_title(&self) -> DriverResult<String> {
        let result = self
            .tab
            .evaluate("document.title", false)
            .map_err(|e| DriverError::Backend(e.to_string()))?;

        Ok(result
            .value
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or_default())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.tab.get_url())
    }

    async fn close(&mut self) -> DriverResult<()> {
        // Dropping the Browser tears down the child process.
        self.browser.take();
        Ok(())
    }
}
