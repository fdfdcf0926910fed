//! Scriptable in-memory backend for testing registry and executor
//! behavior without a real browser.

use crate::core::{BrowserConfig, BrowserHandle, WaitKind};
use crate::errors::{DriverError, DriverResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Mock [`BrowserHandle`] whose elements appear on a schedule.
///
/// Selectors are invisible until scripted with [`element_appears_in`];
/// every driver call is recorded so tests can assert on ordering, and a
/// scripted fault makes all further operations fail with that message.
/// Passing `--fail-launch` in `BrowserConfig::args` makes `launch`
/// itself fail, which is how tests exercise the create-failure path.
///
/// [`element_appears_in`]: MockBrowser::element_appears_in
pub struct MockBrowser {
    elements: HashMap<String, Instant>,
    texts: HashMap<String, String>,
    title: String,
    current_url: Mutex<String>,
    calls: Mutex<Vec<String>>,
    fail: Option<String>,
    closed: bool,
}

impl MockBrowser {
    /// Make `selector` visible `delay` from now.
    pub fn element_appears_in(&mut self, selector: &str, delay: Duration) {
        self.elements
            .insert(selector.to_string(), Instant::now() + delay);
    }

    /// Script the text content returned for `selector`.
    pub fn set_text(&mut self, selector: &str, text: &str) {
        self.texts.insert(selector.to_string(), text.to_string());
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Make every subsequent driver operation fail with `msg`.
    pub fn fail_operations(&mut self, msg: &str) {
        self.fail = Some(msg.to_string());
    }

    /// Recorded driver calls, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: String) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Backend("browser closed".to_string()));
        }
        if let Some(msg) = &self.fail {
            return Err(DriverError::Backend(msg.clone()));
        }
        Ok(())
    }

    fn visible(&self, selector: &str) -> bool {
        self.elements
            .get(selector)
            .map_or(false, |appear_at| Instant::now() >= *appear_at)
    }
}

#[async_trait]
impl BrowserHandle for MockBrowser {
    async fn launch(config: &BrowserConfig) -> DriverResult<Self> {
        if config.args.iter().any(|arg| arg == "--fail-launch") {
            return Err(DriverError::LaunchFailed(
                "scripted launch failure".to_string(),
            ));
        }
        Ok(Self {
            elements: HashMap::new(),
            texts: HashMap::new(),
            title: "Mock Page".to_string(),
            current_url: Mutex::new("about:blank".to_string()),
            calls: Mutex::new(Vec::new()),
            fail: None,
            closed: false,
        })
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.record(format!("navigate {}", url));
        self.check()?;
        *self
            .current_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = url.to_string();
        Ok(())
    }

    async fn wait_for(
        &self,
        selector: &str,
        _kind: WaitKind,
        timeout: Duration,
    ) -> DriverResult<()> {
        self.record(format!("wait {}", selector));
        self.check()?;
        let deadline = Instant::now() + timeout;
        loop {
            if self.visible(selector) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::WaitTimeout {
                    selector: selector.to_string(),
                    waited: timeout,
                });
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        self.record(format!("click {}", selector));
        self.check()?;
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, clear_first: bool) -> DriverResult<()> {
        if clear_first {
            self.record(format!("clear {}", selector));
        }
        self.record(format!("type {} {}", selector, text));
        self.check()?;
        if !self.visible(selector) {
            return Err(DriverError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }

    async fn inner_text(&self, selector: &str) -> DriverResult<String> {
        self.record(format!("get_text {}", selector));
        self.check()?;
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }

    async fn capture_screenshot(&self) -> DriverResult<Vec<u8>> {
        self.record("screenshot".to_string());
        self.check()?;
        Ok(PNG_MAGIC.to_vec())
    }

    async fn current_title(&self) -> DriverResult<String> {
        self.check()?;
        Ok(self.title.clone())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.check()?;
        Ok(self
            .current_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.record("close".to_string());
        self.closed = true;
        if let Some(msg) = &self.fail {
            return Err(DriverError::Backend(msg.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn element_becomes_visible_after_delay() {
        let mut mock = MockBrowser::launch(&BrowserConfig::default()).await.unwrap();
        mock.element_appears_in("#late", Duration::from_millis(20));

        assert!(!mock.visible("#late"));
        tokio_test::assert_ok!(
            mock.wait_for("#late", WaitKind::Present, Duration::from_millis(200))
                .await
        );
        assert!(mock.visible("#late"));
    }

    #[tokio::test]
    async fn wait_times_out_on_unscripted_selector() {
        let mock = MockBrowser::launch(&BrowserConfig::default()).await.unwrap();
        let err = mock
            .wait_for("#never", WaitKind::Present, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::WaitTimeout { .. }));
    }

    #[tokio::test]
    async fn closed_mock_rejects_operations() {
        let mut mock = MockBrowser::launch(&BrowserConfig::default()).await.unwrap();
        mock.close().await.unwrap();
        tokio_test::assert_err!(mock.navigate("https://example.test").await);
        tokio_test::assert_err!(mock.capture_screenshot().await);
    }
}
