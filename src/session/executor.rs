use crate::core::{BrowserHandle, WaitKind};
use crate::errors::{AutomationError, Result};
use crate::session::SessionRegistry;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLoad {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clicked {
    pub clicked: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextEntered {
    pub selector: String,
    pub chars_written: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub selector: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screenshot {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Screenshot {
    /// Base64 rendition for callers that ship the image in a JSON body.
    pub fn as_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Stateless action façade over a shared [`SessionRegistry`].
///
/// Every selector action follows the same discipline: resolve the session
/// (which refreshes its last-used timestamp), take the per-session lock,
/// wait up to the bound for the target condition, perform exactly one
/// driver operation, return a typed outcome. Wait expiry surfaces as
/// [`AutomationError::Timeout`] and leaves the session open and usable.
pub struct ActionExecutor<H> {
    registry: Arc<SessionRegistry<H>>,
    default_timeout: Duration,
}

impl<H: BrowserHandle> ActionExecutor<H> {
    pub fn new(registry: Arc<SessionRegistry<H>>) -> Self {
        let default_timeout =
            Duration::from_millis(registry.config().session.default_wait_timeout_ms);
        Self {
            registry,
            default_timeout,
        }
    }

    /// Load `url` in the session's browser; when `wait_selector` is given,
    /// additionally wait for it to be present before returning the page
    /// title.
    pub async fn navigate(
        &self,
        session_id: &str,
        url: &str,
        wait_selector: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<PageLoad> {
        Url::parse(url)
            .map_err(|e| AutomationError::BackendFault(format!("invalid url `{}`: {}", url, e)))?;

        let session = self.registry.get(session_id)?;
        let driver = session.lock().await;

        debug!(session_id, url, "navigate");
        driver.navigate(url).await?;
        if let Some(selector) = wait_selector {
            driver
                .wait_for(selector, WaitKind::Present, self.bound(timeout))
                .await?;
        }
        let title = driver.current_title().await?;

        Ok(PageLoad {
            url: url.to_string(),
            title,
        })
    }

    /// Click the first element matching `selector`.
    pub async fn click(
        &self,
        session_id: &str,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<Clicked> {
        let session = self.registry.get(session_id)?;
        let driver = session.lock().await;

        driver
            .wait_for(selector, WaitKind::Interactable, self.bound(timeout))
            .await?;
        driver.click(selector).await?;

        Ok(Clicked {
            clicked: selector.to_string(),
        })
    }

    /// Type `text` into the first element matching `selector`, clearing
    /// any existing value first unless told otherwise.
    pub async fn type_text(
        &self,
        session_id: &str,
        selector: &str,
        text: &str,
        clear_first: bool,
        timeout: Option<Duration>,
    ) -> Result<TextEntered> {
        let session = self.registry.get(session_id)?;
        let driver = session.lock().await;

        driver
            .wait_for(selector, WaitKind::Interactable, self.bound(timeout))
            .await?;
        driver.type_text(selector, text, clear_first).await?;

        Ok(TextEntered {
            selector: selector.to_string(),
            chars_written: text.chars().count(),
        })
    }

    /// Text content of the first element matching `selector`.
    pub async fn get_text(
        &self,
        session_id: &str,
        selector: &str,
        timeout: Option<Duration>,
    ) -> Result<TextContent> {
        let session = self.registry.get(session_id)?;
        let driver = session.lock().await;

        driver
            .wait_for(selector, WaitKind::Present, self.bound(timeout))
            .await?;
        let text = driver.inner_text(selector).await?;

        Ok(TextContent {
            selector: selector.to_string(),
            text,
        })
    }

    /// Capture the current rendered frame. No selector, no timeout: the
    /// capture either succeeds or reports a backend fault.
    pub async fn screenshot(&self, session_id: &str) -> Result<Screenshot> {
        let session = self.registry.get(session_id)?;
        let driver = session.lock().await;

        let bytes = driver.capture_screenshot().await?;

        Ok(Screenshot {
            mime_type: "image/png".to_string(),
            bytes,
        })
    }

    fn bound(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or(self.default_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use crate::testing::MockBrowser;

    const SHORT: Duration = Duration::from_millis(50);
    const GENEROUS: Duration = Duration::from_millis(500);

    async fn setup() -> (Arc<SessionRegistry<MockBrowser>>, ActionExecutor<MockBrowser>, String) {
        let registry = Arc::new(SessionRegistry::new(Config::default()));
        let executor = ActionExecutor::new(Arc::clone(&registry));
        let id = registry.create().await.unwrap();
        (registry, executor, id)
    }

    #[tokio::test]
    async fn navigate_waits_for_selector_then_reports_title() {
        let (registry, executor, id) = setup().await;
        registry
            .get(&id)
            .unwrap()
            .lock()
            .await
            .element_appears_in("#main", Duration::from_millis(20));

        let page = executor
            .navigate(&id, "https://example.test", Some("#main"), Some(GENEROUS))
            .await
            .unwrap();

        assert_eq!(page.url, "https://example.test");
        assert!(!page.title.is_empty());
    }

    #[tokio::test]
    async fn navigate_moves_the_driver_to_the_url() {
        let (registry, executor, id) = setup().await;

        executor
            .navigate(&id, "https://example.test/page", None, None)
            .await
            .unwrap();

        let session = registry.get(&id).unwrap();
        let url = session.lock().await.current_url().await.unwrap();
        assert_eq!(url, "https://example.test/page");
    }

    #[tokio::test]
    async fn navigate_rejects_malformed_url() {
        let (_registry, executor, id) = setup().await;
        let err = executor
            .navigate(&id, "not a url", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::BackendFault(_)));
    }

    #[tokio::test]
    async fn click_timeout_names_selector_and_session_stays_usable() {
        let (_registry, executor, id) = setup().await;

        let err = executor
            .click(&id, "#missing", Some(SHORT))
            .await
            .unwrap_err();
        match err {
            AutomationError::Timeout { selector, waited } => {
                assert_eq!(selector, "#missing");
                assert_eq!(waited, SHORT);
            }
            other => panic!("expected Timeout, got {:?}", other),
        }

        // The session survives a timeout.
        executor
            .navigate(&id, "https://example.test", None, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn action_on_unknown_session_is_not_found() {
        let (_registry, executor, _id) = setup().await;
        assert!(matches!(
            executor.click("never-created", "#btn", Some(SHORT)).await,
            Err(AutomationError::SessionNotFound(_))
        ));
        assert!(matches!(
            executor.screenshot("never-created").await,
            Err(AutomationError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn type_text_clears_then_types() {
        let (registry, executor, id) = setup().await;
        registry
            .get(&id)
            .unwrap()
            .lock()
            .await
            .element_appears_in("#input", Duration::ZERO);

        let outcome = executor
            .type_text(&id, "#input", "héllo", true, Some(GENEROUS))
            .await
            .unwrap();
        assert_eq!(outcome.selector, "#input");
        assert_eq!(outcome.chars_written, 5);

        let calls = registry.get(&id).unwrap().lock().await.calls();
        assert!(calls.contains(&"clear #input".to_string()));
        assert!(calls.contains(&"type #input héllo".to_string()));
    }

    #[tokio::test]
    async fn type_text_can_skip_clearing() {
        let (registry, executor, id) = setup().await;
        registry
            .get(&id)
            .unwrap()
            .lock()
            .await
            .element_appears_in("#input", Duration::ZERO);

        executor
            .type_text(&id, "#input", "abc", false, Some(GENEROUS))
            .await
            .unwrap();

        let calls = registry.get(&id).unwrap().lock().await.calls();
        assert!(!calls.iter().any(|c| c.starts_with("clear")));
    }

    #[tokio::test]
    async fn get_text_returns_scripted_content() {
        let (registry, executor, id) = setup().await;
        {
            let session = registry.get(&id).unwrap();
            let mut driver = session.lock().await;
            driver.element_appears_in("#out", Duration::ZERO);
            driver.set_text("#out", "hello");
        }

        let outcome = executor
            .get_text(&id, "#out", Some(GENEROUS))
            .await
            .unwrap();
        assert_eq!(outcome.text, "hello");
        assert_eq!(outcome.selector, "#out");
    }

    #[tokio::test]
    async fn outcomes_serialize_for_the_protocol_layer() {
        let (_registry, executor, id) = setup().await;

        let page = executor
            .navigate(&id, "https://example.test", None, None)
            .await
            .unwrap();
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("\"url\":\"https://example.test\""));
        assert!(json.contains("\"title\""));

        let shot = executor.screenshot(&id).await.unwrap();
        let value: serde_json::Value = serde_json::to_value(&shot).unwrap();
        assert_eq!(value["mime_type"], "image/png");
    }

    #[tokio::test]
    async fn screenshot_yields_png_bytes() {
        let (_registry, executor, id) = setup().await;

        let shot = executor.screenshot(&id).await.unwrap();
        assert_eq!(shot.mime_type, "image/png");
        assert_eq!(&shot.bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert!(!shot.as_base64().is_empty());
    }

    #[tokio::test]
    async fn driver_fault_surfaces_without_closing_the_session() {
        let (registry, executor, id) = setup().await;
        {
            let session = registry.get(&id).unwrap();
            let mut driver = session.lock().await;
            driver.element_appears_in("#btn", Duration::ZERO);
            driver.fail_operations("boom");
        }

        let err = executor
            .click(&id, "#btn", Some(GENEROUS))
            .await
            .unwrap_err();
        match err {
            AutomationError::BackendFault(msg) => assert!(msg.contains("boom")),
            other => panic!("expected BackendFault, got {:?}", other),
        }

        // Fault does not invalidate the session.
        assert!(registry.get(&id).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_actions_on_one_session_serialize() {
        let (registry, executor, id) = setup().await;
        registry
            .get(&id)
            .unwrap()
            .lock()
            .await
            .element_appears_in("#btn", Duration::from_millis(30));

        let executor = Arc::new(executor);
        let mut tasks = Vec::new();
        for _ in 0..2 {
            let executor = Arc::clone(&executor);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                executor.click(&id, "#btn", Some(GENEROUS)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // With the per-session lock each wait/click pair runs back to
        // back; interleaving would record the two waits first.
        let calls = registry.get(&id).unwrap().lock().await.calls();
        let actions: Vec<&str> = calls
            .iter()
            .filter(|c| c.starts_with("wait") || c.starts_with("click"))
            .map(|c| c.split(' ').next().unwrap())
            .collect();
        assert_eq!(actions, vec!["wait", "click", "wait", "click"]);
    }
}
