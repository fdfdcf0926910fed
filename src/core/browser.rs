use crate::core::config::BrowserConfig;
use crate::errors::DriverResult;
use async_trait::async_trait;
use std::time::Duration;

/// Condition a bounded element wait must satisfy before an action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// Element is present in the document (read/extract actions).
    Present,
    /// Element is present and scrolled into view (click/type actions).
    Interactable,
}

/// Capability interface over one live browser process/connection.
///
/// Each implementation owns exactly one browser instance and is not safe
/// for concurrent use; the session registry serializes access through a
/// per-session lock. All selector parameters are CSS selectors, resolved
/// to the first matching element by the driver.
#[async_trait]
pub trait BrowserHandle: Send + Sync + Sized + 'static {
    /// Launch a new browser instance
    async fn launch(config: &BrowserConfig) -> DriverResult<Self>;

    /// Navigate to a URL and wait for the page load-complete signal
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Wait, up to `timeout`, for the first element matching `selector`
    /// to satisfy `kind`
    async fn wait_for(&self, selector: &str, kind: WaitKind, timeout: Duration)
        -> DriverResult<()>;

    /// Click the first element matching `selector`
    async fn click(&self, selector: &str) -> DriverResult<()>;

    /// Type text into the first element matching `selector`
    async fn type_text(&self, selector: &str, text: &str, clear_first: bool) -> DriverResult<()>;

    /// Text content of the first element matching `selector`
    async fn inner_text(&self, selector: &str) -> DriverResult<String>;

    /// Capture the current rendered frame as PNG bytes
    async fn capture_screenshot(&self) -> DriverResult<Vec<u8>>;

    /// Title of the current page
    async fn current_title(&self) -> DriverResult<String>;

    /// URL of the current page
    async fn current_url(&self) -> DriverResult<String>;

    /// Terminal close; the handle is unusable afterwards
    async fn close(&mut self) -> DriverResult<()>;
}
