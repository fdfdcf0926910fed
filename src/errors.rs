use std::time::Duration;
use thiserror::Error;

/// Failures surfaced to the protocol-layer caller.
///
/// `Timeout` is a normal operational outcome (retry with a longer bound);
/// `SessionNotFound` is always a caller error; the remaining variants are
/// backend conditions with the underlying message preserved.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("unknown session: {0}")]
    SessionNotFound(String),

    #[error("timed out after {waited:?} waiting for `{selector}`")]
    Timeout { selector: String, waited: Duration },

    #[error("backend fault: {0}")]
    BackendFault(String),

    #[error("session limit reached: {0}")]
    ResourceExhausted(usize),

    #[error("browser backend unavailable: {0}")]
    BackendUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

/// Failures at the driver boundary, raised by [`BrowserHandle`]
/// implementations and normalized into [`AutomationError`] before they
/// reach a caller.
///
/// [`BrowserHandle`]: crate::core::BrowserHandle
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("wait for `{selector}` expired after {waited:?}")]
    WaitTimeout { selector: String, waited: Duration },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("driver failure: {0}")]
    Backend(String),
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

impl From<DriverError> for AutomationError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::WaitTimeout { selector, waited } => {
                AutomationError::Timeout { selector, waited }
            }
            DriverError::LaunchFailed(msg) => AutomationError::BackendUnavailable(msg),
            other => AutomationError::BackendFault(other.to_string()),
        }
    }
}
