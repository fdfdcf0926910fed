use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window: Viewport,
    /// Explicit browser binary path; autodetected when absent.
    pub binary_path: Option<PathBuf>,
    pub user_agent: Option<String>,
    /// Extra command-line switches passed through to the browser.
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bound applied to selector waits when the caller gives none.
    pub default_wait_timeout_ms: u64,
    /// Sessions idle longer than this are eligible for reaping.
    pub max_idle_secs: u64,
    /// Period of the background reaper task, when one is spawned.
    pub reap_interval_secs: u64,
    /// Hard cap on concurrent sessions; unlimited when `None`.
    pub max_sessions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window: Viewport::default(),
            binary_path: None,
            user_agent: None,
            args: vec![
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    /// Defaults plus container-level environment overrides (`CHROME_BINARY`).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("CHROME_BINARY") {
            config.binary_path = Some(PathBuf::from(path));
        }
        config
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_wait_timeout_ms: 20_000,
            max_idle_secs: 600,
            reap_interval_secs: 60,
            max_sessions: None,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1365,
            height: 768,
        }
    }
}
