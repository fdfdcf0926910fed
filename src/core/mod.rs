pub mod browser;
pub mod config;

pub use browser::{BrowserHandle, WaitKind};
pub use config::{BrowserConfig, Config, SessionConfig, Viewport};
