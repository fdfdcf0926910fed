pub mod browser;
pub mod core;
pub mod errors;
pub mod session;
pub mod testing;

pub use browser::ChromeHandle;
pub use core::{BrowserConfig, BrowserHandle, Config, SessionConfig, Viewport, WaitKind};
pub use errors::{AutomationError, DriverError, Result};
pub use session::{
    spawn_reaper, ActionExecutor, Clicked, PageLoad, Screenshot, SessionInfo, SessionRef,
    SessionRegistry, TextContent, TextEntered,
};
