pub mod executor;
pub mod registry;

pub use executor::{ActionExecutor, Clicked, PageLoad, Screenshot, TextContent, TextEntered};
pub use registry::{spawn_reaper, SessionInfo, SessionRef, SessionRegistry};
