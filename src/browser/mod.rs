pub mod chrome;

pub use chrome::ChromeHandle;
