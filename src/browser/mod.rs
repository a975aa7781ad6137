//! Browser session management
//!
//! Launches a Chrome/Chromium instance or attaches to one the user already
//! logged into, and hands out the active tab to the CDP-backed accessor.

pub mod config;
pub mod session;

pub use config::{ConnectionOptions, LaunchOptions};
pub use session::BrowserSession;
