//! Chromium driver for the action-resolution engine.
//!
//! [`ChromeSession`] owns the browser process and its CDP event loop;
//! [`ChromeDriver`] adapts the page under test to
//! [`action_strategies::BrowserDriver`]. Clicks and key presses go through
//! `Input.dispatch*Event` so canvas games receive them like real input.

pub mod config;
pub mod driver;
pub mod errors;
pub mod keys;
pub mod session;

pub use config::ChromeConfig;
pub use driver::{text_xpath, ChromeDriver, ChromeElement};
pub use errors::{classify, is_page_lost};
pub use keys::{key_definition, KeyDefinition};
pub use session::ChromeSession;
