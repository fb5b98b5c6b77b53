//! Multi-strategy action resolution
//!
//! This crate turns a high-level intent ("activate the start control") into a
//! concrete UI action by trying independent techniques in priority order:
//! - Structural selectors (exact id, attribute substring, text content)
//! - Natural-language instructions executed by the driver
//! - Vision candidates scored by the reasoning service
//! - State-based recommendations with ordered alternatives
//!
//! The cheapest, most deterministic technique always runs first and the
//! first success short-circuits the rest.

pub mod config;
pub mod context;
pub mod execution;
pub mod html;
pub mod orchestrator;
pub mod ports;
pub mod selector;
pub mod strategies;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::*;
pub use context::*;
pub use execution::*;
pub use html::sanitize_html;
pub use orchestrator::*;
pub use ports::*;
pub use selector::select_candidate;
pub use strategies::*;
