//! gamecheck: playability checks for browser games
//!
//! Wires the action-resolution engine to a real browser and reasoning
//! service, scores the run and writes a JSON report.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod report;
pub mod scoring;

pub use artifacts::{ArtifactEntry, FileArtifactStore};
pub use config::{Config, ReasoningConfig};
pub use report::{RunMode, RunReport};
pub use scoring::{score_run, score_schedule, PlayabilityScore};
