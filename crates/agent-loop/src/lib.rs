//! Budget-constrained adaptive test loop.
//!
//! # Architecture
//!
//! ```text
//! bootstrap: orchestrator.resolve(start control)
//! while no termination predicate holds:
//!     screenshot + html   // observe
//!     recommendation      // reasoning service
//!     execute             // primary, then alternatives
//!     if complete: break
//! ```
//!
//! # Key Components
//!
//! - [`AdaptiveLoopConfig`]: limits and pacing for a run
//! - [`BudgetState`]: operation counters and spend estimate
//! - [`AdaptiveLoopController`]: the BOOTSTRAP → ITERATING → TERMINATED machine
//! - [`ScreenshotSchedule`]: fixed-offset capture for runs without reasoning

pub mod budget;
pub mod config;
pub mod controller;
pub mod schedule;
pub mod types;

pub use budget::{
    distribute_screenshots, estimated_cost, max_screenshots, BudgetState, CostModel,
    MAX_SCREENSHOTS, MIN_SCREENSHOTS, SETTLE_ANCHOR_MS,
};
pub use config::AdaptiveLoopConfig;
pub use controller::AdaptiveLoopController;
pub use schedule::{ScheduledCapture, ScreenshotSchedule};
pub use types::{AdaptiveRunResult, CycleRecord, LoopPhase, LoopStatus, TerminationReason};
