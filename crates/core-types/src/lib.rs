//! Shared primitives for the gamecheck action-resolution engine.
//!
//! Every strategy, the orchestrator and the adaptive loop exchange the records
//! defined here; none of them owns a wire format beyond these serde shapes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod errors;
pub mod outcome;
pub mod reasoning;

pub use errors::{ErrorCategory, QaError, QaResult};
pub use outcome::{Outcome, NO_STRATEGY};
pub use reasoning::{ActionKind, ActionProposal, ActionTarget, Candidate, Recommendation};

/// Identifier of a single test run.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Viewport coordinate in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Snap to whole pixels before dispatching input events.
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }
}

/// Element box as reported by the browser driver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_center() {
        let bbox = BoundingBox {
            x: 100.0,
            y: 200.0,
            width: 80.0,
            height: 30.0,
        };
        assert_eq!(bbox.center(), Point::new(140.0, 215.0));
    }

    #[test]
    fn point_rounding() {
        assert_eq!(Point::new(10.4, 20.6).rounded(), Point::new(10.0, 21.0));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
