//! Gesture interpretation
//!
//! A drag on the top card is reduced to a single signed horizontal
//! displacement. When the drag ends, the displacement is compared against a
//! fixed threshold: far enough right commits "aligned", far enough left
//! commits "regret", anything else snaps the card back.

use crate::models::Outcome;
use serde::Serialize;

pub const DEFAULT_SWIPE_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureOutcome {
    Commit(Outcome),
    SnapBack,
}

impl GestureOutcome {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            GestureOutcome::Commit(outcome) => Some(*outcome),
            GestureOutcome::SnapBack => None,
        }
    }
}

/// Both comparisons are strict: a displacement of exactly `threshold` snaps back.
pub fn interpret(displacement: f64, threshold: f64) -> GestureOutcome {
    if displacement > threshold {
        GestureOutcome::Commit(Outcome::Aligned)
    } else if displacement < -threshold {
        GestureOutcome::Commit(Outcome::Regret)
    } else {
        GestureOutcome::SnapBack
    }
}

/// Tracks the live displacement of an in-progress drag.
#[derive(Debug, Clone)]
pub struct DragTracker {
    threshold: f64,
    displacement: f64,
}

impl DragTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            displacement: 0.0,
        }
    }

    /// Record the latest translation reported by the input layer.
    pub fn update(&mut self, displacement: f64) {
        self.displacement = displacement;
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    /// The outcome the drag would produce if released now.
    pub fn preview(&self) -> GestureOutcome {
        interpret(self.displacement, self.threshold)
    }

    /// Finish the drag. The displacement always returns to zero.
    pub fn end(&mut self) -> GestureOutcome {
        let outcome = interpret(self.displacement, self.threshold);
        self.displacement = 0.0;
        outcome
    }
}

impl Default for DragTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_THRESHOLD)
    }
}
