//! Swipe Review
//!
//! Client core for a personal-finance "swipe to classify" flow:
//! - Fetches the queue of unclassified transactions from the finance API
//! - Interprets drag gestures into aligned / regret decisions
//! - Keeps an undoable, serialized review session
//! - Notifies the server of each decision, fire-and-forget
//! - Reports a summary once the queue is exhausted
//!
//! SESSION LOOP:
//! LOAD → (GESTURE → COMMIT | UNDO)* → COMPLETE → RESET?

pub mod api;
pub mod coach;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod emoji;
pub mod error;
pub mod gesture;
pub mod journal;
pub mod models;
pub mod remote;
pub mod session;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use controller::{ReviewController, ReviewState, SessionSnapshot};
pub use gesture::{interpret, GestureOutcome};
pub use session::Session;
