//! Phase model + lifecycle.
//!
//! A "phase" is one named, time-bounded group of log lines:
//! - title
//! - log lines (in arrival order)
//! - open/close timing
//!
//! The lifecycle turns classified lines into ordered `UiEvent`s.

pub mod lifecycle;
pub mod model;

pub use lifecycle::{LifecycleState, PhaseLifecycle};
pub use model::{Phase, PhaseId};
