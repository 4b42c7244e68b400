//! Text-side parsing that sits *in front of* the phase lifecycle.
//!
//! - `assembler`: streaming line assembler (fragment/chunk-safe)
//! - `classify`: marker / log / blank classification of one line

pub mod assembler;
pub mod classify;

pub use assembler::LineAssembler;
pub use classify::{ClassifiedLine, LineClassifier, PHASE_PREFIX, SAY_PREFIX};
