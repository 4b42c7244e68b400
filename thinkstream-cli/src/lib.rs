//! thinkstream CLI library target.
//!
//! The binary entry point is in `main.rs`; this file exists so `tests/*.rs`
//! can import the CLI's logic.

pub mod config;
pub mod demo;
pub mod render;
pub mod replay;
pub mod util;
