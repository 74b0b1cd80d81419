//! Shared utilities for the ipdb tool.
//!
//! This crate provides cross-cutting concerns used by all other ipdb crates:
//! the unified error type, filesystem helpers, and terminal status lines.

pub mod errors;
pub mod fs;
pub mod progress;
