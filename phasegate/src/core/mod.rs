//! Deterministic decision logic for the phase gate.
//!
//! Core modules must be free of I/O side effects. They operate on decoded
//! events, the phase table and evidence gathered by `io`, and return
//! deterministic outputs suitable for tests.

pub mod action;
pub mod completion;
pub mod event;
pub mod frontmatter;
pub mod gate;
pub mod phases;
pub mod security;
pub mod transition;
pub mod types;
