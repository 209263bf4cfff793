//! Phase-gated workflow enforcement for agent hooks.
//!
//! A host agent runtime invokes `phasegate hook` on lifecycle events (tool
//! calls, prompts, stop signals). Each invocation reads the persisted workflow
//! session, decides allow or block, and advances the phase when a completion
//! signal satisfies the current phase's exit criterion.
//!
//! - **[`core`]**: Pure decisions (phase table, transition rules, action
//!   gating, completion criteria, security filter). No I/O.
//! - **[`io`]**: Side effects (state store, config, artifact lookup, git,
//!   guidance rendering).
//!
//! [`hook`] composes the two for one event; [`cli`] implements the
//! maintenance subcommands.

pub mod cli;
pub mod core;
pub mod exit_codes;
pub mod hook;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
