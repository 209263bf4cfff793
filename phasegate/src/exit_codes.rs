//! Stable exit codes for phasegate commands.
//!
//! The host reads `BLOCK` from the `hook` subcommand as "refuse the action and
//! show stderr to the agent". Any other non-zero code is a plain failure.

/// Action allowed, or command succeeded.
pub const ALLOW: i32 = 0;
/// Command failed (bad config, unreadable state, usage errors). Never
/// returned by `phasegate hook`.
pub const ERROR: i32 = 1;
/// `phasegate hook` refused the action; the reason is on stderr.
pub const BLOCK: i32 = 2;
