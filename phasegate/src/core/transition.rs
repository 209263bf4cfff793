//! Forward-one-only transition policy.
//!
//! Exactly one rule fires for any `(current, requested)` pair because the
//! table order is total and strict.

use std::fmt;

use crate::core::phases::PhaseTable;
use crate::core::types::Phase;

/// Reason a transition request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// Requested phase is not part of the active table.
    Unknown { requested: Phase, valid: String },
    /// Requested phase equals the current phase.
    Repeat { phase: Phase, next: Option<Phase> },
    Backward { from: Phase, to: Phase },
    /// Phases strictly between `from` and `to`, in table order.
    Skip {
        from: Phase,
        to: Phase,
        skipped: Vec<Phase>,
    },
    /// No session yet and the request is not the initial phase.
    NotStarted { requested: Phase, initial: Phase },
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::Unknown { requested, valid } => {
                write!(f, "Unknown phase '{requested}'. Valid phases: {valid}")
            }
            TransitionError::Repeat { phase, next } => {
                write!(f, "Cannot stay on the same phase '{phase}'")?;
                match next {
                    Some(next) => write!(f, "; the workflow must move forward to '{next}'"),
                    None => write!(f, "; it is the final phase"),
                }
            }
            TransitionError::Backward { from, to } => {
                write!(f, "Cannot move backward from '{from}' to '{to}'")
            }
            TransitionError::Skip { from, to, skipped } => {
                let names = skipped
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "Cannot skip phase(s): {names} (requested '{to}' from '{from}')"
                )
            }
            TransitionError::NotStarted { requested, initial } => write!(
                f,
                "Workflow has not started; it must begin at '{initial}', not '{requested}'"
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

/// Decide whether moving from `current` to `requested` is permitted.
pub fn validate_transition(
    table: &PhaseTable,
    current: Option<Phase>,
    requested: Phase,
) -> Result<(), TransitionError> {
    let Some(next_idx) = table.position(requested) else {
        return Err(TransitionError::Unknown {
            requested,
            valid: table.names(),
        });
    };

    let Some(current) = current else {
        if requested == table.initial() {
            return Ok(());
        }
        return Err(TransitionError::NotStarted {
            requested,
            initial: table.initial(),
        });
    };

    // A current phase outside the table can only come from a config change
    // between invocations; only the initial phase may be requested then.
    let Some(cur_idx) = table.position(current) else {
        return validate_transition(table, None, requested);
    };

    if next_idx == cur_idx {
        return Err(TransitionError::Repeat {
            phase: current,
            next: table.next(current),
        });
    }
    if next_idx < cur_idx {
        return Err(TransitionError::Backward {
            from: current,
            to: requested,
        });
    }
    if next_idx > cur_idx + 1 {
        let skipped = table.specs()[cur_idx + 1..next_idx]
            .iter()
            .map(|spec| spec.phase)
            .collect();
        return Err(TransitionError::Skip {
            from: current,
            to: requested,
            skipped,
        });
    }
    Ok(())
}
