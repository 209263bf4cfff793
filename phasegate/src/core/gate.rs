//! Per-action phase gate.
//!
//! Rules are evaluated in a fixed priority order and the first match decides:
//!
//! 1. spawn-actor in a phase without a delegated actor
//! 2. spawn-actor naming a different actor than the phase requires
//! 3. write-code in a phase that does not allow it
//! 4. write-deliverable that is not allowed now or belongs to a later phase
//! 5. run-vcs-command outside the commit phase
//!
//! Anything else is allowed. The gate keeps no state of its own.

use std::fmt;

use crate::core::action::Action;
use crate::core::phases::{ExitCriterion, PhaseTable};
use crate::core::types::{ActionKind, Actor, ActorName, ArtifactKind, Phase};

/// Why the gate refused an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateBlock {
    NoDelegatedActor {
        phase: Phase,
        requested: ActorName,
    },
    WrongActor {
        phase: Phase,
        required: Actor,
        requested: ActorName,
    },
    CodeNotAllowed {
        phase: Phase,
        allowed_in: Vec<Phase>,
    },
    DeliverableNotAllowed {
        phase: Phase,
        kind: ArtifactKind,
    },
    PrematureDeliverable {
        phase: Phase,
        kind: ArtifactKind,
        owner: Phase,
    },
    VcsOutsideCommit {
        phase: Phase,
        has_commit_phase: bool,
    },
}

impl fmt::Display for GateBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateBlock::NoDelegatedActor { phase, requested } => write!(
                f,
                "BLOCKED: Phase '{phase}' is handled by the main agent and has no delegated actor; cannot spawn '{requested}'"
            ),
            GateBlock::WrongActor {
                phase,
                required,
                requested,
            } => write!(
                f,
                "BLOCKED: Phase '{phase}' requires the '{required}' actor. Requested: '{requested}'"
            ),
            GateBlock::CodeNotAllowed { phase, allowed_in } => {
                write!(f, "BLOCKED: Cannot write code during phase '{phase}'")?;
                if allowed_in.is_empty() {
                    write!(f, "; this workflow has no code-writing phase")
                } else {
                    let names = allowed_in
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "; code changes are allowed in: {names}")
                }
            }
            GateBlock::DeliverableNotAllowed { phase, kind } => write!(
                f,
                "BLOCKED: Cannot write the {} document during phase '{phase}'",
                kind.prefix()
            ),
            GateBlock::PrematureDeliverable { phase, kind, owner } => write!(
                f,
                "BLOCKED: The {} document belongs to phase '{owner}'; current phase is '{phase}'",
                kind.prefix()
            ),
            GateBlock::VcsOutsideCommit {
                phase,
                has_commit_phase,
            } => {
                if *has_commit_phase {
                    write!(
                        f,
                        "BLOCKED: Version-control commits are only allowed in the 'commit' phase (current: '{phase}')"
                    )
                } else {
                    write!(
                        f,
                        "BLOCKED: Version-control commits are not part of this workflow (current: '{phase}')"
                    )
                }
            }
        }
    }
}

impl std::error::Error for GateBlock {}

/// Decide whether `action` may run during `current`.
///
/// A `current` phase missing from the table is treated like the initial phase.
pub fn check_action(table: &PhaseTable, current: Phase, action: &Action) -> Result<(), GateBlock> {
    let current = if table.contains(current) {
        current
    } else {
        table.initial()
    };
    let Some(spec) = table.get(current) else {
        return Ok(());
    };

    match action {
        Action::SpawnActor { actor } => match spec.required_actor {
            None => Err(GateBlock::NoDelegatedActor {
                phase: current,
                requested: actor.clone(),
            }),
            Some(required) if !actor.is(required) => Err(GateBlock::WrongActor {
                phase: current,
                required,
                requested: actor.clone(),
            }),
            Some(_) => Ok(()),
        },
        Action::WriteCode { .. } if !spec.allows(ActionKind::WriteCode) => {
            Err(GateBlock::CodeNotAllowed {
                phase: current,
                allowed_in: table
                    .specs()
                    .iter()
                    .filter(|s| s.allows(ActionKind::WriteCode))
                    .map(|s| s.phase)
                    .collect(),
            })
        }
        Action::WriteDeliverable { kind, .. } => {
            if !spec.allows(ActionKind::WriteDeliverable) {
                return Err(GateBlock::DeliverableNotAllowed {
                    phase: current,
                    kind: *kind,
                });
            }
            match producer_of(table, *kind) {
                Some(owner) if table.position(owner) > table.position(current) => {
                    Err(GateBlock::PrematureDeliverable {
                        phase: current,
                        kind: *kind,
                        owner,
                    })
                }
                _ => Ok(()),
            }
        }
        Action::RunVcsCommand { .. } if !spec.allows(ActionKind::RunVcsCommand) => {
            Err(GateBlock::VcsOutsideCommit {
                phase: current,
                has_commit_phase: table.contains(Phase::Commit),
            })
        }
        Action::WriteCode { .. } | Action::RunVcsCommand { .. } => Ok(()),
    }
}

/// First phase in table order whose exit criterion is this artifact.
fn producer_of(table: &PhaseTable, kind: ArtifactKind) -> Option<Phase> {
    table.specs().iter().find_map(|spec| match &spec.exit {
        ExitCriterion::Artifact { kind: k, .. } if *k == kind => Some(spec.phase),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(name: &str) -> Action {
        Action::SpawnActor {
            actor: ActorName::parse(name),
        }
    }

    fn code() -> Action {
        Action::WriteCode {
            path: "src/main.ts".to_string(),
        }
    }

    fn commit() -> Action {
        Action::RunVcsCommand {
            command: "git commit -m x".to_string(),
        }
    }

    fn deliverable(kind: ArtifactKind) -> Action {
        Action::WriteDeliverable {
            path: format!("project/{}/{}_s_101726.md", kind.dir(), kind.prefix()),
            kind,
        }
    }

    /// The required actor is allowed; every other name is blocked and the
    /// reason names the required actor.
    #[test]
    fn spawn_requires_phase_actor() {
        let table = PhaseTable::default();
        assert_eq!(check_action(&table, Phase::Explore, &spawn("explorer")), Ok(()));
        for other in ["strategic-planner", "code-reviewer", "general-purpose"] {
            let err = check_action(&table, Phase::Explore, &spawn(other)).expect_err("blocked");
            assert!(err.to_string().contains("'codebase-explorer'"), "{err}");
        }
    }

    #[test]
    fn spawn_blocked_when_phase_has_no_actor() {
        let table = PhaseTable::default();
        for name in ["codebase-explorer", "code-reviewer", "anything"] {
            let err = check_action(&table, Phase::Implement, &spawn(name)).expect_err("blocked");
            assert!(matches!(err, GateBlock::NoDelegatedActor { .. }));
        }
    }

    #[test]
    fn code_only_in_implement() {
        let table = PhaseTable::default();
        assert_eq!(check_action(&table, Phase::Implement, &code()), Ok(()));
        let err = check_action(&table, Phase::Plan, &code()).expect_err("blocked");
        assert_eq!(
            err,
            GateBlock::CodeNotAllowed {
                phase: Phase::Plan,
                allowed_in: vec![Phase::Implement]
            }
        );
    }

    #[test]
    fn deliverables_cannot_be_written_ahead_of_their_phase() {
        let table = PhaseTable::default();
        let err = check_action(&table, Phase::Explore, &deliverable(ArtifactKind::Plan))
            .expect_err("premature");
        assert!(matches!(
            err,
            GateBlock::PrematureDeliverable {
                owner: Phase::Plan,
                ..
            }
        ));
        assert_eq!(
            check_action(&table, Phase::PlanReview, &deliverable(ArtifactKind::Plan)),
            Ok(())
        );
        assert_eq!(
            check_action(&table, Phase::Explore, &deliverable(ArtifactKind::CodebaseStatus)),
            Ok(())
        );
        assert!(matches!(
            check_action(&table, Phase::Commit, &deliverable(ArtifactKind::Review)),
            Err(GateBlock::DeliverableNotAllowed { .. })
        ));
    }

    #[test]
    fn vcs_only_in_commit_phase() {
        let table = PhaseTable::default();
        assert_eq!(check_action(&table, Phase::Commit, &commit()), Ok(()));
        let err = check_action(&table, Phase::Implement, &commit()).expect_err("blocked");
        assert_eq!(
            err,
            GateBlock::VcsOutsideCommit {
                phase: Phase::Implement,
                has_commit_phase: true
            }
        );
    }

    #[test]
    fn vcs_always_blocked_without_commit_phase() {
        let table = PhaseTable::new(&[Phase::Explore, Phase::Implement]).expect("table");
        let err = check_action(&table, Phase::Implement, &commit()).expect_err("blocked");
        assert!(err.to_string().contains("not part of this workflow"));
    }

    /// Same action twice gives the same reason.
    #[test]
    fn block_reason_is_deterministic() {
        let table = PhaseTable::default();
        let first = check_action(&table, Phase::Plan, &spawn("reviewer")).expect_err("b");
        let second = check_action(&table, Phase::Plan, &spawn("reviewer")).expect_err("b");
        assert_eq!(first.to_string(), second.to_string());
    }
}
