//! Phase definition table.
//!
//! The table is an ordered, duplicate-free subset of [`Phase::ALL`]. Position
//! in the table is the phase order: the first entry is the initial phase and
//! the last entry is the terminal phase.

use serde::Serialize;

use crate::core::types::{ActionKind, Actor, ArtifactKind, Phase};

/// Frontmatter field that must carry one of the accepted values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub field: String,
    pub accepted: Vec<String>,
}

impl Marker {
    fn new(field: &str, accepted: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            accepted: accepted.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Predicate a phase must satisfy before it may be left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExitCriterion {
    /// A session-keyed artifact exists, optionally with content requirements.
    Artifact {
        kind: ArtifactKind,
        marker: Option<Marker>,
        sections: Vec<String>,
        min_chars: usize,
    },
    /// The change tracker reports at least one changed source file.
    SourceChanges,
    /// The change tracker reports no outstanding changes.
    CleanWorktree,
}

impl ExitCriterion {
    fn artifact(kind: ArtifactKind) -> Self {
        ExitCriterion::Artifact {
            kind,
            marker: None,
            sections: Vec::new(),
            min_chars: 0,
        }
    }

    /// Short human description used in guidance and block reasons.
    pub fn describe(&self) -> String {
        match self {
            ExitCriterion::Artifact { kind, marker, .. } => match marker {
                Some(marker) => format!(
                    "{} document with `{}: {}` in its frontmatter",
                    kind.prefix(),
                    marker.field,
                    marker.accepted.first().map(String::as_str).unwrap_or("")
                ),
                None => format!("{} document", kind.prefix()),
            },
            ExitCriterion::SourceChanges => "modified source files".to_string(),
            ExitCriterion::CleanWorktree => "no uncommitted changes".to_string(),
        }
    }
}

/// Static definition of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSpec {
    pub phase: Phase,
    /// `None` means the orchestrating agent performs the work itself.
    pub required_actor: Option<Actor>,
    pub exit: ExitCriterion,
    pub allowed: Vec<ActionKind>,
}

impl PhaseSpec {
    /// Canonical definition for a phase.
    pub fn canonical(phase: Phase) -> Self {
        use ActionKind::{RunVcsCommand, SpawnActor, WriteCode, WriteDeliverable};

        let delegated = vec![SpawnActor, WriteDeliverable];
        let (required_actor, exit, allowed) = match phase {
            Phase::Explore => (
                Some(Actor::CodebaseExplorer),
                ExitCriterion::artifact(ArtifactKind::CodebaseStatus),
                delegated,
            ),
            Phase::Research => (
                Some(Actor::ResearchSpecialist),
                ExitCriterion::artifact(ArtifactKind::Research),
                delegated,
            ),
            Phase::ResearchReview => (
                Some(Actor::ResearchConsultant),
                ExitCriterion::Artifact {
                    kind: ArtifactKind::Research,
                    marker: Some(Marker::new("validated_by", &["research-consultant"])),
                    sections: Vec::new(),
                    min_chars: 0,
                },
                delegated,
            ),
            Phase::Plan => (
                Some(Actor::StrategicPlanner),
                ExitCriterion::artifact(ArtifactKind::Plan),
                delegated,
            ),
            Phase::PlanReview => (
                Some(Actor::PlanConsultant),
                ExitCriterion::Artifact {
                    kind: ArtifactKind::Plan,
                    marker: Some(Marker::new(
                        "consulted_by",
                        &["plan-consultant", "consulting-expert"],
                    )),
                    sections: Vec::new(),
                    min_chars: 0,
                },
                delegated,
            ),
            Phase::Implement => (
                None,
                ExitCriterion::SourceChanges,
                vec![WriteCode, WriteDeliverable],
            ),
            Phase::Review => (
                Some(Actor::CodeReviewer),
                ExitCriterion::Artifact {
                    kind: ArtifactKind::Review,
                    marker: None,
                    sections: vec!["summary".to_string(), "findings".to_string()],
                    min_chars: 200,
                },
                delegated,
            ),
            Phase::Commit => (None, ExitCriterion::CleanWorktree, vec![RunVcsCommand]),
        };
        Self {
            phase,
            required_actor,
            exit,
            allowed,
        }
    }

    pub fn allows(&self, kind: ActionKind) -> bool {
        self.allowed.contains(&kind)
    }
}

/// Ordered phase definitions for one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    specs: Vec<PhaseSpec>,
}

impl Default for PhaseTable {
    fn default() -> Self {
        Self {
            specs: Phase::ALL.into_iter().map(PhaseSpec::canonical).collect(),
        }
    }
}

impl PhaseTable {
    /// Build a table from an ordered phase list.
    ///
    /// Returns an error for an empty list or a repeated phase.
    pub fn new(phases: &[Phase]) -> Result<Self, String> {
        if phases.is_empty() {
            return Err("phase list must not be empty".to_string());
        }
        let mut specs: Vec<PhaseSpec> = Vec::with_capacity(phases.len());
        for phase in phases {
            if specs.iter().any(|spec| spec.phase == *phase) {
                return Err(format!("phase '{phase}' is listed more than once"));
            }
            specs.push(PhaseSpec::canonical(*phase));
        }
        Ok(Self { specs })
    }

    /// Override the content requirements of the review deliverable.
    pub fn with_review_rules(mut self, sections: &[String], min_chars: usize) -> Self {
        for spec in &mut self.specs {
            if let ExitCriterion::Artifact {
                kind: ArtifactKind::Review,
                sections: s,
                min_chars: m,
                ..
            } = &mut spec.exit
            {
                *s = sections.to_vec();
                *m = min_chars;
            }
        }
        self
    }

    pub fn specs(&self) -> &[PhaseSpec] {
        &self.specs
    }

    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.specs.iter().map(|spec| spec.phase)
    }

    pub fn position(&self, phase: Phase) -> Option<usize> {
        self.specs.iter().position(|spec| spec.phase == phase)
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseSpec> {
        self.specs.iter().find(|spec| spec.phase == phase)
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.position(phase).is_some()
    }

    pub fn initial(&self) -> Phase {
        self.specs[0].phase
    }

    pub fn terminal(&self) -> Phase {
        self.specs[self.specs.len() - 1].phase
    }

    /// Successor in table order, `None` for the terminal phase or a phase not
    /// in the table.
    pub fn next(&self, phase: Phase) -> Option<Phase> {
        let idx = self.position(phase)?;
        self.specs.get(idx + 1).map(|spec| spec.phase)
    }

    /// Comma-separated phase names in order.
    pub fn names(&self) -> String {
        self.phases()
            .map(Phase::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_canonical_order() {
        let table = PhaseTable::default();
        assert_eq!(table.initial(), Phase::Explore);
        assert_eq!(table.terminal(), Phase::Commit);
        assert_eq!(table.next(Phase::PlanReview), Some(Phase::Implement));
        assert_eq!(table.next(Phase::Commit), None);
    }

    #[test]
    fn subset_table_uses_list_order() {
        let table =
            PhaseTable::new(&[Phase::Explore, Phase::Plan, Phase::Commit]).expect("table");
        assert_eq!(table.next(Phase::Explore), Some(Phase::Plan));
        assert_eq!(table.position(Phase::Commit), Some(2));
        assert!(!table.contains(Phase::Research));
        assert_eq!(table.next(Phase::Research), None);
        assert_eq!(table.names(), "explore, plan, commit");
    }

    #[test]
    fn rejects_empty_and_duplicate_lists() {
        assert!(PhaseTable::new(&[]).is_err());
        let err = PhaseTable::new(&[Phase::Plan, Phase::Plan]).expect_err("duplicate");
        assert!(err.contains("plan"));
    }

    #[test]
    fn orchestrator_phases_have_no_actor() {
        let table = PhaseTable::default();
        for phase in [Phase::Implement, Phase::Commit] {
            let spec = table.get(phase).expect("spec");
            assert_eq!(spec.required_actor, None);
            assert!(!spec.allows(ActionKind::SpawnActor));
        }
    }

    #[test]
    fn review_rules_override_applies_to_review_only() {
        let table = PhaseTable::default().with_review_rules(&["verdict".to_string()], 10);
        match &table.get(Phase::Review).expect("review").exit {
            ExitCriterion::Artifact {
                sections,
                min_chars,
                ..
            } => {
                assert_eq!(sections, &vec!["verdict".to_string()]);
                assert_eq!(*min_chars, 10);
            }
            other => panic!("unexpected criterion {other:?}"),
        }
        assert_eq!(
            table.get(Phase::Plan).expect("plan").exit,
            ExitCriterion::artifact(ArtifactKind::Plan)
        );
    }
}
