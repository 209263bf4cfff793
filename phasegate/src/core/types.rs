//! Closed identifiers shared by the gate core.
//!
//! Phases, actors and action kinds are enumerations rather than strings so an
//! unknown identifier can only appear at the decoding boundary, never inside
//! the decision logic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named workflow stage. Ordering comes from the active phase table, not
/// from the declaration order here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Explore,
    Research,
    ResearchReview,
    Plan,
    PlanReview,
    #[serde(alias = "code")]
    Implement,
    #[serde(alias = "code-review")]
    Review,
    Commit,
}

impl Phase {
    /// Every known phase in canonical order.
    pub const ALL: [Phase; 8] = [
        Phase::Explore,
        Phase::Research,
        Phase::ResearchReview,
        Phase::Plan,
        Phase::PlanReview,
        Phase::Implement,
        Phase::Review,
        Phase::Commit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Explore => "explore",
            Phase::Research => "research",
            Phase::ResearchReview => "research-review",
            Phase::Plan => "plan",
            Phase::PlanReview => "plan-review",
            Phase::Implement => "implement",
            Phase::Review => "review",
            Phase::Commit => "commit",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a name does not denote a known phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPhase(pub String);

impl fmt::Display for UnknownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase '{}'", self.0)
    }
}

impl std::error::Error for UnknownPhase {}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        let phase = match normalized.as_str() {
            "explore" => Phase::Explore,
            "research" => Phase::Research,
            "research-review" => Phase::ResearchReview,
            "plan" => Phase::Plan,
            "plan-review" => Phase::PlanReview,
            "implement" | "code" => Phase::Implement,
            "review" | "code-review" => Phase::Review,
            "commit" => Phase::Commit,
            _ => return Err(UnknownPhase(s.trim().to_string())),
        };
        Ok(phase)
    }
}

/// A delegated specialist that may own a phase's main work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Actor {
    CodebaseExplorer,
    ResearchSpecialist,
    ResearchConsultant,
    StrategicPlanner,
    PlanConsultant,
    CodeReviewer,
}

impl Actor {
    pub fn as_str(self) -> &'static str {
        match self {
            Actor::CodebaseExplorer => "codebase-explorer",
            Actor::ResearchSpecialist => "research-specialist",
            Actor::ResearchConsultant => "research-consultant",
            Actor::StrategicPlanner => "strategic-planner",
            Actor::PlanConsultant => "plan-consultant",
            Actor::CodeReviewer => "code-reviewer",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let actor = match normalize(s).as_str() {
            "codebase-explorer" | "explorer" => Actor::CodebaseExplorer,
            "research-specialist" => Actor::ResearchSpecialist,
            "research-consultant" => Actor::ResearchConsultant,
            "strategic-planner" | "planner" => Actor::StrategicPlanner,
            "plan-consultant" | "consulting-expert" => Actor::PlanConsultant,
            "code-reviewer" | "reviewer" => Actor::CodeReviewer,
            _ => return None,
        };
        Some(actor)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actor identity as named by an event. Unrecognized names are preserved so
/// block reasons can quote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorName {
    Known(Actor),
    Unknown(String),
}

impl ActorName {
    pub fn parse(s: &str) -> Self {
        match Actor::parse(s) {
            Some(actor) => ActorName::Known(actor),
            None => ActorName::Unknown(s.trim().to_string()),
        }
    }

    pub fn is(&self, actor: Actor) -> bool {
        matches!(self, ActorName::Known(a) if *a == actor)
    }
}

impl fmt::Display for ActorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorName::Known(actor) => f.write_str(actor.as_str()),
            ActorName::Unknown(name) => f.write_str(name),
        }
    }
}

/// Kinds of gated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    SpawnActor,
    WriteCode,
    WriteDeliverable,
    RunVcsCommand,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::SpawnActor => "spawn-actor",
            ActionKind::WriteCode => "write-code",
            ActionKind::WriteDeliverable => "write-deliverable",
            ActionKind::RunVcsCommand => "run-vcs-command",
        }
    }
}

/// Reaction of a component to its own internal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Let the action through as if the component had found nothing.
    FailOpen,
    /// Treat unreadable persisted state as empty.
    FailEmpty,
}

/// Deliverable document families, each with its own directory and file prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    CodebaseStatus,
    Research,
    Plan,
    Review,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::CodebaseStatus,
        ArtifactKind::Research,
        ArtifactKind::Plan,
        ArtifactKind::Review,
    ];

    /// Directory under the artifacts root.
    pub fn dir(self) -> &'static str {
        match self {
            ArtifactKind::CodebaseStatus => "exploration",
            ArtifactKind::Research => "researches",
            ArtifactKind::Plan => "plans",
            ArtifactKind::Review => "reviews",
        }
    }

    /// File name prefix, followed by `_{session_id}_{MMDDYY}.md`.
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::CodebaseStatus => "codebase-status",
            ArtifactKind::Research => "research",
            ArtifactKind::Plan => "plan",
            ArtifactKind::Review => "review",
        }
    }

    /// Match a file name against the known prefixes.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if !name.ends_with(".md") {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|kind| name.starts_with(&format!("{}_", kind.prefix())))
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "codebase-status" | "exploration" => Ok(ArtifactKind::CodebaseStatus),
            "research" => Ok(ArtifactKind::Research),
            "plan" => Ok(ArtifactKind::Plan),
            "review" => Ok(ArtifactKind::Review),
            other => Err(format!("unknown artifact kind '{other}'")),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}
