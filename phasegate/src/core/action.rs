//! Map tool calls onto gated action kinds.

use std::path::Path;

use regex::Regex;

use crate::core::event::ToolCall;
use crate::core::types::{ActionKind, ActorName, ArtifactKind};

/// A gated action derived from a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SpawnActor { actor: ActorName },
    WriteCode { path: String },
    WriteDeliverable { path: String, kind: ArtifactKind },
    RunVcsCommand { command: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SpawnActor { .. } => ActionKind::SpawnActor,
            Action::WriteCode { .. } => ActionKind::WriteCode,
            Action::WriteDeliverable { .. } => ActionKind::WriteDeliverable,
            Action::RunVcsCommand { .. } => ActionKind::RunVcsCommand,
        }
    }
}

/// Classification rules built from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    artifacts_dir: String,
    source_extensions: Vec<String>,
    vcs_patterns: Vec<Regex>,
}

impl Classifier {
    pub fn new(
        artifacts_dir: &str,
        source_extensions: &[String],
        vcs_patterns: &[String],
    ) -> Result<Self, regex::Error> {
        let vcs_patterns = vcs_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            artifacts_dir: artifacts_dir.trim_matches('/').to_string(),
            source_extensions: source_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            vcs_patterns,
        })
    }

    /// Classify a tool call. `None` means the gate has no opinion.
    pub fn classify(&self, call: &ToolCall) -> Option<Action> {
        match call {
            ToolCall::Spawn { actor } => Some(Action::SpawnActor {
                actor: actor.clone(),
            }),
            ToolCall::FileWrite { path, .. } => self.classify_path(path),
            ToolCall::Shell { command } => self
                .vcs_patterns
                .iter()
                .any(|re| re.is_match(command))
                .then(|| Action::RunVcsCommand {
                    command: command.clone(),
                }),
            ToolCall::Other { .. } => None,
        }
    }

    fn classify_path(&self, path: &str) -> Option<Action> {
        if let Some(kind) = self.deliverable_kind(path) {
            return Some(Action::WriteDeliverable {
                path: path.to_string(),
                kind,
            });
        }
        let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
        self.source_extensions
            .contains(&ext)
            .then(|| Action::WriteCode {
                path: path.to_string(),
            })
    }

    /// Deliverables sit in `{artifacts_dir}/.../{kind dir}/{prefix}_*.md`.
    fn deliverable_kind(&self, path: &str) -> Option<ArtifactKind> {
        let normalized = path.replace('\\', "/");
        let as_path = Path::new(&normalized);
        let file_name = as_path.file_name()?.to_str()?;
        let kind = ArtifactKind::from_file_name(file_name)?;
        let parent = as_path.parent()?.file_name()?.to_str()?;
        if parent != kind.dir() {
            return None;
        }
        let marker = format!("/{}/", self.artifacts_dir);
        let rooted = format!("/{}", normalized.trim_start_matches('/'));
        rooted.contains(&marker).then_some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Actor;

    fn classifier() -> Classifier {
        Classifier::new(
            "project",
            &["ts".to_string(), ".py".to_string()],
            &[r"\bgit\s+(commit|push)\b".to_string()],
        )
        .expect("classifier")
    }

    fn write(path: &str) -> ToolCall {
        ToolCall::FileWrite {
            tool: "Write".to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn source_files_are_code() {
        let action = classifier().classify(&write("/repo/src/App.TS")).expect("action");
        assert_eq!(action.kind(), ActionKind::WriteCode);
        assert_eq!(classifier().classify(&write("/repo/README.md")), None);
        assert_eq!(classifier().classify(&write("/repo/Makefile")), None);
    }

    #[test]
    fn deliverables_need_artifacts_dir_and_kind_dir() {
        let c = classifier();
        assert_eq!(
            c.classify(&write("/repo/project/MS-01:Auth/plans/plan_s1_101726.md")),
            Some(Action::WriteDeliverable {
                path: "/repo/project/MS-01:Auth/plans/plan_s1_101726.md".to_string(),
                kind: ArtifactKind::Plan
            })
        );
        assert_eq!(
            c.classify(&write("project/exploration/codebase-status_s1_101726.md"))
                .map(|a| a.kind()),
            Some(ActionKind::WriteDeliverable)
        );
        assert_eq!(c.classify(&write("/repo/docs/plans/plan_s1_101726.md")), None);
        assert_eq!(c.classify(&write("/repo/project/reviews/plan_s1_101726.md")), None);
    }

    #[test]
    fn vcs_commands_match_patterns() {
        let c = classifier();
        let commit = ToolCall::Shell {
            command: "git add -A && git commit -m 'wip'".to_string(),
        };
        assert_eq!(c.classify(&commit).map(|a| a.kind()), Some(ActionKind::RunVcsCommand));
        let status = ToolCall::Shell {
            command: "git status".to_string(),
        };
        assert_eq!(c.classify(&status), None);
    }

    #[test]
    fn spawn_passes_actor_through() {
        let call = ToolCall::Spawn {
            actor: ActorName::Known(Actor::CodeReviewer),
        };
        assert_eq!(
            classifier().classify(&call),
            Some(Action::SpawnActor {
                actor: ActorName::Known(Actor::CodeReviewer)
            })
        );
    }

    #[test]
    fn invalid_vcs_pattern_is_an_error() {
        assert!(Classifier::new("project", &[], &["(".to_string()]).is_err());
    }
}
