//! Deliverable lookup under the artifacts directory.
//!
//! Layout: `{artifacts_dir}[/{milestone}:{description}]/{kind dir}/{prefix}_{session}_{MMDDYY}.md`.
//! The milestone segment is present only when the milestone status file names
//! both a milestone and a description. Lookups ignore the date stamp.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use glob::Pattern;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::completion::{ArtifactDoc, Evidence};
use crate::core::types::ArtifactKind;
use crate::io::config::GateConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MilestoneStatus {
    current_milestone: String,
    milestone_description: String,
}

/// Resolves deliverable paths for one workflow root.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    artifacts_root: PathBuf,
    milestone_status: PathBuf,
}

impl ArtifactLocator {
    pub fn new(root: &Path, config: &GateConfig) -> Self {
        Self {
            artifacts_root: root.join(config.artifacts_dir.trim_matches('/')),
            milestone_status: root.join(&config.milestone_status),
        }
    }

    /// `{milestone}:{description}` from the status file, if both are set.
    pub fn milestone_segment(&self) -> Option<String> {
        let contents = fs::read_to_string(&self.milestone_status).ok()?;
        let status: MilestoneStatus = match serde_json::from_str(&contents) {
            Ok(status) => status,
            Err(err) => {
                warn!(path = %self.milestone_status.display(), err = %err, "milestone status unreadable");
                return None;
            }
        };
        let milestone = status.current_milestone.trim();
        let description = status.milestone_description.trim();
        if milestone.is_empty() || description.is_empty() {
            return None;
        }
        Some(format!("{milestone}:{description}"))
    }

    /// Directory holding artifacts of `kind` for the current milestone.
    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        let mut dir = self.artifacts_root.clone();
        if let Some(segment) = self.milestone_segment() {
            dir.push(segment);
        }
        dir.push(kind.dir());
        dir
    }

    /// Path an actor should write today.
    pub fn expected_path(
        &self,
        kind: ArtifactKind,
        session_id: &str,
        now: DateTime<Local>,
    ) -> PathBuf {
        self.kind_dir(kind).join(format!(
            "{}_{}_{}.md",
            kind.prefix(),
            session_id,
            now.format("%m%d%y")
        ))
    }

    /// Glob pattern matching any date stamp for this session.
    pub fn lookup_pattern(&self, kind: ArtifactKind, session_id: &str) -> String {
        let dir = Pattern::escape(&self.kind_dir(kind).to_string_lossy());
        format!(
            "{dir}/{}_{}_*.md",
            kind.prefix(),
            Pattern::escape(session_id)
        )
    }

    /// First matching artifact in sorted path order.
    pub fn find(&self, kind: ArtifactKind, session_id: &str) -> Result<Option<PathBuf>> {
        let pattern = self.lookup_pattern(kind, session_id);
        let mut matches = glob::glob(&pattern)
            .with_context(|| format!("invalid artifact pattern {pattern}"))?
            .filter_map(|entry| match entry {
                Ok(path) if path.is_file() => Some(path),
                Ok(_) => None,
                Err(err) => {
                    warn!(err = %err, "artifact glob entry unreadable");
                    None
                }
            })
            .collect::<Vec<_>>();
        matches.sort();
        debug!(pattern = %pattern, found = matches.len(), "artifact lookup");
        Ok(matches.into_iter().next())
    }

    /// Gather completion evidence for `kind`.
    pub fn evidence(&self, kind: ArtifactKind, session_id: Option<&str>) -> Result<Evidence> {
        let Some(session_id) = session_id else {
            return Ok(Evidence::NoSession);
        };
        let expected = self.lookup_pattern(kind, session_id);
        let found = match self.find(kind, session_id)? {
            Some(path) => {
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))?;
                Some(ArtifactDoc {
                    path: path.display().to_string(),
                    contents,
                })
            }
            None => None,
        };
        Ok(Evidence::Artifact { expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn locator(root: &Path) -> ArtifactLocator {
        ArtifactLocator::new(root, &GateConfig::default())
    }

    #[test]
    fn expected_path_uses_milestone_and_date_stamp() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::create_dir_all(root.join("project")).expect("mkdir");
        fs::write(
            root.join("project/status.json"),
            r#"{"current_milestone":"MS-03","milestone_description":"Auth"}"#,
        )
        .expect("write status");
        let now = Local
            .with_ymd_and_hms(2026, 10, 17, 9, 30, 0)
            .single()
            .expect("time");
        let path = locator(root).expected_path(ArtifactKind::Plan, "abc", now);
        assert_eq!(path, root.join("project/MS-03:Auth/plans/plan_abc_101726.md"));
    }

    #[test]
    fn missing_milestone_falls_back_to_artifacts_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loc = locator(temp.path());
        assert_eq!(loc.milestone_segment(), None);
        assert_eq!(
            loc.kind_dir(ArtifactKind::Review),
            temp.path().join("project/reviews")
        );
    }

    #[test]
    fn find_ignores_date_and_other_sessions() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("project/exploration");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("codebase-status_other_101726.md"), "x").expect("write");
        let loc = locator(temp.path());
        assert_eq!(
            loc.find(ArtifactKind::CodebaseStatus, "s1").expect("find"),
            None
        );

        fs::write(dir.join("codebase-status_s1_010125.md"), "# status").expect("write");
        fs::write(dir.join("codebase-status_s1_101726.md"), "# newer").expect("write");
        let found = loc
            .find(ArtifactKind::CodebaseStatus, "s1")
            .expect("find")
            .expect("match");
        assert_eq!(found, dir.join("codebase-status_s1_010125.md"));
    }

    #[test]
    fn evidence_without_session_is_no_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            locator(temp.path())
                .evidence(ArtifactKind::Plan, None)
                .expect("evidence"),
            Evidence::NoSession
        );
    }

    #[test]
    fn evidence_reads_contents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("project/plans");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("plan_s1_101726.md"), "# Plan\n").expect("write");
        let evidence = locator(temp.path())
            .evidence(ArtifactKind::Plan, Some("s1"))
            .expect("evidence");
        match evidence {
            Evidence::Artifact {
                found: Some(doc), ..
            } => assert_eq!(doc.contents, "# Plan\n"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn session_ids_with_glob_characters_are_literal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let dir = temp.path().join("project/plans");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("plan_abc_101726.md"), "x").expect("write");
        let loc = locator(temp.path());
        assert_eq!(loc.find(ArtifactKind::Plan, "a*").expect("find"), None);
        assert_eq!(loc.find(ArtifactKind::Plan, "[a]bc").expect("find"), None);
    }
}
