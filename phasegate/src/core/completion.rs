//! Exit-criterion evaluation over gathered evidence.
//!
//! Evidence collection (globbing, reading files, asking git) lives in `io`.
//! This module only decides whether the evidence satisfies a phase.

use std::fmt;
use std::path::Path;

use crate::core::frontmatter::{has_marker, missing_sections};
use crate::core::phases::ExitCriterion;
use crate::core::types::ArtifactKind;

/// A located deliverable and its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDoc {
    pub path: String,
    pub contents: String,
}

/// What the io layer found for a phase's exit criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    Artifact {
        /// Lookup pattern, quoted in the block reason when nothing matched.
        expected: String,
        found: Option<ArtifactDoc>,
    },
    /// Paths reported as changed by the change tracker.
    Changes(Vec<String>),
    /// No session id to key the artifact lookup on.
    NoSession,
}

/// Why a phase is not complete yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incomplete {
    MissingArtifact {
        kind: ArtifactKind,
        expected: String,
    },
    MissingMarker {
        path: String,
        field: String,
        expected: String,
    },
    MissingSections {
        path: String,
        missing: Vec<String>,
    },
    TooShort {
        path: String,
        chars: usize,
        min: usize,
    },
    NoSourceChanges,
    UncommittedChanges {
        count: usize,
        sample: Vec<String>,
    },
    NoSession,
    /// Evidence does not fit the criterion; only reachable through a bug in
    /// the caller.
    Mismatch,
}

impl fmt::Display for Incomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incomplete::MissingArtifact { kind, expected } => write!(
                f,
                "The {} document has not been created. Continue working.\nExpected: {expected}",
                kind.prefix()
            ),
            Incomplete::MissingMarker {
                path,
                field,
                expected,
            } => write!(
                f,
                "{path} has not been validated yet. Add `{field}: {expected}` to its frontmatter when the review is done."
            ),
            Incomplete::MissingSections { path, missing } => write!(
                f,
                "{path} is incomplete. Missing sections: {}",
                missing.join(", ")
            ),
            Incomplete::TooShort { path, chars, min } => {
                write!(f, "{path} is too short ({chars} chars, need {min}+)")
            }
            Incomplete::NoSourceChanges => f.write_str(
                "No source files have been modified yet. Implement the planned changes before finishing this phase.",
            ),
            Incomplete::UncommittedChanges { count, sample } => {
                write!(
                    f,
                    "There are {count} uncommitted change(s). Commit them before finishing: {}",
                    sample.join(", ")
                )?;
                if *count > sample.len() {
                    write!(f, ", ...")?;
                }
                Ok(())
            }
            Incomplete::NoSession => {
                f.write_str("No session id is recorded for this workflow; cannot locate deliverables.")
            }
            Incomplete::Mismatch => f.write_str("Completion evidence could not be evaluated."),
        }
    }
}

impl std::error::Error for Incomplete {}

const UNCOMMITTED_SAMPLE: usize = 5;

/// Decide whether `evidence` satisfies `criterion`.
pub fn evaluate(
    criterion: &ExitCriterion,
    evidence: &Evidence,
    source_extensions: &[String],
) -> Result<(), Incomplete> {
    match (criterion, evidence) {
        (_, Evidence::NoSession) => Err(Incomplete::NoSession),
        (
            ExitCriterion::Artifact {
                kind,
                marker,
                sections,
                min_chars,
            },
            Evidence::Artifact { expected, found },
        ) => {
            let Some(doc) = found else {
                return Err(Incomplete::MissingArtifact {
                    kind: *kind,
                    expected: expected.clone(),
                });
            };
            let chars = doc.contents.chars().count();
            if chars < *min_chars {
                return Err(Incomplete::TooShort {
                    path: doc.path.clone(),
                    chars,
                    min: *min_chars,
                });
            }
            let missing = missing_sections(&doc.contents, sections);
            if !missing.is_empty() {
                return Err(Incomplete::MissingSections {
                    path: doc.path.clone(),
                    missing,
                });
            }
            if let Some(marker) = marker
                && !has_marker(&doc.contents, &marker.field, &marker.accepted)
            {
                return Err(Incomplete::MissingMarker {
                    path: doc.path.clone(),
                    field: marker.field.clone(),
                    expected: marker.accepted.first().cloned().unwrap_or_default(),
                });
            }
            Ok(())
        }
        (ExitCriterion::SourceChanges, Evidence::Changes(paths)) => {
            if paths.iter().any(|p| is_source_file(p, source_extensions)) {
                Ok(())
            } else {
                Err(Incomplete::NoSourceChanges)
            }
        }
        (ExitCriterion::CleanWorktree, Evidence::Changes(paths)) => {
            if paths.is_empty() {
                Ok(())
            } else {
                Err(Incomplete::UncommittedChanges {
                    count: paths.len(),
                    sample: paths.iter().take(UNCOMMITTED_SAMPLE).cloned().collect(),
                })
            }
        }
        _ => Err(Incomplete::Mismatch),
    }
}

fn is_source_file(path: &str, source_extensions: &[String]) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    source_extensions
        .iter()
        .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
