//! Change tracking through `git status`.
//!
//! Completion checks only need the list of changed paths, so the adapter is a
//! single bounded `git status --porcelain` call scoped to the workflow root.
//! Reported paths are relative to the repository top level.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::process::run_command_with_timeout;

/// Pathspec excluding gate-owned files. Pathspecs resolve against the
/// working directory, so this holds when the root is a repository subdirectory.
const EXCLUDE_GATE_DIR: &str = ":(exclude).phasegate";

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Source of "which files changed" for completion checks.
pub trait ChangeSource {
    /// Changed paths relative to the workflow root. Failures and timeouts
    /// yield an empty list.
    fn changed_paths(&self) -> Vec<String>;
}

/// Wrapper for executing git in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
        }
    }

    /// Get status entries (including untracked) in porcelain format.
    #[instrument(skip_all)]
    pub fn status_porcelain(&self) -> Result<Vec<StatusEntry>> {
        let mut cmd = Command::new("git");
        cmd.args(["status", "--porcelain=v1", "-uall", "--", ".", EXCLUDE_GATE_DIR])
            .current_dir(&self.workdir);
        let output = run_command_with_timeout(cmd, self.timeout)?;
        if output.timed_out {
            return Err(anyhow!("git status timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git status failed: {}", stderr.trim()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut entries = Vec::new();
        for line in stdout.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line)?);
        }
        debug!(count = entries.len(), "git status parsed");
        Ok(entries)
    }
}

impl ChangeSource for Git {
    fn changed_paths(&self) -> Vec<String> {
        match self.status_porcelain() {
            Ok(entries) => entries.into_iter().map(|entry| entry.path).collect(),
            Err(err) => {
                let err = format!("{err:#}");
                warn!(err = %err, "change tracking unavailable, treating as no changes");
                Vec::new()
            }
        }
    }
}

fn parse_status_line(line: &str) -> Result<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Ok(StatusEntry {
            code: "??".to_string(),
            path: unquote(path.trim()),
        });
    }
    if line.len() < 4 {
        return Err(anyhow!("unexpected porcelain line: '{line}'"));
    }
    let code = line[..2].to_string();
    let mut path = line[3..].trim().to_string();
    if let Some((_, new)) = path.split_once(" -> ") {
        path = new.trim().to_string();
    }
    Ok(StatusEntry {
        code,
        path: unquote(&path),
    })
}

/// Git quotes paths containing spaces or unusual bytes.
fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}
