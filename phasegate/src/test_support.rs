//! Test-only helpers: raw host events, deliverable fixtures and a scripted
//! change source.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{Value, json};

use crate::core::types::ArtifactKind;
use crate::io::git::ChangeSource;

/// Change source returning whatever paths the test sets.
#[derive(Debug, Default)]
pub struct FakeChanges {
    paths: Mutex<Vec<String>>,
}

impl FakeChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, paths: &[&str]) {
        let mut guard = self.paths.lock().unwrap_or_else(|p| p.into_inner());
        *guard = paths.iter().map(|p| p.to_string()).collect();
    }

    pub fn clear(&self) {
        self.set(&[]);
    }
}

impl ChangeSource for FakeChanges {
    fn changed_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Deterministic clock reading used across tests (2026-10-17 09:00 local).
pub fn fixed_now() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 10, 17, 9, 0, 0)
        .single()
        .expect("fixed test date should be unambiguous")
}

/// Write a deliverable at its default location (no milestone) and return the path.
pub fn write_artifact(root: &Path, kind: ArtifactKind, session_id: &str, body: &str) -> PathBuf {
    let dir = root.join("project").join(kind.dir());
    fs::create_dir_all(&dir).expect("create artifact dir");
    let path = dir.join(format!("{}_{}_101726.md", kind.prefix(), session_id));
    fs::write(&path, body).expect("write artifact");
    path
}

/// Review body satisfying the default section and length rules.
pub fn complete_review() -> String {
    format!(
        "# Review\n\n## Summary\nThe change is small and focused.\n\n## Findings\n{}\n",
        "No blocking issues were found in the diff. ".repeat(6)
    )
}

pub fn prompt_event(session_id: &str, prompt: &str) -> String {
    json!({
        "hook_event_name": "UserPromptSubmit",
        "session_id": session_id,
        "prompt": prompt,
    })
    .to_string()
}

pub fn tool_event(session_id: &str, tool_name: &str, tool_input: Value) -> String {
    json!({
        "hook_event_name": "PreToolUse",
        "session_id": session_id,
        "tool_name": tool_name,
        "tool_input": tool_input,
    })
    .to_string()
}

pub fn spawn_event(session_id: &str, actor: &str) -> String {
    tool_event(
        session_id,
        "Task",
        json!({ "subagent_type": actor, "prompt": "do the work" }),
    )
}

pub fn write_event(session_id: &str, path: &str) -> String {
    tool_event(
        session_id,
        "Write",
        json!({ "file_path": path, "content": "x" }),
    )
}

pub fn bash_event(session_id: &str, command: &str) -> String {
    tool_event(session_id, "Bash", json!({ "command": command }))
}

pub fn subagent_stop_event(session_id: &str, actor: &str) -> String {
    json!({
        "hook_event_name": "SubagentStop",
        "session_id": session_id,
        "agent_type": actor,
    })
    .to_string()
}

pub fn stop_event(session_id: &str) -> String {
    json!({ "hook_event_name": "Stop", "session_id": session_id }).to_string()
}
