//! Maintenance subcommands: status, reset, init, artifact.
//!
//! Each command returns the text to print so tests can assert on it.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::core::types::ArtifactKind;
use crate::io::artifacts::ArtifactLocator;
use crate::io::config::{GateConfig, load_config};
use crate::io::init::{GatePaths, InitOptions, init_gate};
use crate::io::session::SessionStore;
use crate::io::store::FileStore;

fn load(root: &Path) -> Result<(GatePaths, GateConfig)> {
    let paths = GatePaths::new(root);
    let config = load_config(&paths.config_path).context("load config")?;
    Ok((paths, config))
}

/// Describe the workflow session.
pub fn status(root: &Path, json: bool) -> Result<String> {
    let (paths, config) = load(root)?;
    let table = config.phase_table()?;
    let store = FileStore::new(&paths.state_path);
    let session = SessionStore::new(&store, &config.namespace).load();
    if json {
        return serde_json::to_string_pretty(&session).context("serialize session");
    }
    if !session.is_active {
        return Ok(format!(
            "status: inactive namespace={} phases={}",
            config.namespace,
            table.names()
        ));
    }
    let phase = session.phase_or(table.initial());
    let mut lines = vec![format!(
        "status: active phase={} ({}/{}) session={}",
        phase,
        table.position(phase).map(|i| i + 1).unwrap_or(0),
        table.specs().len(),
        session.session_id.as_deref().unwrap_or("-")
    )];
    if let Some(started_at) = &session.started_at {
        lines.push(format!("status: started_at={started_at}"));
    }
    let completed: Vec<&str> = session.phases_completed.iter().map(|p| p.as_str()).collect();
    lines.push(format!("status: completed={}", completed.join(",")));
    lines.push(format!("status: spawned={}", session.actors_spawned.join(",")));
    if let Some(spec) = table.get(phase) {
        lines.push(format!("status: exit={}", spec.exit.describe()));
    }
    Ok(lines.join("\n"))
}

/// Return the session to inactive.
pub fn reset(root: &Path) -> Result<String> {
    let (paths, config) = load(root)?;
    let store = FileStore::new(&paths.state_path);
    let sessions = SessionStore::new(&store, &config.namespace);
    let was_active = sessions.load().is_active;
    sessions.reset()?;
    info!(was_active, "session reset from cli");
    Ok(if was_active {
        "reset: workflow session cleared".to_string()
    } else {
        "reset: no active session".to_string()
    })
}

/// Scaffold `.phasegate/`.
pub fn init(root: &Path, force: bool) -> Result<String> {
    let paths = init_gate(root, &InitOptions { force })?;
    Ok(format!("init: wrote {}", paths.config_path.display()))
}

/// Expected deliverable path for `kind` written today, plus any existing
/// match for the session.
pub fn artifact(
    root: &Path,
    kind: ArtifactKind,
    session_id: &str,
    now: DateTime<Local>,
) -> Result<String> {
    let (_, config) = load(root)?;
    let locator = ArtifactLocator::new(root, &config);
    let mut lines = vec![
        locator
            .expected_path(kind, session_id, now)
            .display()
            .to_string(),
    ];
    if let Some(existing) = locator.find(kind, session_id)? {
        lines.push(format!("existing: {}", existing.display()));
    }
    Ok(lines.join("\n"))
}
