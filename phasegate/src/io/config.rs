//! Gate configuration stored under `.phasegate/config.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::action::Classifier;
use crate::core::phases::PhaseTable;
use crate::core::security::{DEFAULT_SAFE_DIRS, SecurityFilter};
use crate::core::types::Phase;

/// Gate configuration (TOML).
///
/// Missing fields default to the canonical eight-phase workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// Ordered phase list for this workflow.
    pub phases: Vec<Phase>,

    /// State store namespace holding this workflow's session keys.
    pub namespace: String,

    /// Root directory for deliverables, relative to the workflow root.
    pub artifacts_dir: String,

    /// JSON file with `current_milestone` and `milestone_description`.
    pub milestone_status: String,

    /// Upper bound for `git status` before treating it as "no changes".
    pub git_timeout_ms: u64,

    /// Extensions (without dot) counted as source code.
    pub source_extensions: Vec<String>,

    /// Regexes identifying version-control commands in shell input.
    pub vcs_command_patterns: Vec<String>,

    pub commands: CommandConfig,
    pub security: SecurityConfig,
    pub review: ReviewConfig,
}

/// Slash command names (without `/`) that control the session.
///
/// `activate` wins over a phase of the same name, so with the defaults the
/// implement phase is requested through its `code` alias.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    pub activate: String,
    pub cancel: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            activate: "implement".to_string(),
            cancel: "cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Path segments exempt from the critical path check.
    pub safe_dirs: Vec<String>,
    pub extra_critical_paths: Vec<String>,
    /// Regexes matched against the lowercased shell command.
    pub extra_critical_commands: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            safe_dirs: DEFAULT_SAFE_DIRS.iter().map(|s| s.to_string()).collect(),
            extra_critical_paths: Vec::new(),
            extra_critical_commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReviewConfig {
    pub required_sections: Vec<String>,
    pub min_chars: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            required_sections: vec!["summary".to_string(), "findings".to_string()],
            min_chars: 200,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            phases: Phase::ALL.to_vec(),
            namespace: "implement_flow".to_string(),
            artifacts_dir: "project".to_string(),
            milestone_status: "project/status.json".to_string(),
            git_timeout_ms: 5_000,
            source_extensions: ["py", "js", "ts", "tsx", "jsx", "css", "html", "rs", "go"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vcs_command_patterns: vec![r"\bgit\s+(commit|push)\b".to_string()],
            commands: CommandConfig::default(),
            security: SecurityConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        PhaseTable::new(&self.phases).map_err(|err| anyhow!("phases: {err}"))?;
        if self.namespace.trim().is_empty() {
            return Err(anyhow!("namespace must not be empty"));
        }
        if self.artifacts_dir.trim().trim_matches('/').is_empty() {
            return Err(anyhow!("artifacts_dir must not be empty"));
        }
        if self.git_timeout_ms == 0 {
            return Err(anyhow!("git_timeout_ms must be > 0"));
        }
        for (label, name) in [
            ("commands.activate", &self.commands.activate),
            ("commands.cancel", &self.commands.cancel),
        ] {
            if name.trim().is_empty() || name.starts_with('/') {
                return Err(anyhow!("{label} must be a bare command name"));
            }
        }
        if self.commands.cancel.parse::<Phase>().is_ok() {
            return Err(anyhow!(
                "commands.cancel '{}' collides with a phase name",
                self.commands.cancel
            ));
        }
        if self.commands.activate == self.commands.cancel {
            return Err(anyhow!("commands.activate and commands.cancel must differ"));
        }
        self.classifier()?;
        Ok(())
    }

    /// Phase table with review rules applied.
    pub fn phase_table(&self) -> Result<PhaseTable> {
        let table = PhaseTable::new(&self.phases).map_err(|err| anyhow!("phases: {err}"))?;
        Ok(table.with_review_rules(&self.review.required_sections, self.review.min_chars))
    }

    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::new(
            &self.artifacts_dir,
            &self.source_extensions,
            &self.vcs_command_patterns,
        )
        .context("compile vcs_command_patterns")
    }

    /// Not checked by `validate`: a filter that fails to build is handled by
    /// the caller under [`crate::core::security::ON_INTERNAL_ERROR`].
    pub fn security_filter(&self) -> Result<SecurityFilter> {
        SecurityFilter::new(
            &self.security.safe_dirs,
            &self.security.extra_critical_paths,
            &self.security.extra_critical_commands,
        )
        .context("compile security.extra_critical_commands")
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GateConfig::default()`.
pub fn load_config(path: &Path) -> Result<GateConfig> {
    if !path.exists() {
        let cfg = GateConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GateConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GateConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf, "toml.tmp")
}
