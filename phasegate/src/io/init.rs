//! Canonical `.phasegate/` paths and scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{GateConfig, write_config};

/// All canonical paths within `.phasegate/` for a workflow root.
#[derive(Debug, Clone)]
pub struct GatePaths {
    pub root: PathBuf,
    pub gate_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
    /// Namespaced state store document.
    pub state_path: PathBuf,
}

impl GatePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let gate_dir = root.join(".phasegate");
        Self {
            root: root.clone(),
            gate_dir: gate_dir.clone(),
            gitignore_path: gate_dir.join(".gitignore"),
            config_path: gate_dir.join("config.toml"),
            state_path: gate_dir.join("state.json"),
        }
    }
}

/// Options for `init_gate`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite an existing config.
    pub force: bool,
}

/// Create `.phasegate/` with a default config and a `.gitignore` for state.
///
/// Fails if the config already exists unless `options.force` is set. The
/// state store is left alone either way.
pub fn init_gate(root: &Path, options: &InitOptions) -> Result<GatePaths> {
    let paths = GatePaths::new(root);
    if paths.gate_dir.exists() && !paths.gate_dir.is_dir() {
        return Err(anyhow!(
            "phasegate init: .phasegate exists but is not a directory"
        ));
    }
    if paths.config_path.exists() && !options.force {
        return Err(anyhow!(
            "phasegate init: {} already exists (use --force to overwrite)",
            paths.config_path.display()
        ));
    }
    fs::create_dir_all(&paths.gate_dir)
        .with_context(|| format!("create directory {}", paths.gate_dir.display()))?;
    fs::write(&paths.gitignore_path, GATE_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;
    write_config(&paths.config_path, &GateConfig::default())?;
    Ok(paths)
}

const GATE_GITIGNORE: &str = "state.json\nstate.json.tmp\nstate.lock\n";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::load_config;

    #[test]
    fn init_creates_config_and_gitignore() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_gate(temp.path(), &InitOptions { force: false }).expect("init");
        assert!(paths.gate_dir.is_dir());
        assert_eq!(
            fs::read_to_string(&paths.gitignore_path).expect("read"),
            GATE_GITIGNORE
        );
        assert_eq!(
            load_config(&paths.config_path).expect("load"),
            GateConfig::default()
        );
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_gate(temp.path(), &InitOptions { force: false }).expect("init");
        fs::write(&paths.config_path, "namespace = \"custom\"\n").expect("write");

        let err = init_gate(temp.path(), &InitOptions { force: false }).expect_err("exists");
        assert!(err.to_string().contains("--force"));
        assert_eq!(
            load_config(&paths.config_path).expect("load").namespace,
            "custom"
        );

        init_gate(temp.path(), &InitOptions { force: true }).expect("force");
        assert_eq!(
            load_config(&paths.config_path).expect("load").namespace,
            "implement_flow"
        );
    }

    #[test]
    fn init_keeps_existing_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = GatePaths::new(temp.path());
        fs::create_dir_all(&paths.gate_dir).expect("mkdir");
        fs::write(&paths.state_path, "{\"ns\":{}}").expect("write");
        init_gate(temp.path(), &InitOptions { force: false }).expect("init");
        assert_eq!(
            fs::read_to_string(&paths.state_path).expect("read"),
            "{\"ns\":{}}"
        );
    }
}
