//! I/O helpers for gate commands.

pub mod artifacts;
pub mod config;
pub mod git;
pub mod guidance;
pub mod init;
pub mod process;
pub mod session;
pub mod store;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `contents` next to `path` with `tmp_ext`, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &str, tmp_ext: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension(tmp_ext);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
