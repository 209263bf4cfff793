//! Stateless veto for catastrophic file writes and shell commands.
//!
//! Runs before the phase gate on every write or shell tool call, with or
//! without an active session. Internal failures follow [`ON_INTERNAL_ERROR`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::event::ToolCall;
use crate::core::types::FailurePolicy;

/// A filter that cannot be built or evaluated lets the action through.
pub const ON_INTERNAL_ERROR: FailurePolicy = FailurePolicy::FailOpen;

/// Substrings of paths that must never be written.
pub const CRITICAL_PATHS: &[&str] = &[
    "/etc/passwd",
    "/etc/shadow",
    "/boot/",
    "/sys/",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
];

/// Path segments that mark a write as inside the project.
pub const DEFAULT_SAFE_DIRS: &[&str] = &["/.claude/", "/src/", "/tests/"];

/// `(label, regex)` pairs matched against the lowercased command.
const CRITICAL_COMMANDS: &[(&str, &str)] = &[
    (
        "rm -rf /",
        r"\brm\s+(?:-[a-z]*r[a-z]*f[a-z]*|-[a-z]*f[a-z]*r[a-z]*|-r\s+-f|-f\s+-r)\s+(?:--no-preserve-root\s+)?/(?:\*|etc|boot|sys)?/?(?:\s|$|[;&|])",
    ),
    ("dd if=/dev/zero of=/dev/", r"\bdd\s+if=/dev/(?:zero|random|urandom)\s+of=/dev/"),
    ("mkfs", r"\bmkfs\.(?:ext[234]?|xfs|btrfs)\b"),
    ("> /dev/sd", r">\s*/dev/(?:sd[a-z]|nvme\d)"),
    (":(){ :|:& };:", r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:"),
    ("chmod -r 777 /", r"\bchmod\s+-r\s+777\s+/(?:\s|$|[;&|])"),
];

static BUILTIN_COMMANDS: LazyLock<Vec<(String, Regex)>> = LazyLock::new(|| {
    CRITICAL_COMMANDS
        .iter()
        .map(|(label, pattern)| {
            let re = Regex::new(pattern).expect("builtin command pattern should be valid");
            (label.to_string(), re)
        })
        .collect()
});

/// Why the filter vetoed an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityBlock {
    CriticalPath { pattern: String },
    CriticalCommand { pattern: String },
}

impl fmt::Display for SecurityBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityBlock::CriticalPath { pattern } => {
                write!(f, "Attempting to modify critical system file: {pattern}")
            }
            SecurityBlock::CriticalCommand { pattern } => {
                write!(f, "CRITICAL: System-damaging command detected: {pattern}")
            }
        }
    }
}

impl std::error::Error for SecurityBlock {}

#[derive(Debug, Clone)]
pub struct SecurityFilter {
    critical_paths: Vec<String>,
    safe_dirs: Vec<String>,
    commands: Vec<(String, Regex)>,
}

impl Default for SecurityFilter {
    fn default() -> Self {
        Self {
            critical_paths: CRITICAL_PATHS.iter().map(|s| s.to_string()).collect(),
            safe_dirs: DEFAULT_SAFE_DIRS.iter().map(|s| s.to_string()).collect(),
            commands: BUILTIN_COMMANDS.clone(),
        }
    }
}

impl SecurityFilter {
    /// Builtin patterns plus configured additions.
    ///
    /// `safe_dirs` replaces the default safe directory list. Extra command
    /// patterns are regexes matched against the lowercased command.
    pub fn new(
        safe_dirs: &[String],
        extra_paths: &[String],
        extra_commands: &[String],
    ) -> Result<Self, regex::Error> {
        let mut filter = Self {
            safe_dirs: safe_dirs.to_vec(),
            ..Self::default()
        };
        filter.critical_paths.extend(extra_paths.iter().cloned());
        for pattern in extra_commands {
            let re = Regex::new(&pattern.to_lowercase())?;
            filter.commands.push((pattern.clone(), re));
        }
        Ok(filter)
    }

    /// Veto check for one tool call. Calls other than writes and shell
    /// commands always pass.
    pub fn check(&self, call: &ToolCall) -> Result<(), SecurityBlock> {
        match call {
            ToolCall::FileWrite { path, .. } => self.check_path(path),
            ToolCall::Shell { command } => self.check_command(command),
            ToolCall::Spawn { .. } | ToolCall::Other { .. } => Ok(()),
        }
    }

    fn check_path(&self, path: &str) -> Result<(), SecurityBlock> {
        let normalized = path.replace('\\', "/");
        if self.safe_dirs.iter().any(|dir| normalized.contains(dir.as_str())) {
            return Ok(());
        }
        match self
            .critical_paths
            .iter()
            .find(|pattern| normalized.contains(pattern.as_str()))
        {
            Some(pattern) => Err(SecurityBlock::CriticalPath {
                pattern: pattern.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_command(&self, command: &str) -> Result<(), SecurityBlock> {
        let lowered = command.to_lowercase();
        match self.commands.iter().find(|(_, re)| re.is_match(&lowered)) {
            Some((label, _)) => Err(SecurityBlock::CriticalCommand {
                pattern: label.clone(),
            }),
            None => Ok(()),
        }
    }
}
