//! CLI tests for `phasegate hook` and the maintenance subcommands.
//!
//! Spawns the phasegate binary and verifies exit codes and stream contents
//! match the host protocol.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use phasegate::core::types::ArtifactKind;
use phasegate::exit_codes;
use phasegate::io::init::{GatePaths, InitOptions, init_gate};
use phasegate::test_support::{
    bash_event, prompt_event, spawn_event, subagent_stop_event, write_artifact,
};

fn phasegate(root: &std::path::Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_phasegate"))
        .args(args)
        .arg("--root")
        .arg(root)
        .env_remove("CLAUDE_PROJECT_DIR")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn phasegate");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait phasegate")
}

fn hook(root: &std::path::Path, event: &str) -> Output {
    phasegate(root, &["hook"], event)
}

#[test]
fn activation_prints_host_json_and_allows() {
    let temp = tempfile::tempdir().expect("tempdir");
    init_gate(temp.path(), &InitOptions { force: false }).expect("init");

    let out = hook(temp.path(), &prompt_event("s1", "/implement"));
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json stdout");
    assert_eq!(value["hookSpecificOutput"]["hookEventName"], "UserPromptSubmit");
    let context = value["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .expect("context");
    assert!(context.contains("Workflow phase: explore (1/8)"));
    assert!(GatePaths::new(temp.path()).state_path.is_file());
}

#[test]
fn blocked_action_exits_with_block_code_and_reason() {
    let temp = tempfile::tempdir().expect("tempdir");
    hook(temp.path(), &prompt_event("s1", "/implement"));

    let out = hook(temp.path(), &spawn_event("s1", "strategic-planner"));
    assert_eq!(out.status.code(), Some(exit_codes::BLOCK));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("requires the 'codebase-explorer' actor"));
    assert!(out.stdout.is_empty());
}

#[test]
fn completion_signal_advances_across_invocations() {
    let temp = tempfile::tempdir().expect("tempdir");
    hook(temp.path(), &prompt_event("s1", "/implement"));
    write_artifact(temp.path(), ArtifactKind::CodebaseStatus, "s1", "# status\n");

    let out = hook(temp.path(), &subagent_stop_event("s1", "codebase-explorer"));
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
    assert!(String::from_utf8_lossy(&out.stdout).contains("Now in 'research'"));

    let status = phasegate(temp.path(), &["status", "--json"], "");
    assert_eq!(status.status.code(), Some(exit_codes::ALLOW));
    let value: serde_json::Value = serde_json::from_slice(&status.stdout).expect("json");
    assert_eq!(value["current_phase"], "research");
    assert_eq!(value["phases_completed"], serde_json::json!(["explore"]));
}

#[test]
fn malformed_input_and_unknown_events_allow() {
    let temp = tempfile::tempdir().expect("tempdir");
    for input in ["", "not json", "[1,2]", r#"{"hook_event_name":"Notification"}"#] {
        let out = hook(temp.path(), input);
        assert_eq!(out.status.code(), Some(exit_codes::ALLOW), "input: {input}");
    }
}

#[test]
fn critical_command_blocks_without_session() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = hook(temp.path(), &bash_event("s1", "rm -rf /"));
    assert_eq!(out.status.code(), Some(exit_codes::BLOCK));
}

#[test]
fn reset_and_init_subcommands() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = phasegate(temp.path(), &["init"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
    let out = phasegate(temp.path(), &["init"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ERROR));
    assert!(String::from_utf8_lossy(&out.stderr).contains("--force"));

    hook(temp.path(), &prompt_event("s1", "/implement"));
    let out = phasegate(temp.path(), &["reset"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "reset: workflow session cleared"
    );
}

#[test]
fn artifact_subcommand_prints_expected_path() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = phasegate(temp.path(), &["artifact", "review", "--session", "s9"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("project/reviews/review_s9_"));
    assert!(stdout.trim_end().ends_with(".md"));
}

#[test]
fn usage_errors_exit_with_error_code_not_block() {
    let temp = tempfile::tempdir().expect("tempdir");
    let out = phasegate(temp.path(), &["hook", "--bogus-flag"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ERROR));
    assert!(!out.stderr.is_empty());

    let out = phasegate(temp.path(), &["--help"], "");
    assert_eq!(out.status.code(), Some(exit_codes::ALLOW));
}
