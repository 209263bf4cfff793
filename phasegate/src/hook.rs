//! One gate decision per host event.
//!
//! Flow: decode event, security filter, then either the phase gate (tool
//! calls), a transition request (slash commands) or a completion check (stop
//! signals). State changes only happen on success, through the session store.
//!
//! [`run_hook`] never fails: undecodable input and internal errors allow the
//! action, so the gate cannot become the reason the host is stuck.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::completion::{Evidence, Incomplete, evaluate};
use crate::core::event::{EventKind, HookEvent, ToolCall, decode_event, parse_slash_command};
use crate::core::gate::check_action;
use crate::core::phases::{ExitCriterion, PhaseTable};
use crate::core::security;
use crate::core::transition::validate_transition;
use crate::core::types::{ActorName, Phase};
use crate::exit_codes;
use crate::io::artifacts::ArtifactLocator;
use crate::io::config::{GateConfig, load_config};
use crate::io::git::{ChangeSource, Git};
use crate::io::guidance::render_guidance;
use crate::io::init::GatePaths;
use crate::io::session::{Activation, Advance, Session, SessionStore};
use crate::io::store::{FileStore, StateStore};

/// Outcome of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the action proceed, optionally surfacing text to the agent.
    Allow { context: Option<String> },
    /// Refuse the action with an actionable reason.
    Block { reason: String },
}

impl Decision {
    fn allow() -> Self {
        Decision::Allow { context: None }
    }

    fn notice(text: String) -> Self {
        Decision::Allow {
            context: Some(text),
        }
    }

    fn block(reason: impl Into<String>) -> Self {
        Decision::Block {
            reason: reason.into(),
        }
    }
}

/// Everything one decision needs, with injectable store and change source.
pub struct HookContext<'a, S: StateStore, C: ChangeSource> {
    pub root: &'a Path,
    pub config: &'a GateConfig,
    pub store: &'a S,
    pub changes: &'a C,
    pub now: DateTime<Local>,
}

/// Process-level result: exit code plus stream contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutput {
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// Decide one raw event against the workflow rooted at `root`.
pub fn run_hook(root: &Path, input: &str, now: DateTime<Local>) -> HookOutput {
    let event = match decode_event(input) {
        Ok(event) => event,
        Err(err) => {
            warn!(err = %err, "undecodable hook input, allowing");
            return allow_output(None);
        }
    };
    let paths = GatePaths::new(root);
    let config = match load_config(&paths.config_path) {
        Ok(config) => config,
        Err(err) => {
            let err = format!("{err:#}");
            warn!(err = %err, "config unavailable, allowing");
            return allow_output(None);
        }
    };
    let store = FileStore::new(&paths.state_path);
    let git = Git::new(root, Duration::from_millis(config.git_timeout_ms));
    let ctx = HookContext {
        root,
        config: &config,
        store: &store,
        changes: &git,
        now,
    };
    match handle_event(&ctx, &event) {
        Ok(decision) => render_decision(&event.kind, decision),
        Err(err) => {
            let err = format!("{err:#}");
            warn!(err = %err, event = event.kind.host_name(), "hook failed internally, allowing");
            allow_output(None)
        }
    }
}

fn allow_output(stdout: Option<String>) -> HookOutput {
    HookOutput {
        exit_code: exit_codes::ALLOW,
        stdout,
        stderr: None,
    }
}

/// Map a decision onto the host protocol. Prompt events carry context as
/// `hookSpecificOutput.additionalContext`; other events get plain text.
pub fn render_decision(kind: &EventKind, decision: Decision) -> HookOutput {
    match decision {
        Decision::Allow { context: None } => allow_output(None),
        Decision::Allow {
            context: Some(text),
        } => {
            let stdout = match kind {
                EventKind::UserPromptSubmit { .. } => json!({
                    "hookSpecificOutput": {
                        "hookEventName": kind.host_name(),
                        "additionalContext": text,
                    }
                })
                .to_string(),
                _ => text,
            };
            allow_output(Some(stdout))
        }
        Decision::Block { reason } => HookOutput {
            exit_code: exit_codes::BLOCK,
            stdout: None,
            stderr: Some(reason),
        },
    }
}

/// Decide one decoded event.
pub fn handle_event<S: StateStore, C: ChangeSource>(
    ctx: &HookContext<'_, S, C>,
    event: &HookEvent,
) -> Result<Decision> {
    let table = ctx.config.phase_table()?;
    let sessions = SessionStore::new(ctx.store, &ctx.config.namespace);
    let gate = Gate {
        ctx,
        table: &table,
        sessions: &sessions,
        event_session: event.session_id.as_deref(),
    };
    debug!(event = event.kind.host_name(), "handling hook event");
    match &event.kind {
        EventKind::PreToolUse(call) => gate.pre_tool_use(call),
        EventKind::UserPromptSubmit { prompt } => gate.prompt_submit(prompt),
        EventKind::SubagentStop { actor } => gate.subagent_stop(actor.as_ref()),
        EventKind::Stop => gate.main_stop(),
        EventKind::SessionEnd => gate.session_end(),
        EventKind::Other(_) => Ok(Decision::allow()),
    }
}

struct Gate<'a, S: StateStore, C: ChangeSource> {
    ctx: &'a HookContext<'a, S, C>,
    table: &'a PhaseTable,
    sessions: &'a SessionStore<'a, S>,
    event_session: Option<&'a str>,
}

impl<S: StateStore, C: ChangeSource> Gate<'_, S, C> {
    fn pre_tool_use(&self, call: &ToolCall) -> Result<Decision> {
        match self.ctx.config.security_filter() {
            Ok(filter) => {
                if let Err(block) = filter.check(call) {
                    warn!(reason = %block, "security filter blocked action");
                    return Ok(Decision::block(block.to_string()));
                }
            }
            Err(err) => {
                let err = format!("{err:#}");
                warn!(policy = ?security::ON_INTERNAL_ERROR, err = %err, "security filter unavailable");
            }
        }

        let session = self.sessions.load();
        if !session.is_active {
            return Ok(Decision::allow());
        }
        let Some(action) = self.ctx.config.classifier()?.classify(call) else {
            return Ok(Decision::allow());
        };
        let phase = session.phase_or(self.table.initial());
        if let Err(block) = check_action(self.table, phase, &action) {
            info!(phase = %phase, kind = action.kind().as_str(), "gate blocked action");
            return Ok(Decision::block(block.to_string()));
        }
        if let ToolCall::Spawn { actor } = call {
            self.sessions.record_spawn(&actor.to_string())?;
        }
        Ok(Decision::allow())
    }

    fn prompt_submit(&self, prompt: &str) -> Result<Decision> {
        let Some(command) = parse_slash_command(prompt) else {
            return Ok(Decision::allow());
        };
        let commands = &self.ctx.config.commands;
        let session = self.sessions.load();

        if command.name == commands.cancel {
            if !session.is_active {
                return Ok(Decision::allow());
            }
            self.sessions.reset()?;
            return Ok(Decision::notice(
                "[phasegate] Workflow cancelled; phase gating is off.".to_string(),
            ));
        }
        if command.name == commands.activate {
            return self.activate();
        }
        match command.name.parse::<Phase>() {
            Ok(requested) => self.request_transition(&session, requested),
            Err(_) => Ok(Decision::allow()),
        }
    }

    fn activate(&self) -> Result<Decision> {
        let started_at = self.ctx.now.to_rfc3339();
        match self
            .sessions
            .activate(self.event_session, self.table.initial(), &started_at)?
        {
            Activation::Started(session) => {
                let phase = session.phase_or(self.table.initial());
                self.guidance("Workflow started.", &session, phase)
                    .map(Decision::notice)
            }
            Activation::AlreadyActive(session) => {
                let phase = session.phase_or(self.table.initial());
                self.guidance("Workflow already active.", &session, phase)
                    .map(Decision::notice)
            }
        }
    }

    fn request_transition(&self, session: &Session, requested: Phase) -> Result<Decision> {
        if !session.is_active {
            if let Err(err) = validate_transition(self.table, None, requested) {
                return Ok(Decision::block(err.to_string()));
            }
            return self.activate();
        }
        let current = session.phase_or(self.table.initial());
        if let Err(err) = validate_transition(self.table, Some(current), requested) {
            info!(from = %current, to = %requested, "transition rejected");
            return Ok(Decision::block(err.to_string()));
        }
        if let Err(reason) = self.check_completion(session, current)? {
            return Ok(Decision::block(format!(
                "Cannot leave phase '{current}' yet. {reason}"
            )));
        }
        match self.sessions.advance(current, requested)? {
            Advance::Advanced => {
                let headline = format!("Phase '{current}' complete. Now in '{requested}'.");
                self.guidance(&headline, session, requested)
                    .map(Decision::notice)
            }
            Advance::Conflict { actual } => Ok(Decision::block(format!(
                "Workflow state changed while this request was processed (now at '{}'); retry.",
                actual.map(Phase::as_str).unwrap_or("unknown")
            ))),
            Advance::Inactive => Ok(Decision::block(
                "Workflow was deactivated while this request was processed; retry.",
            )),
        }
    }

    fn subagent_stop(&self, actor: Option<&ActorName>) -> Result<Decision> {
        let session = self.sessions.load();
        if !session.is_active {
            return Ok(Decision::allow());
        }
        let phase = session.phase_or(self.table.initial());
        let Some(required) = self.table.get(phase).and_then(|spec| spec.required_actor) else {
            return Ok(Decision::allow());
        };
        if let Some(actor) = actor
            && !actor.is(required)
        {
            debug!(actor = %actor, required = %required, "stop from non-owning subagent");
            return Ok(Decision::allow());
        }
        self.complete_phase(&session, phase)
    }

    fn main_stop(&self) -> Result<Decision> {
        let session = self.sessions.load();
        if !session.is_active {
            return Ok(Decision::allow());
        }
        let phase = session.phase_or(self.table.initial());
        match self.table.get(phase) {
            Some(spec) if spec.required_actor.is_none() => self.complete_phase(&session, phase),
            _ => Ok(Decision::allow()),
        }
    }

    fn session_end(&self) -> Result<Decision> {
        if self.sessions.load().is_active {
            self.sessions.reset()?;
        }
        Ok(Decision::allow())
    }

    /// Completion signal from the phase owner: advance on success, block with
    /// the missing criterion otherwise.
    fn complete_phase(&self, session: &Session, phase: Phase) -> Result<Decision> {
        if let Err(reason) = self.check_completion(session, phase)? {
            info!(phase = %phase, "completion check failed");
            return Ok(Decision::block(reason.to_string()));
        }
        let Some(next) = self.table.next(phase) else {
            self.sessions.reset()?;
            info!(phase = %phase, "workflow complete");
            return Ok(Decision::notice(format!(
                "[phasegate] Phase '{phase}' complete. Workflow finished."
            )));
        };
        match self.sessions.advance(phase, next)? {
            Advance::Advanced => {
                let headline = format!("Phase '{phase}' complete. Now in '{next}'.");
                self.guidance(&headline, session, next).map(Decision::notice)
            }
            Advance::Conflict { actual } => {
                debug!(phase = %phase, actual = ?actual, "phase already moved on");
                Ok(Decision::allow())
            }
            Advance::Inactive => Ok(Decision::allow()),
        }
    }

    /// Inner `Err` is the reason the phase is incomplete; outer `Err` is an
    /// internal failure.
    fn check_completion(
        &self,
        session: &Session,
        phase: Phase,
    ) -> Result<Result<(), Incomplete>> {
        let Some(spec) = self.table.get(phase) else {
            return Ok(Ok(()));
        };
        let evidence = match &spec.exit {
            ExitCriterion::Artifact { kind, .. } => ArtifactLocator::new(self.ctx.root, self.ctx.config)
                .evidence(*kind, self.session_id(session))?,
            ExitCriterion::SourceChanges | ExitCriterion::CleanWorktree => {
                Evidence::Changes(self.ctx.changes.changed_paths())
            }
        };
        Ok(evaluate(
            &spec.exit,
            &evidence,
            &self.ctx.config.source_extensions,
        ))
    }

    /// Stored session id, falling back to the event's.
    fn session_id<'s>(&'s self, session: &'s Session) -> Option<&'s str> {
        session.session_id.as_deref().or(self.event_session)
    }

    fn guidance(&self, headline: &str, session: &Session, phase: Phase) -> Result<String> {
        let expected = match self.table.get(phase).map(|spec| &spec.exit) {
            Some(ExitCriterion::Artifact { kind, .. }) => {
                self.session_id(session).map(|sid| {
                    let path = ArtifactLocator::new(self.ctx.root, self.ctx.config)
                        .expected_path(*kind, sid, self.ctx.now);
                    path.strip_prefix(self.ctx.root)
                        .unwrap_or(path.as_path())
                        .display()
                        .to_string()
                })
            }
            _ => None,
        };
        render_guidance(
            headline,
            self.table,
            phase,
            expected.as_deref(),
        )
    }
}
