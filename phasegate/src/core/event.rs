//! Typed decoding of host hook events.
//!
//! The host sends one loosely-typed JSON object per invocation. All optional
//! field handling happens here so the decision logic only sees [`HookEvent`].

use serde::Deserialize;
use serde_json::Value;

use crate::core::types::ActorName;

/// Wire shape of a hook event. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    hook_event_name: String,
    session_id: Option<String>,
    tool_name: Option<String>,
    tool_input: Option<Value>,
    prompt: Option<String>,
    agent_type: Option<String>,
    subagent_type: Option<String>,
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    pub session_id: Option<String>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    PreToolUse(ToolCall),
    UserPromptSubmit { prompt: String },
    SubagentStop { actor: Option<ActorName> },
    Stop,
    SessionEnd,
    Other(String),
}

impl EventKind {
    /// Host event name, echoed back in JSON output.
    pub fn host_name(&self) -> &str {
        match self {
            EventKind::PreToolUse(_) => "PreToolUse",
            EventKind::UserPromptSubmit { .. } => "UserPromptSubmit",
            EventKind::SubagentStop { .. } => "SubagentStop",
            EventKind::Stop => "Stop",
            EventKind::SessionEnd => "SessionEnd",
            EventKind::Other(name) => name,
        }
    }
}

/// Tool invocation attempted by an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// File mutation through `Write`, `Edit`, `MultiEdit` or `NotebookEdit`.
    FileWrite { tool: String, path: String },
    Shell { command: String },
    /// Delegation to a subagent.
    Spawn { actor: ActorName },
    Other { tool: String },
}

/// Slash command typed by the user, e.g. `/plan` or `/implement add login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub name: String,
    pub args: String,
}

/// Extract a leading slash command from a prompt.
pub fn parse_slash_command(prompt: &str) -> Option<SlashCommand> {
    let rest = prompt.trim_start().strip_prefix('/')?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest.trim_end(), ""),
    };
    // Namespaced commands like `/project:plan` keep only the final segment.
    let name = name.rsplit(':').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    Some(SlashCommand {
        name: name.to_ascii_lowercase(),
        args: args.to_string(),
    })
}

/// Decode one event from raw JSON.
pub fn decode_event(raw: &str) -> Result<HookEvent, serde_json::Error> {
    let event: RawEvent = serde_json::from_str(raw)?;
    let session_id = event.session_id.clone().filter(|s| !s.trim().is_empty());
    let kind = match event.hook_event_name.as_str() {
        "PreToolUse" => EventKind::PreToolUse(decode_tool(&event)),
        "UserPromptSubmit" => EventKind::UserPromptSubmit {
            prompt: event.prompt.unwrap_or_default(),
        },
        "SubagentStop" => EventKind::SubagentStop {
            actor: event
                .agent_type
                .or(event.subagent_type)
                .filter(|s| !s.trim().is_empty())
                .map(|s| ActorName::parse(&s)),
        },
        "Stop" => EventKind::Stop,
        "SessionEnd" => EventKind::SessionEnd,
        other => EventKind::Other(other.to_string()),
    };
    Ok(HookEvent { session_id, kind })
}

fn decode_tool(event: &RawEvent) -> ToolCall {
    let tool = event.tool_name.as_deref().unwrap_or_default();
    let input = event.tool_input.as_ref();
    let field = |name: &str| -> Option<String> {
        input
            .and_then(|v| v.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let decoded = match tool {
        "Write" | "Edit" | "MultiEdit" => field("file_path").map(|path| ToolCall::FileWrite {
            tool: tool.to_string(),
            path,
        }),
        "NotebookEdit" => field("notebook_path")
            .or_else(|| field("file_path"))
            .map(|path| ToolCall::FileWrite {
                tool: tool.to_string(),
                path,
            }),
        "Bash" => field("command").map(|command| ToolCall::Shell { command }),
        "Task" | "Agent" => field("subagent_type").map(|actor| ToolCall::Spawn {
            actor: ActorName::parse(&actor),
        }),
        _ => None,
    };
    decoded.unwrap_or_else(|| ToolCall::Other {
        tool: tool.to_string(),
    })
}
