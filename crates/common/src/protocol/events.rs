// Assistant backend event wire type.
//
// Every event carries the backend session id; the remaining fields are
// populated according to `type`. Unknown `type` values decode to
// `AgentEventKind::Unknown` so newer backends never break the stream.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventKind {
    Init,
    Text,
    ToolUse,
    ToolResult,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

/// A single event pushed by the assistant backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub kind: AgentEventKind,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentEvent {
    fn bare(kind: AgentEventKind, session_id: &str) -> Self {
        Self {
            kind,
            session_id: session_id.to_string(),
            text: None,
            tool_id: None,
            tool_name: None,
            tool_input: None,
            tool_result: None,
            error: None,
        }
    }

    pub fn init(session_id: &str) -> Self {
        Self::bare(AgentEventKind::Init, session_id)
    }

    pub fn text(session_id: &str, delta: impl Into<String>) -> Self {
        Self { text: Some(delta.into()), ..Self::bare(AgentEventKind::Text, session_id) }
    }

    pub fn tool_use(
        session_id: &str,
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input: Option<serde_json::Value>,
    ) -> Self {
        Self {
            tool_id: Some(tool_id.into()),
            tool_name: Some(tool_name.into()),
            tool_input,
            ..Self::bare(AgentEventKind::ToolUse, session_id)
        }
    }

    pub fn tool_result(
        session_id: &str,
        tool_id: impl Into<String>,
        tool_result: impl Into<String>,
    ) -> Self {
        Self {
            tool_id: Some(tool_id.into()),
            tool_result: Some(tool_result.into()),
            ..Self::bare(AgentEventKind::ToolResult, session_id)
        }
    }

    pub fn complete(session_id: &str) -> Self {
        Self::bare(AgentEventKind::Complete, session_id)
    }

    pub fn error(session_id: &str, message: impl Into<String>) -> Self {
        Self { error: Some(message.into()), ..Self::bare(AgentEventKind::Error, session_id) }
    }

    /// True for `complete` and `error`, which end the current turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, AgentEventKind::Complete | AgentEventKind::Error)
    }
}
