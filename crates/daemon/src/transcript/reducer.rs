// Transcript reducer: folds one backend event into the conversation.
//
// `reduce` touches nothing but the state it is handed, so a recorded event
// sequence replays to the same transcript every time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use clause_common::protocol::events::{AgentEvent, AgentEventKind};
use clause_common::protocol::stream_json::DEFAULT_TOOL_RESULT;
use clause_common::types::{ContentBlock, Message, ToolInput, Transcript};
use serde_json::Value;

use super::status::{tool_status, ANALYZING_RESULTS, THINKING};

/// Label for a tool result whose call was never seen.
pub const UNKNOWN_TOOL_NAME: &str = "Tool";

/// A tool call awaiting its result.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToolCall {
    pub name: String,
    pub input: ToolInput,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptState {
    pub messages: Transcript,
    pub pending_tool_calls: HashMap<String, PendingToolCall>,
    pub session_id: Option<String>,
    pub status_text: Option<String>,
    /// True between the start of a turn and its `complete`/`error`.
    pub turn_open: bool,
    pub is_loading: bool,
}

impl TranscriptState {
    /// Append the user's message and open a new turn.
    pub fn begin_user_turn(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.messages.push(Message::user_text(text, now));
        self.turn_open = true;
        self.is_loading = true;
        self.status_text = Some(THINKING.to_string());
    }

    /// Close the turn without a backend event (e.g. the send itself failed)
    /// and record `text` as the assistant's reply.
    pub fn abort_turn(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.messages.push(Message::assistant(vec![ContentBlock::text(text)], now));
        self.end_turn();
    }

    fn end_turn(&mut self) {
        self.pending_tool_calls.clear();
        self.turn_open = false;
        self.is_loading = false;
        self.status_text = None;
    }

    /// The assistant message of the open turn, started if needed.
    fn assistant_message(&mut self, now: DateTime<Utc>) -> &mut Message {
        let reuse = self.turn_open && self.messages.last().is_some_and(Message::is_assistant);
        if !reuse {
            self.messages.push(Message::assistant(Vec::new(), now));
        }
        self.turn_open = true;
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Applied,
    /// `complete` or `error`: the turn is over.
    TurnEnded,
    /// Unknown kind, or a required field was missing.
    Ignored,
}

/// Apply `event` to `state`.
pub fn reduce(state: &mut TranscriptState, event: &AgentEvent, now: DateTime<Utc>) -> Reduction {
    if !event.session_id.is_empty() {
        state.session_id = Some(event.session_id.clone());
    }

    match event.kind {
        AgentEventKind::Init => {
            state.status_text = Some(THINKING.to_string());
            Reduction::Applied
        }
        AgentEventKind::Text => {
            let Some(delta) = event.text.as_deref().filter(|text| !text.is_empty()) else {
                return Reduction::Ignored;
            };
            state.status_text = None;
            let message = state.assistant_message(now);
            match message.content.last_mut() {
                Some(ContentBlock::Text { text }) => text.push_str(delta),
                _ => message.content.push(ContentBlock::text(delta)),
            }
            Reduction::Applied
        }
        AgentEventKind::ToolUse => {
            let id = event.tool_id.as_deref().filter(|id| !id.is_empty());
            let name = event.tool_name.as_deref().filter(|name| !name.is_empty());
            let (Some(id), Some(name)) = (id, name) else {
                return Reduction::Ignored;
            };
            let input = match &event.tool_input {
                Some(Value::Object(map)) => map.clone(),
                _ => ToolInput::new(),
            };
            state.status_text = Some(tool_status(name, &input));
            state
                .pending_tool_calls
                .insert(id.to_string(), PendingToolCall { name: name.to_string(), input: input.clone() });
            state.assistant_message(now).content.push(ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            });
            Reduction::Applied
        }
        AgentEventKind::ToolResult => {
            let Some(id) = event.tool_id.as_deref() else {
                return Reduction::Ignored;
            };
            let name = match state.pending_tool_calls.remove(id) {
                Some(call) => call.name,
                None => event
                    .tool_name
                    .clone()
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UNKNOWN_TOOL_NAME.to_string()),
            };
            let result = event
                .tool_result
                .clone()
                .filter(|result| !result.is_empty())
                .unwrap_or_else(|| DEFAULT_TOOL_RESULT.to_string());
            state.status_text = Some(ANALYZING_RESULTS.to_string());
            state.assistant_message(now).content.push(ContentBlock::ToolResult {
                id: id.to_string(),
                name,
                result,
            });
            Reduction::Applied
        }
        AgentEventKind::Complete => {
            state.end_turn();
            Reduction::TurnEnded
        }
        AgentEventKind::Error => {
            let message = event.error.as_deref().unwrap_or("unknown error");
            state.assistant_message(now).content.push(ContentBlock::text(format!("Error: {message}")));
            state.end_turn();
            Reduction::TurnEnded
        }
        AgentEventKind::Unknown => Reduction::Ignored,
    }
}
