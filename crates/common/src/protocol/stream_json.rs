// Codec for the assistant CLI's line-delimited `stream-json` format.
//
// Inbound: each stdout line is one JSON object (`system`, `assistant`,
// `user`, `result`, ...) that expands to zero or more `AgentEvent`s.
// Outbound: a user turn is one line of
// `{"type":"user","message":{"role":"user","content":"..."}}`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::events::AgentEvent;
use crate::path::file_name;

/// Result summary used when the backend reports nothing more specific.
pub const DEFAULT_TOOL_RESULT: &str = "Completed";

#[derive(Debug, Error)]
pub enum StreamJsonError {
    #[error("invalid stream-json line: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stream-json line has no `type` field")]
    MissingType,
}

/// Decode one stdout line into backend events.
///
/// Blank lines and unrecognised message types produce no events.
pub fn decode_line(line: &str) -> Result<Vec<AgentEvent>, StreamJsonError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let json: Value = serde_json::from_str(line)?;
    let kind = json.get("type").and_then(Value::as_str).ok_or(StreamJsonError::MissingType)?;
    let session_id = json.get("session_id").and_then(Value::as_str).unwrap_or("");

    let events = match kind {
        "system" => vec![AgentEvent::init(session_id)],
        "assistant" => decode_assistant(&json, session_id),
        "user" => decode_tool_results(&json, session_id),
        "result" => vec![AgentEvent::complete(session_id)],
        _ => Vec::new(),
    };
    Ok(events)
}

fn content_blocks(json: &Value) -> impl Iterator<Item = &Value> {
    json.get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn decode_assistant(json: &Value, session_id: &str) -> Vec<AgentEvent> {
    content_blocks(json)
        .filter_map(|block| match block.get("type").and_then(Value::as_str)? {
            "text" => {
                let text = block.get("text").and_then(Value::as_str)?;
                Some(AgentEvent::text(session_id, text))
            }
            "tool_use" => {
                let id = block.get("id").and_then(Value::as_str).unwrap_or_default();
                let name = block.get("name").and_then(Value::as_str).unwrap_or_default();
                Some(AgentEvent::tool_use(session_id, id, name, block.get("input").cloned()))
            }
            _ => None,
        })
        .collect()
}

fn decode_tool_results(json: &Value, session_id: &str) -> Vec<AgentEvent> {
    let file = json.get("tool_use_result").and_then(|result| result.get("file"));
    let file_label = file
        .and_then(|file| file.get("filePath"))
        .and_then(Value::as_str)
        .map(|path| file_name(path).to_string());
    let summary = file
        .and_then(|file| file.get("numLines"))
        .and_then(Value::as_i64)
        .map(|lines| format!("Read {lines} lines"))
        .unwrap_or_else(|| DEFAULT_TOOL_RESULT.to_string());

    content_blocks(json)
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
        .map(|block| {
            let tool_id = block.get("tool_use_id").and_then(Value::as_str).unwrap_or_default();
            let mut event = AgentEvent::tool_result(session_id, tool_id, summary.clone());
            event.tool_name = file_label.clone();
            event
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct UserTurn<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: UserTurnMessage<'a>,
}

#[derive(Debug, Serialize)]
struct UserTurnMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Attach an optional context block to the user's prompt.
pub fn compose_prompt(message: &str, context: Option<&str>) -> String {
    match context.filter(|ctx| !ctx.trim().is_empty()) {
        Some(ctx) => format!("{message}\n\n---\nContext:\n{ctx}"),
        None => message.to_string(),
    }
}

/// Encode a user turn as one stream-json line (without the trailing newline).
pub fn encode_user_turn(message: &str, context: Option<&str>) -> Result<String, StreamJsonError> {
    let content = compose_prompt(message, context);
    let turn = UserTurn { kind: "user", message: UserTurnMessage { role: "user", content: &content } };
    Ok(serde_json::to_string(&turn)?)
}
