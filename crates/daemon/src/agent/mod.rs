// Assistant backend collaborator.
//
// The aggregator talks to the assistant only through `AssistantBackend`:
// `send` hands a turn to the backend and returns once it is queued; the reply
// arrives later as `AgentEvent`s on a separate channel.

pub mod backend;
pub mod pump;

use std::future::Future;
use std::path::PathBuf;

use clause_common::protocol::stream_json::StreamJsonError;
use thiserror::Error;

pub use backend::{probe_cli_available, StreamJsonBackend};
pub use pump::{pump_stderr, pump_stream_json};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("assistant backend is not available")]
    BackendUnavailable,

    #[error("failed to encode turn: {0}")]
    Encode(#[from] StreamJsonError),

    #[error("assistant transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// One user turn as handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub message: String,
    /// Session to continue, or `None` to start a new conversation.
    pub session_id: Option<String>,
    pub working_dir: PathBuf,
    /// Selected-text snippets, already joined.
    pub context: Option<String>,
}

pub trait AssistantBackend: Send + Sync + 'static {
    fn check_available(&self) -> impl Future<Output = bool> + Send;

    /// Queue a turn. Completion is reported through the event stream, never
    /// through this return value.
    fn send(&self, request: SendRequest) -> impl Future<Output = Result<(), AgentError>> + Send;
}
