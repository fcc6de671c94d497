// Event stream aggregator: owns the live transcript, feeds backend events
// through the reducer and publishes a `ChatView` after each one.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clause_common::protocol::events::AgentEvent;
use clause_common::types::Transcript;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::reducer::{reduce, Reduction, TranscriptState};
use crate::agent::{AgentError, AssistantBackend, SendRequest};

/// What the presentation layer renders for the chat pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatView {
    pub messages: Transcript,
    pub status_text: Option<String>,
    pub is_loading: bool,
    /// Last result of the availability probe. Sending is refused while false.
    pub is_connected: bool,
    pub session_id: Option<String>,
}

/// A selected-text snippet attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnippet {
    pub file_name: String,
    /// Display range, e.g. `3-7`.
    pub line_range: String,
    pub text: String,
}

/// Join snippets into the context block sent alongside a message.
pub fn build_context(snippets: &[ContextSnippet]) -> Option<String> {
    if snippets.is_empty() {
        return None;
    }
    let blocks: Vec<String> = snippets
        .iter()
        .map(|s| format!("From {} (lines {}):\n{}", s.file_name, s.line_range, s.text))
        .collect();
    Some(blocks.join("\n\n"))
}

pub struct EventStreamAggregator<B: AssistantBackend> {
    backend: Arc<B>,
    working_dir: PathBuf,
    state: TranscriptState,
    is_connected: bool,
    view_tx: watch::Sender<ChatView>,
}

impl<B: AssistantBackend> EventStreamAggregator<B> {
    /// The backend is assumed available until `refresh_availability` says
    /// otherwise.
    pub fn new(backend: Arc<B>, working_dir: impl Into<PathBuf>) -> (Self, watch::Receiver<ChatView>) {
        let initial = ChatView { is_connected: true, ..ChatView::default() };
        let (view_tx, view_rx) = watch::channel(initial);
        let aggregator = Self {
            backend,
            working_dir: working_dir.into(),
            state: TranscriptState::default(),
            is_connected: true,
            view_tx,
        };
        (aggregator, view_rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatView> {
        self.view_tx.subscribe()
    }

    pub fn state(&self) -> &TranscriptState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.state.session_id.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    /// Re-run the backend's availability check and publish the result.
    pub async fn refresh_availability(&mut self) -> bool {
        self.is_connected = self.backend.check_available().await;
        if !self.is_connected {
            warn!("assistant backend unavailable");
        }
        self.publish();
        self.is_connected
    }

    /// Fold one backend event into the transcript.
    pub fn apply(&mut self, event: &AgentEvent) -> Reduction {
        let reduction = reduce(&mut self.state, event, Utc::now());
        match reduction {
            Reduction::TurnEnded => {
                debug!(session_id = %event.session_id, kind = ?event.kind, "assistant turn ended")
            }
            Reduction::Ignored => trace!(kind = ?event.kind, "ignoring backend event"),
            Reduction::Applied => {}
        }
        self.publish();
        reduction
    }

    /// Append the user's message and hand the turn to the backend.
    ///
    /// The reply arrives through `apply`. A transport failure is recorded in
    /// the transcript and ends the turn; it is also returned to the caller.
    pub async fn send(&mut self, message: &str, context: Option<String>) -> Result<(), AgentError> {
        if !self.is_connected {
            return Err(AgentError::BackendUnavailable);
        }

        self.state.begin_user_turn(message, Utc::now());
        self.publish();

        let request = SendRequest {
            message: message.to_string(),
            session_id: self.state.session_id.clone(),
            working_dir: self.working_dir.clone(),
            context,
        };
        info!(session_id = request.session_id.as_deref().unwrap_or("<new>"), "sending message");

        if let Err(error) = self.backend.send(request).await {
            warn!(%error, "failed to send message");
            self.state.abort_turn(format!("Failed to send message: {error}"), Utc::now());
            self.publish();
            return Err(error);
        }
        Ok(())
    }

    fn view(&self) -> ChatView {
        ChatView {
            messages: self.state.messages.clone(),
            status_text: self.state.status_text.clone(),
            is_loading: self.state.is_loading,
            is_connected: self.is_connected,
            session_id: self.state.session_id.clone(),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

/// A request from the chat pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Send { message: String, context: Option<String> },
    RefreshAvailability,
}

/// Drive `aggregator` until the event stream closes or shutdown fires.
pub async fn run_aggregator_loop<B: AssistantBackend>(
    mut aggregator: EventStreamAggregator<B>,
    mut commands: mpsc::Receiver<ChatCommand>,
    mut events: mpsc::Receiver<AgentEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> EventStreamAggregator<B> {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("aggregator loop shutting down");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("assistant event stream closed");
                    break;
                };
                aggregator.apply(&event);
            }
            Some(command) = commands.recv() => match command {
                ChatCommand::Send { message, context } => {
                    if let Err(error) = aggregator.send(&message, context).await {
                        debug!(%error, "send rejected");
                    }
                }
                ChatCommand::RefreshAvailability => {
                    aggregator.refresh_availability().await;
                }
            },
        }
    }
    aggregator
}
