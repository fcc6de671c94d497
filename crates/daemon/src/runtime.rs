// Wiring: watcher -> document loop, backend events -> aggregator loop, and a
// shared broadcast shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clause_common::protocol::events::AgentEvent;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::agent::AssistantBackend;
use crate::config::EditorConfig;
use crate::document::{run_document_loop, DocumentCommand, DocumentSyncEngine, DocumentView};
use crate::fs::LocalFileSystem;
use crate::transcript::{run_aggregator_loop, ChatCommand, ChatView, EventStreamAggregator};
use crate::watcher::FileWatcher;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

pub struct RuntimeHandle {
    root: PathBuf,
    config: EditorConfig,
    shutdown_tx: broadcast::Sender<()>,
    documents: mpsc::Sender<DocumentCommand>,
    document_view: watch::Receiver<DocumentView>,
    chat: Option<(mpsc::Sender<ChatCommand>, watch::Receiver<ChatView>)>,
    tasks: Vec<JoinHandle<()>>,
    _watcher: FileWatcher,
}

impl RuntimeHandle {
    /// Watch `root` and start the document loop on the local filesystem.
    pub fn start(config: EditorConfig, root: &Path) -> Result<Self> {
        let (watcher, changes) = FileWatcher::start(root)?;
        let root = watcher.root().to_path_buf();

        let (shutdown_tx, _) = broadcast::channel(4);
        let (documents, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (engine, document_view) =
            DocumentSyncEngine::new(Arc::new(LocalFileSystem), &config.sync);
        let task = tokio::spawn({
            let shutdown = shutdown_tx.subscribe();
            async move {
                run_document_loop(engine, commands, changes, shutdown).await;
            }
        });

        info!(root = %root.display(), "document sync started");
        Ok(Self {
            root,
            config,
            shutdown_tx,
            documents,
            document_view,
            chat: None,
            tasks: vec![task],
            _watcher: watcher,
        })
    }

    /// Start the aggregator loop for `backend`, consuming `events`.
    pub async fn attach_assistant<B: AssistantBackend>(
        &mut self,
        backend: Arc<B>,
        events: mpsc::Receiver<AgentEvent>,
    ) {
        let working_dir =
            self.config.assistant.working_dir.clone().unwrap_or_else(|| self.root.clone());
        let (mut aggregator, chat_view) = EventStreamAggregator::new(backend, working_dir);
        if !aggregator.refresh_availability().await {
            warn!(program = %self.config.assistant.program, "assistant not available, sending disabled");
        }

        let (chat_tx, chat_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let shutdown = self.shutdown_tx.subscribe();
        self.tasks.push(tokio::spawn(async move {
            run_aggregator_loop(aggregator, chat_rx, events, shutdown).await;
        }));
        self.chat = Some((chat_tx, chat_view));
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Resolve a user-supplied path against the workspace root. Existing
    /// files are canonicalized so they match watcher paths.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) };
        joined.canonicalize().unwrap_or(joined)
    }

    pub async fn document(&self, command: DocumentCommand) -> Result<()> {
        let command = match command {
            DocumentCommand::Open(path) => DocumentCommand::Open(self.resolve(&path)),
            other => other,
        };
        self.documents.send(command).await.context("document loop has stopped")
    }

    pub async fn chat(&self, command: ChatCommand) -> Result<()> {
        let (chat, _) = self.chat.as_ref().context("no assistant attached")?;
        chat.send(command).await.context("aggregator loop has stopped")
    }

    pub fn document_view(&self) -> watch::Receiver<DocumentView> {
        self.document_view.clone()
    }

    pub fn chat_view(&self) -> Option<watch::Receiver<ChatView>> {
        self.chat.as_ref().map(|(_, view)| view.clone())
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Signal shutdown and wait for both loops to finish. The document loop
    /// writes any pending save before it exits.
    pub async fn wait(mut self) {
        self.shutdown();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
