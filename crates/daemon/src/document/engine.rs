// Async driver for the single live document.
//
// `DocumentSyncEngine` owns the buffer and the save debouncer, performs the
// reads and writes that the pure transitions in `state` ask for, and publishes
// a `DocumentView` after every operation. `run_document_loop` is the task that
// owns an engine and feeds it commands, watch events and debounce deadlines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clause_common::diff::DiffSpan;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use super::debounce::SaveDebouncer;
use super::state::{DocumentBuffer, ExternalDecision, ExternalOutcome, SyncPhase, SyncTimings};
use crate::config::SyncConfig;
use crate::fs::{FileSystem, FsError};
use crate::watcher::FileChangeEvent;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no document is open")]
    NoDocument,

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    #[error("failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: FsError,
    },
}

/// What the presentation layer renders for the editor pane.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentView {
    pub path: Option<PathBuf>,
    pub content: String,
    pub pending_diff_spans: Vec<DiffSpan>,
    pub is_reviewing: bool,
    pub is_saving: bool,
    pub is_dirty: bool,
    /// Inline error from the last failed load or save.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentCommand {
    Open(PathBuf),
    Edit(String),
    AcceptAll,
    DenyAll,
}

pub struct DocumentSyncEngine<F: FileSystem> {
    fs: Arc<F>,
    timings: SyncTimings,
    debouncer: SaveDebouncer,
    buffer: Option<DocumentBuffer>,
    error: Option<String>,
    view_tx: watch::Sender<DocumentView>,
}

impl<F: FileSystem> DocumentSyncEngine<F> {
    pub fn new(fs: Arc<F>, config: &SyncConfig) -> (Self, watch::Receiver<DocumentView>) {
        let (view_tx, view_rx) = watch::channel(DocumentView::default());
        let engine = Self {
            fs,
            timings: SyncTimings::from(config),
            debouncer: SaveDebouncer::new(config.save_debounce()),
            buffer: None,
            error: None,
            view_tx,
        };
        (engine, view_rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentView> {
        self.view_tx.subscribe()
    }

    pub fn buffer(&self) -> Option<&DocumentBuffer> {
        self.buffer.as_ref()
    }

    pub fn active_path(&self) -> Option<&Path> {
        self.buffer.as_ref().map(DocumentBuffer::path)
    }

    /// When the pending debounced save becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// When the published view stops reporting a save, if it still does.
    pub fn saving_deadline(&self) -> Option<Instant> {
        if !self.view_tx.borrow().is_saving {
            return None;
        }
        self.buffer.as_ref().and_then(DocumentBuffer::saving_until)
    }

    /// Publish a fresh view if time alone has changed it.
    pub fn refresh_view(&self) {
        let fresh = self.view();
        self.view_tx.send_if_modified(|view| {
            if *view == fresh {
                return false;
            }
            *view = fresh;
            true
        });
    }

    /// Make `path` the live document. Any debounced save still pending for
    /// the previous document is dropped, not flushed.
    pub async fn open(&mut self, path: impl Into<PathBuf>) -> Result<(), SyncError> {
        let path = path.into();
        if self.debouncer.cancel() {
            debug!(path = %path.display(), "dropping pending save of previous document");
        }
        self.buffer = None;
        self.error = None;

        match self.fs.read_file(&path).await {
            Ok(text) => {
                info!(path = %path.display(), bytes = text.len(), "document opened");
                self.buffer = Some(DocumentBuffer::new(path, text));
                self.publish();
                Ok(())
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "failed to load document");
                self.error = Some(format!("Failed to load {}: {source}", path.display()));
                self.publish();
                Err(SyncError::Load { path, source })
            }
        }
    }

    /// Replace the in-memory text and restart the save debounce.
    pub fn local_edit(&mut self, text: impl Into<String>) -> Result<(), SyncError> {
        let buffer = self.buffer.as_mut().ok_or(SyncError::NoDocument)?;
        let generation = buffer.apply_local_edit(text);
        self.debouncer.push(generation, Instant::now());
        trace!(generation, "local edit queued for save");
        self.publish();
        Ok(())
    }

    /// Persist the pending edit if its quiet period has elapsed. Returns
    /// whether a write happened.
    pub async fn flush_due(&mut self) -> Result<bool, SyncError> {
        match self.debouncer.due(Instant::now()) {
            Some(generation) => self.save_generation(generation).await,
            None => Ok(false),
        }
    }

    /// Persist the pending edit now, regardless of the debounce window.
    pub async fn flush_pending(&mut self) -> Result<bool, SyncError> {
        match self.debouncer.take() {
            Some(generation) => self.save_generation(generation).await,
            None => Ok(false),
        }
    }

    /// Handle a watch notification. Returns `None` when the event was ignored
    /// (another path, not a modify, or the echo of our own save).
    pub async fn external_change(
        &mut self,
        event: &FileChangeEvent,
    ) -> Result<Option<ExternalOutcome>, SyncError> {
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(None);
        };
        match buffer.classify_external(event, Instant::now(), self.timings) {
            ExternalDecision::Ignore(reason) => {
                trace!(path = %event.path.display(), ?reason, "ignoring file change");
                return Ok(None);
            }
            ExternalDecision::Reload => {}
        }

        let path = buffer.path().to_path_buf();
        let content = match self.fs.read_file(&path).await {
            Ok(content) => content,
            Err(source) => {
                warn!(path = %path.display(), error = %source, "failed to reload document");
                self.error = Some(format!("Failed to load {}: {source}", path.display()));
                self.publish();
                return Err(SyncError::Load { path, source });
            }
        };

        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(None);
        };
        let outcome = buffer.apply_external_content(content);
        if let ExternalOutcome::Review { span_count } = outcome {
            self.debouncer.cancel();
            info!(path = %path.display(), span_count, "external change pending review");
        }
        self.error = None;
        self.publish();
        Ok(Some(outcome))
    }

    /// Keep the externally changed content and persist it as the baseline.
    pub async fn accept_all(&mut self) -> Result<bool, SyncError> {
        let buffer = self.buffer.as_mut().ok_or(SyncError::NoDocument)?;
        if !buffer.is_reviewing() && buffer.pre_change_snapshot().is_none() {
            return Ok(false);
        }
        let generation = buffer.accept_all();
        self.debouncer.cancel();
        debug!(path = %buffer.path().display(), "accepted external change");
        self.save_generation(generation).await
    }

    /// Revert to the content captured before the external change and
    /// persist it.
    pub async fn deny_all(&mut self) -> Result<bool, SyncError> {
        let buffer = self.buffer.as_mut().ok_or(SyncError::NoDocument)?;
        let Some(generation) = buffer.deny_all() else {
            return Ok(false);
        };
        self.debouncer.cancel();
        debug!(path = %buffer.path().display(), "reverted external change");
        self.save_generation(generation).await
    }

    pub async fn handle(&mut self, command: DocumentCommand) -> Result<(), SyncError> {
        match command {
            DocumentCommand::Open(path) => self.open(path).await,
            DocumentCommand::Edit(text) => self.local_edit(text),
            DocumentCommand::AcceptAll => self.accept_all().await.map(|_| ()),
            DocumentCommand::DenyAll => self.deny_all().await.map(|_| ()),
        }
    }

    async fn save_generation(&mut self, generation: u64) -> Result<bool, SyncError> {
        let (path, write) = {
            let Some(buffer) = self.buffer.as_mut() else {
                return Ok(false);
            };
            match buffer.begin_save(generation, Instant::now()) {
                Some(write) => (buffer.path().to_path_buf(), write),
                None => {
                    trace!(generation, "save superseded by newer content");
                    return Ok(false);
                }
            }
        };
        self.publish();

        let result = self.fs.write_file(&path, &write.text).await;
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(false);
        };
        match result {
            Ok(()) => {
                debug!(path = %path.display(), bytes = write.text.len(), "document saved");
                buffer.finish_save(write, Instant::now(), self.timings);
                self.error = None;
                self.publish();
                Ok(true)
            }
            Err(source) => {
                warn!(path = %path.display(), error = %source, "failed to save document");
                buffer.fail_save();
                self.error = Some(format!("Failed to save {}: {source}", path.display()));
                self.publish();
                Err(SyncError::Save { path, source })
            }
        }
    }

    fn view(&self) -> DocumentView {
        let now = Instant::now();
        match &self.buffer {
            Some(buffer) => DocumentView {
                path: Some(buffer.path().to_path_buf()),
                content: buffer.current_text().to_string(),
                pending_diff_spans: buffer.pending_diff_spans().to_vec(),
                is_reviewing: buffer.is_reviewing(),
                is_saving: buffer.phase() == SyncPhase::Saving || buffer.is_saving(now),
                is_dirty: buffer.is_dirty(),
                error: self.error.clone(),
            },
            None => DocumentView { error: self.error.clone(), ..DocumentView::default() },
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }
}

/// Own `engine` until `commands` closes or shutdown fires. Errors are logged
/// and surfaced through the view; they never stop the loop. A pending save is
/// flushed on the way out.
pub async fn run_document_loop<F: FileSystem>(
    mut engine: DocumentSyncEngine<F>,
    mut commands: mpsc::Receiver<DocumentCommand>,
    mut changes: mpsc::Receiver<FileChangeEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> DocumentSyncEngine<F> {
    loop {
        let deadline = engine.next_deadline();
        let saving_deadline = engine.saving_deadline();
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("document loop shutting down");
                break;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("document command channel closed");
                    break;
                };
                if let Err(error) = engine.handle(command).await {
                    warn!(%error, "document command failed");
                }
            }
            Some(event) = changes.recv() => {
                if let Err(error) = engine.external_change(&event).await {
                    warn!(%error, "external change handling failed");
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Err(error) = engine.flush_due().await {
                    warn!(%error, "debounced save failed");
                }
            }
            _ = sleep_until(saving_deadline.unwrap_or_else(Instant::now)), if saving_deadline.is_some() => {
                engine.refresh_view();
            }
        }
    }

    if let Err(error) = engine.flush_pending().await {
        warn!(%error, "final save failed");
    }
    engine
}
