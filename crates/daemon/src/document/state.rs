// Pure state for the single live document.
//
// All transitions take `now` explicitly so the feedback-loop rules can be
// exercised without timers. The async engine owns one `DocumentBuffer` and
// performs the I/O these transitions ask for.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clause_common::diff::{diff_words, DiffSpan};
use tokio::time::Instant;

use crate::config::SyncConfig;
use crate::watcher::{ChangeKind, FileChangeEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// In-memory text matches the last successful write.
    Clean,
    /// Local edits not yet written (or a write failed).
    Editing,
    /// A write is in flight.
    Saving,
}

/// Timing rules for echo suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// `is_saving` stays raised this long after a write completes.
    pub save_grace: Duration,
    /// Modify events this soon after a save are presumed to be its echo.
    pub echo_window: Duration,
}

impl From<&SyncConfig> for SyncTimings {
    fn from(config: &SyncConfig) -> Self {
        Self { save_grace: config.save_grace(), echo_window: config.echo_window() }
    }
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherPath,
    NotModify,
    Saving,
    RecentSave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalDecision {
    Ignore(IgnoreReason),
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalOutcome {
    /// Disk content equals the current baseline; nothing to review.
    Unchanged,
    /// New content is displayed with `span_count` spans pending review.
    Review { span_count: usize },
}

/// A write the engine must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    pub generation: u64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DocumentBuffer {
    path: PathBuf,
    current_text: String,
    last_saved_text: String,
    phase: SyncPhase,
    write_in_flight: bool,
    saving_until: Option<Instant>,
    last_save_at: Option<Instant>,
    pre_change_snapshot: Option<String>,
    pending_diff_spans: Vec<DiffSpan>,
    edit_generation: u64,
}

impl DocumentBuffer {
    /// A freshly loaded document: clean, no review pending.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            current_text: text.clone(),
            last_saved_text: text,
            phase: SyncPhase::Clean,
            write_in_flight: false,
            saving_until: None,
            last_save_at: None,
            pre_change_snapshot: None,
            pending_diff_spans: Vec::new(),
            edit_generation: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn last_saved_text(&self) -> &str {
        &self.last_saved_text
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn last_save_at(&self) -> Option<Instant> {
        self.last_save_at
    }

    pub fn pre_change_snapshot(&self) -> Option<&str> {
        self.pre_change_snapshot.as_deref()
    }

    pub fn pending_diff_spans(&self) -> &[DiffSpan] {
        &self.pending_diff_spans
    }

    pub fn edit_generation(&self) -> u64 {
        self.edit_generation
    }

    pub fn is_reviewing(&self) -> bool {
        !self.pending_diff_spans.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.current_text != self.last_saved_text
    }

    /// True while a write is in flight and for the grace window after it.
    pub fn is_saving(&self, now: Instant) -> bool {
        self.write_in_flight || self.saving_until.is_some_and(|until| now < until)
    }

    /// End of the grace window after the last completed write.
    pub fn saving_until(&self) -> Option<Instant> {
        self.saving_until
    }

    /// Record a local edit. Returns the generation the debounced save must
    /// carry; any older generation is superseded.
    pub fn apply_local_edit(&mut self, text: impl Into<String>) -> u64 {
        self.current_text = text.into();
        self.edit_generation += 1;
        if self.phase != SyncPhase::Saving {
            self.phase = SyncPhase::Editing;
        }
        self.edit_generation
    }

    /// Start persisting `generation`. Returns `None` when a newer edit or an
    /// external reload has superseded it.
    pub fn begin_save(&mut self, generation: u64, now: Instant) -> Option<PendingWrite> {
        if generation != self.edit_generation {
            return None;
        }
        self.write_in_flight = true;
        self.last_save_at = Some(now);
        self.phase = SyncPhase::Saving;
        Some(PendingWrite { generation, text: self.current_text.clone() })
    }

    /// The write for `write` succeeded at `now`.
    pub fn finish_save(&mut self, write: PendingWrite, now: Instant, timings: SyncTimings) {
        self.write_in_flight = false;
        self.saving_until = Some(now + timings.save_grace);
        self.last_save_at = Some(now);
        self.last_saved_text = write.text;
        self.phase =
            if write.generation == self.edit_generation { SyncPhase::Clean } else { SyncPhase::Editing };
    }

    /// The write failed. The buffer stays dirty; nothing is retried.
    pub fn fail_save(&mut self) {
        self.write_in_flight = false;
        self.phase = SyncPhase::Editing;
    }

    /// Decide whether a watch event should reload the document.
    pub fn classify_external(
        &self,
        event: &FileChangeEvent,
        now: Instant,
        timings: SyncTimings,
    ) -> ExternalDecision {
        if event.path != self.path {
            return ExternalDecision::Ignore(IgnoreReason::OtherPath);
        }
        if event.kind != ChangeKind::Modify {
            return ExternalDecision::Ignore(IgnoreReason::NotModify);
        }
        if self.is_saving(now) {
            return ExternalDecision::Ignore(IgnoreReason::Saving);
        }
        if self.last_save_at.is_some_and(|at| now.duration_since(at) < timings.echo_window) {
            return ExternalDecision::Ignore(IgnoreReason::RecentSave);
        }
        ExternalDecision::Reload
    }

    /// Show externally-changed content with a diff against the baseline.
    ///
    /// Only the latest snapshot is kept: a second change before the review
    /// is resolved replaces the first one's snapshot.
    pub fn apply_external_content(&mut self, content: String) -> ExternalOutcome {
        if content == self.last_saved_text {
            return ExternalOutcome::Unchanged;
        }

        let spans = diff_words(&self.last_saved_text, &content);
        let span_count = spans.len();
        self.pre_change_snapshot = Some(std::mem::replace(&mut self.last_saved_text, content.clone()));
        self.pending_diff_spans = spans;
        self.current_text = content;
        // Supersede any debounced save of text the reload just replaced.
        self.edit_generation += 1;
        self.phase = SyncPhase::Clean;
        ExternalOutcome::Review { span_count }
    }

    /// Keep the displayed content. Returns the generation to persist now.
    pub fn accept_all(&mut self) -> u64 {
        self.pending_diff_spans.clear();
        self.pre_change_snapshot = None;
        self.edit_generation += 1;
        self.phase = SyncPhase::Editing;
        self.edit_generation
    }

    /// Restore the pre-change snapshot. Returns the generation to persist,
    /// or `None` when there is nothing to revert.
    pub fn deny_all(&mut self) -> Option<u64> {
        let snapshot = self.pre_change_snapshot.take()?;
        self.pending_diff_spans.clear();
        self.current_text = snapshot;
        self.edit_generation += 1;
        self.phase = SyncPhase::Editing;
        Some(self.edit_generation)
    }
}
