// File watcher: fsevents/inotify → `FileChangeEvent` push notifications.
//
// Events for one path arrive in emission order; there is no ordering across
// paths. The sync engine decides which events matter.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
}

/// A filesystem change for a single path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// Capacity for the internal event channel.
const EVENT_CHANNEL_CAPACITY: usize = 512;

/// Watches a workspace directory recursively using the OS-native backend.
///
/// Events are sent to the returned receiver until the watcher is dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    pub fn start(root: &Path) -> Result<(Self, mpsc::Receiver<FileChangeEvent>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to canonicalize watch root: {}", root.display()))?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let root_for_filter = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in translate_event(&event, &root_for_filter) {
                    if tx.blocking_send(change).is_err() {
                        debug!("change channel closed, stopping event dispatch");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "file watcher error");
            }
        })
        .context("failed to create file watcher")?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch directory: {}", root.display()))?;

        debug!(path = %root.display(), "file watcher started");

        Ok((Self { _watcher: watcher, root }, rx))
    }

    /// The canonicalized root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// True when any component below `root` starts with a dot (`.git`, `.clause`).
fn is_hidden_below(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root).map_or(false, |rel| {
        rel.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        })
    })
}

/// Translate a `notify::Event` into zero or more change events.
fn translate_event(event: &Event, root: &Path) -> Vec<FileChangeEvent> {
    let kind = match &event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Modify(modify_kind) => {
            use notify::event::ModifyKind;
            match modify_kind {
                ModifyKind::Metadata(_) => {
                    trace!("skipping metadata-only modify event");
                    return Vec::new();
                }
                _ => ChangeKind::Modify,
            }
        }
        EventKind::Remove(_) => ChangeKind::Remove,
        _ => {
            trace!(kind = ?event.kind, "skipping non-content event");
            return Vec::new();
        }
    };

    event
        .paths
        .iter()
        .filter(|p| {
            if p.starts_with(root) {
                true
            } else {
                warn!(path = %p.display(), "ignoring event outside watch root");
                false
            }
        })
        .filter(|p| !is_hidden_below(p, root))
        .map(|p| FileChangeEvent::new(p.clone(), kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};

    fn make_event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event { kind, paths, attrs: Default::default() }
    }

    #[test]
    fn test_create_file() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Create(CreateKind::File),
            vec![PathBuf::from("/workspace/notes/doc.md")],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result, vec![FileChangeEvent::new("/workspace/notes/doc.md", ChangeKind::Create)]);
    }

    #[test]
    fn test_modify_data() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![PathBuf::from("/workspace/doc.txt")],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, ChangeKind::Modify);
    }

    #[test]
    fn test_remove() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Remove(RemoveKind::File),
            vec![PathBuf::from("/workspace/doc.md")],
        );
        assert_eq!(translate_event(&event, &root)[0].kind, ChangeKind::Remove);
    }

    #[test]
    fn test_skips_metadata_events() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            vec![PathBuf::from("/workspace/doc.md")],
        );
        assert!(translate_event(&event, &root).is_empty());
    }

    #[test]
    fn test_rejects_outside_root() {
        let root = PathBuf::from("/workspace");
        let event =
            make_event(EventKind::Create(CreateKind::File), vec![PathBuf::from("/etc/evil.md")]);
        assert!(translate_event(&event, &root).is_empty());
    }

    #[test]
    fn test_skips_hidden_components() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![
                PathBuf::from("/workspace/.git/index"),
                PathBuf::from("/workspace/.draft.md"),
                PathBuf::from("/workspace/visible.md"),
            ],
        );
        let result = translate_event(&event, &root);
        assert_eq!(result, vec![FileChangeEvent::new("/workspace/visible.md", ChangeKind::Modify)]);
    }

    #[test]
    fn test_multiple_paths_in_single_event() {
        let root = PathBuf::from("/workspace");
        let event = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![PathBuf::from("/workspace/a.md"), PathBuf::from("/workspace/b.md")],
        );
        assert_eq!(translate_event(&event, &root).len(), 2);
    }

    #[tokio::test]
    async fn test_watcher_detects_modify() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("existing.md");
        fs::write(&file_path, "initial").unwrap();

        let (watcher, mut rx) = FileWatcher::start(tmp.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&file_path, "updated content").unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for modify event")
            .expect("channel closed");

        assert!(matches!(event.kind, ChangeKind::Modify | ChangeKind::Create));
        assert!(event.path.ends_with("existing.md"));

        drop(watcher);
    }

    #[test]
    fn test_watcher_rejects_nonexistent_root() {
        assert!(FileWatcher::start(Path::new("/nonexistent/path/abc123")).is_err());
    }

    #[test]
    fn test_watcher_exposes_root() {
        let tmp = TempDir::new().unwrap();
        let (watcher, _rx) = FileWatcher::start(tmp.path()).unwrap();
        assert_eq!(watcher.root(), tmp.path().canonicalize().unwrap());
    }
}
