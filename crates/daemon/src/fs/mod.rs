// Filesystem collaborator: async read/write/list used by the sync engine.
//
// The engine is generic over `FileSystem` so tests can substitute an
// in-memory store; `LocalFileSystem` is the tokio-backed implementation.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path is not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path.to_path_buf());
        }
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

pub trait FileSystem: Send + Sync + 'static {
    fn read_file(&self, path: &Path) -> impl Future<Output = Result<String, FsError>> + Send;

    fn write_file(
        &self,
        path: &Path,
        content: &str,
    ) -> impl Future<Output = Result<(), FsError>> + Send;

    /// Directories first, then files, each group ordered case-insensitively.
    /// Hidden entries (leading `.`) are skipped.
    fn list_directory(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Vec<FileEntry>, FsError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    async fn read_file(&self, path: &Path) -> Result<String, FsError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| FsError::io(path, e))?;
        if !metadata.is_file() {
            return Err(FsError::NotAFile(path.to_path_buf()));
        }
        tokio::fs::read_to_string(path).await.map_err(|e| FsError::io(path, e))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<(), FsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| FsError::io(parent, e))?;
        }
        tokio::fs::write(path, content).await.map_err(|e| FsError::io(path, e))?;
        trace!(path = %path.display(), bytes = content.len(), "file written");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<FileEntry>, FsError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| FsError::io(path, e))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory(path.to_path_buf()));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(path).await.map_err(|e| FsError::io(path, e))?;
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| FsError::io(path, e))? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            entries.push(FileEntry { name, path: entry.path(), is_dir });
        }

        sort_entries(&mut entries);
        Ok(entries)
    }
}

fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir.cmp(&a.is_dir).then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_creates_parents_and_read_returns_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("drafts").join("chapter.md");

        LocalFileSystem.write_file(&path, "# Chapter one").await.unwrap();
        let content = LocalFileSystem.read_file(&path).await.unwrap();
        assert_eq!(content, "# Chapter one");
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFileSystem.read_file(&tmp.path().join("nope.md")).await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn read_directory_is_not_a_file() {
        let tmp = TempDir::new().unwrap();
        let err = LocalFileSystem.read_file(tmp.path()).await.unwrap_err();
        assert!(matches!(err, FsError::NotAFile(_)));
    }

    #[tokio::test]
    async fn list_sorts_directories_first_and_skips_hidden() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("zeta")).unwrap();
        std::fs::create_dir(tmp.path().join("Alpha")).unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        std::fs::write(tmp.path().join("b.md"), "").unwrap();
        std::fs::write(tmp.path().join("A.md"), "").unwrap();
        std::fs::write(tmp.path().join(".hidden.md"), "").unwrap();

        let entries = LocalFileSystem.list_directory(tmp.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "zeta", "A.md", "b.md"]);
        assert!(entries[0].is_dir);
        assert!(!entries[2].is_dir);
    }

    #[tokio::test]
    async fn list_file_is_not_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.md");
        std::fs::write(&file, "x").unwrap();
        let err = LocalFileSystem.list_directory(&file).await.unwrap_err();
        assert!(matches!(err, FsError::NotADirectory(_)));
    }
}
