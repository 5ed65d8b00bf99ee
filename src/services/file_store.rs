use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("Invalid {kind} format. Only {allowed} are allowed.")]
    UnsupportedExtension { kind: &'static str, allowed: String },
    #[error("file storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uploads a book can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    CoverImage,
    BookPdf,
}

impl FileKind {
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::CoverImage => &["jpg", "jpeg", "png"],
            FileKind::BookPdf => &["pdf", "doc"],
        }
    }

    /// Sub-directory under the upload root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            FileKind::CoverImage => "CoverImage",
            FileKind::BookPdf => "BookPDF",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FileKind::CoverImage => "cover image",
            FileKind::BookPdf => "book PDF",
        }
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.allowed_extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persists an upload and returns the stored path.
    async fn save(
        &self,
        kind: FileKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, FileStoreError>;
    async fn remove(&self, stored_path: &str) -> Result<(), FileStoreError>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        kind: FileKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, FileStoreError> {
        if !kind.accepts(file_name) {
            return Err(FileStoreError::UnsupportedExtension {
                kind: kind.label(),
                allowed: kind.allowed_extensions().join(", "),
            });
        }

        // keep only the final component so a crafted name cannot escape the root
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");

        let dir = self.root.join(kind.dir_name());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}-{}", Uuid::new_v4(), base));
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), size = bytes.len(), "stored upload");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn remove(&self, stored_path: &str) -> Result<(), FileStoreError> {
        let path = Path::new(stored_path);
        if !path.starts_with(&self.root) {
            return Ok(());
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
