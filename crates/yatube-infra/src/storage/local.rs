//! Uploads stored as plain files under a media root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use yatube_core::ports::{MediaStorage, StorageError};

/// Filesystem-backed media storage.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a media-relative path under the root, rejecting anything
    /// that could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let mut resolved = self.root.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(StorageError::InvalidPath(path.to_string()));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

/// Write the whole buffer and wait for it to reach the file.
async fn write_file(mut file: fs::File, data: &[u8]) -> std::io::Result<()> {
    file.write_all(data).await?;
    file.flush().await
}

/// Keep only the last component of a client-supplied file name.
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim()
}

/// `picture.gif` -> `picture_1a2b3c4.gif`
fn with_suffix(name: &str) -> String {
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..7];
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

async fn discard_partial(target: &Path) {
    if let Err(e) = fs::remove_file(target).await {
        tracing::warn!(path = %target.display(), error = %e, "Failed to remove partial upload");
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError> {
        let name = base_name(file_name);
        if name.is_empty() || name == "." || name == ".." {
            return Err(StorageError::InvalidPath(file_name.to_string()));
        }

        let dir_path = self.resolve(dir)?;
        fs::create_dir_all(&dir_path).await?;

        let mut candidate = name.to_string();
        loop {
            let target = dir_path.join(&candidate);
            let open = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await;
            match open {
                Ok(file) => {
                    if let Err(e) = write_file(file, data).await {
                        discard_partial(&target).await;
                        return Err(e.into());
                    }
                    let stored = format!("{dir}/{candidate}");
                    tracing::debug!(path = %stored, bytes = data.len(), "Media file stored");
                    return Ok(stored);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = with_suffix(name);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let target = self.resolve(path)?;
        match fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
