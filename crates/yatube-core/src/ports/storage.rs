//! Media storage port - where uploaded images live.

use async_trait::async_trait;

/// Storage for user uploads, addressed by media-relative paths such as
/// `posts/picture.gif`.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `data` under `dir` using the client-supplied file name.
    /// Returns the media-relative path actually used, which differs from
    /// `dir/file_name` when that name is taken.
    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Read a stored file. `Ok(None)` when nothing is stored at `path`.
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove a stored file if present.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
