//! File system seam for the output logger.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// File operations needed by [`super::SessionOutputLogger`].
#[async_trait]
pub trait LogFs: Send + Sync {
    /// Recursive and idempotent directory creation.
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Create the file or cut it to zero length.
    async fn truncate(&self, file: &Path) -> io::Result<()>;

    /// Append raw text, creating the file if needed.
    async fn append(&self, file: &Path, text: &str) -> io::Result<()>;
}

/// Real file system backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFs;

#[async_trait]
impl LogFs for TokioFs {
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }

    async fn truncate(&self, file: &Path) -> io::Result<()> {
        tokio::fs::write(file, b"").await
    }

    async fn append(&self, file: &Path, text: &str) -> io::Result<()> {
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .await?;
        f.write_all(text.as_bytes()).await?;
        // tokio file writes complete in a background task, flush waits for it
        f.flush().await
    }
}
