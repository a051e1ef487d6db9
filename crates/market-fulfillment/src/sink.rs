//! Confirmation documents on the local filesystem.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::debug;

use crate::ports::DocumentSink;
use market_core::confirmation::document_file_name;

/// Writes each document as `order_<timestamp>_<id>.pdf` under one directory.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct FileDocumentSink {
    dir: PathBuf,
}

impl FileDocumentSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileDocumentSink { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl DocumentSink for FileDocumentSink {
    async fn store(
        &self,
        generated_at: NaiveDateTime,
        order_id: i64,
        document: &[u8],
    ) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(document_file_name(generated_at, order_id));
        tokio::fs::write(&path, document).await?;

        debug!(path = %path.display(), bytes = document.len(), "Stored confirmation document");
        Ok(path)
    }

    async fn load(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}
