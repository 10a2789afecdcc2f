//! File-backed spool: one JSON document per line.
//!
//! Retry-queue messages go to `retry.jsonl`, dead letters to `dlq.jsonl`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::pipeline::outcome::ResolutionPath;
use crate::spool::{SpoolError, SpoolMessage, SpoolSink};

pub struct FileSpoolSink {
    directory: PathBuf,
    // Serializes appends so concurrent lines never interleave.
    write_lock: Mutex<()>,
}

impl FileSpoolSink {
    /// Create the spool directory if needed.
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self, SpoolError> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).await?;
        tracing::info!(directory = %directory.display(), "File spool ready");
        Ok(Self {
            directory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn queue_path(&self, queue: ResolutionPath) -> PathBuf {
        let name = match queue {
            ResolutionPath::Retry => "retry.jsonl",
            ResolutionPath::Dlq => "dlq.jsonl",
        };
        self.directory.join(name)
    }

    async fn append(&self, queue: ResolutionPath, message: &SpoolMessage) -> Result<(), SpoolError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let path = self.queue_path(queue);
        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(message_id = %message.id, path = %path.display(), "Spooled to file");
        Ok(())
    }
}

#[async_trait]
impl SpoolSink for FileSpoolSink {
    async fn push_to_retry_queue(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.append(ResolutionPath::Retry, &message).await
    }

    async fn push_to_dlq(&self, message: SpoolMessage) -> Result<(), SpoolError> {
        self.append(ResolutionPath::Dlq, &message).await
    }
}
