//! Periodic persistence of the accumulating dataset.
//!
//! A background writer owns the accumulated items and rewrites the snapshot
//! file every few completions, so a crash mid-run costs at most one interval
//! of work. Each write is the whole dataset so far: the file on disk is
//! always a complete, valid JSON array whose length only ever grows.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use shelfscan_core::types::EnrichedItem;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint write failed at {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("checkpoint read failed at {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("checkpoint writer stopped unexpectedly: {0}")]
    WriterGone(String),
}

/// Loads a previous run's snapshot for resumption.
///
/// A missing file is an empty dataset, not an error.
///
/// # Errors
///
/// Returns [`CheckpointError::Read`] if the file exists but cannot be read
/// or parsed.
pub async fn load_snapshot(path: &Path) -> Result<Vec<EnrichedItem>, CheckpointError> {
    let raw = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(CheckpointError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    };
    serde_json::from_slice(&raw).map_err(|e| CheckpointError::Read {
        path: path.display().to_string(),
        reason: format!("corrupt snapshot: {e}"),
    })
}

async fn write_snapshot(path: &Path, items: &[EnrichedItem]) -> Result<(), CheckpointError> {
    let write_err = |reason: String| CheckpointError::Write {
        path: path.display().to_string(),
        reason,
    };

    let json = serde_json::to_vec_pretty(items).map_err(|e| write_err(e.to_string()))?;

    // Temp file + rename keeps the visible snapshot complete at all times.
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json)
        .await
        .map_err(|e| write_err(format!("write temp file: {e}")))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| write_err(format!("rename into place: {e}")))?;

    tracing::debug!(path = %path.display(), items = items.len(), "checkpoint written");
    Ok(())
}

/// Handle to the background checkpoint writer.
pub struct Checkpointer {
    tx: mpsc::Sender<EnrichedItem>,
    writer: JoinHandle<Result<usize, CheckpointError>>,
}

impl Checkpointer {
    /// Spawns the writer task. `interval` is the number of newly completed
    /// items between snapshot writes (0 behaves as 1); `queue_capacity`
    /// bounds how far completions may run ahead of the writer.
    #[must_use]
    pub fn spawn(path: PathBuf, interval: usize, queue_capacity: usize) -> Self {
        let interval = interval.max(1);
        let (tx, mut rx) = mpsc::channel::<EnrichedItem>(queue_capacity.max(1));

        let writer = tokio::spawn(async move {
            let mut items: Vec<EnrichedItem> = Vec::new();
            let mut last_written = 0usize;

            while let Some(item) = rx.recv().await {
                items.push(item);
                if items.len() - last_written >= interval {
                    write_snapshot(&path, &items).await?;
                    last_written = items.len();
                }
            }

            // Final write covers the tail shorter than one interval, and
            // guarantees a snapshot exists even for an empty run.
            if items.len() > last_written || last_written == 0 {
                write_snapshot(&path, &items).await?;
            }
            Ok(items.len())
        });

        Self { tx, writer }
    }

    /// Hands one completed item to the writer. Applies backpressure when the
    /// writer falls behind.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::WriterGone`] if the writer task has
    /// stopped, which only happens after a write failure.
    pub async fn record(&self, item: EnrichedItem) -> Result<(), CheckpointError> {
        self.tx
            .send(item)
            .await
            .map_err(|_| CheckpointError::WriterGone("channel closed".to_owned()))
    }

    /// Closes the queue, waits for the final write, and returns the number
    /// of items in the snapshot.
    ///
    /// # Errors
    ///
    /// Propagates the writer's failure, or [`CheckpointError::WriterGone`]
    /// if it panicked.
    pub async fn finish(self) -> Result<usize, CheckpointError> {
        drop(self.tx);
        self.writer
            .await
            .map_err(|e| CheckpointError::WriterGone(e.to_string()))?
    }
}
