//! Enrichment orchestration: fan candidates out over the structured and
//! rendered fetch paths, account for every one of them, and checkpoint the
//! accumulating dataset as items complete.

pub mod cancel;
pub mod checkpoint;
pub mod orchestrator;
mod task;

use thiserror::Error;

pub use cancel::CancelFlag;
pub use checkpoint::{load_snapshot, Checkpointer};
pub use orchestrator::{Pipeline, PipelineConfig, RunSummary};

use checkpoint::CheckpointError;

/// Failures that abort a whole run. Per-item failures never appear here;
/// they degrade the item instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither discovery path produced a single candidate.
    #[error("no candidates found for \"{term}\" on either discovery path")]
    DiscoveryExhausted { term: String },

    /// The checkpoint writer failed; continuing would silently lose data.
    #[error("checkpointing failed: {0}")]
    Checkpoint(#[from] CheckpointError),
}
