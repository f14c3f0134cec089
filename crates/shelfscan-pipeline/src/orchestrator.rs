//! Run orchestration: session restore, discovery with fallback, bounded
//! fan-out, accumulation, checkpointing.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{stream, StreamExt};

use shelfscan_core::types::{Candidate, EnrichedItem, Query};
use shelfscan_fetch::{
    ChallengeGate, FetchError, RenderedSource, SessionStore, StructuredSource,
};

use crate::cancel::CancelFlag;
use crate::checkpoint::{load_snapshot, Checkpointer};
use crate::task::{enrich_candidate, persist_verified_session, EnrichmentContext};
use crate::PipelineError;

/// Run-level knobs that do not vary per query.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub checkpoint_path: PathBuf,
    /// Completed items between snapshot writes.
    pub checkpoint_interval: usize,
    /// Queue depth between completions and the checkpoint writer.
    pub checkpoint_queue: usize,
    /// How many resolved challenges one item may consume before degrading.
    pub challenge_max_retries: u32,
    /// Skip candidates already succeeded in the existing checkpoint file.
    pub resume: bool,
}

/// Aggregate counts over a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub degraded: usize,
}

impl RunSummary {
    #[must_use]
    pub fn of(items: &[EnrichedItem]) -> Self {
        let succeeded = items.iter().filter(|i| i.status.is_succeeded()).count();
        Self {
            total: items.len(),
            succeeded,
            degraded: items.len() - succeeded,
        }
    }
}

/// The two-stage collection pipeline: discovery, then bounded concurrent
/// enrichment with checkpointed accumulation.
pub struct Pipeline {
    structured: Arc<dyn StructuredSource>,
    rendered: Arc<dyn RenderedSource>,
    session_store: SessionStore,
    gate: ChallengeGate,
    config: PipelineConfig,
    cancel: CancelFlag,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        structured: Arc<dyn StructuredSource>,
        rendered: Arc<dyn RenderedSource>,
        session_store: SessionStore,
        gate: ChallengeGate,
        config: PipelineConfig,
    ) -> Self {
        Self {
            structured,
            rendered,
            session_store,
            gate,
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Handle for requesting a graceful stop from outside the run.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Executes one collection run to completion.
    ///
    /// Returns exactly one [`EnrichedItem`] per discovered candidate, in
    /// completion order. Per-item failures degrade the item; only discovery
    /// exhaustion and checkpoint failures abort the run.
    ///
    /// # Errors
    ///
    /// [`PipelineError::DiscoveryExhausted`] when neither path yields a
    /// candidate; [`PipelineError::Checkpoint`] when the snapshot writer
    /// fails.
    pub async fn run(&self, query: &Query) -> Result<Vec<EnrichedItem>, PipelineError> {
        match self.session_store.load().await {
            Ok(Some(state)) if !state.is_empty() => {
                tracing::info!(
                    cookies = state.cookies.len(),
                    verified_at = ?state.verified_at,
                    "restored persisted session"
                );
                self.rendered.restore_session(state).await;
            }
            Ok(_) => tracing::debug!("no persisted session, starting fresh"),
            Err(e) => tracing::warn!(error = %e, "session unavailable, starting fresh"),
        }

        let ctx = EnrichmentContext {
            structured: Arc::clone(&self.structured),
            rendered: Arc::clone(&self.rendered),
            gate: self.gate.clone(),
            session_store: self.session_store.clone(),
            challenge_max_retries: self.config.challenge_max_retries,
            cancel: self.cancel.clone(),
        };

        let mut candidates = self.discover(&ctx, query).await?;
        candidates.truncate(query.max_candidates);
        tracing::info!(
            term = %query.search_term,
            candidates = candidates.len(),
            concurrency = query.concurrency,
            "discovery complete, enriching"
        );

        let mut results: Vec<EnrichedItem> = Vec::new();
        if self.config.resume {
            let prior = load_snapshot(&self.config.checkpoint_path).await?;
            let done: HashSet<&str> = prior
                .iter()
                .filter(|i| i.status.is_succeeded())
                .map(|i| i.candidate.link.as_str())
                .collect();
            if !done.is_empty() {
                let before = candidates.len();
                candidates.retain(|c| !done.contains(c.link.as_str()));
                tracing::info!(
                    carried = done.len(),
                    skipped = before - candidates.len(),
                    "resuming from checkpoint"
                );
            }
            results.extend(prior.into_iter().filter(|i| i.status.is_succeeded()));
        }

        let checkpointer = Checkpointer::spawn(
            self.config.checkpoint_path.clone(),
            self.config.checkpoint_interval,
            self.config.checkpoint_queue,
        );
        for item in &results {
            checkpointer.record(item.clone()).await?;
        }

        let mut completions = stream::iter(candidates)
            .map(|candidate| enrich_candidate(&ctx, candidate, query.max_reviews))
            .buffer_unordered(query.concurrency.max(1));
        while let Some(item) = completions.next().await {
            tracing::debug!(
                link = %item.candidate.link,
                succeeded = item.status.is_succeeded(),
                "item complete"
            );
            checkpointer.record(item.clone()).await?;
            results.push(item);
        }
        drop(completions);

        let checkpointed = checkpointer.finish().await?;
        let summary = RunSummary::of(&results);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            degraded = summary.degraded,
            checkpointed,
            "run complete"
        );
        Ok(results)
    }

    /// Discovery with fallback: structured first, rendered when it fails or
    /// comes back empty. A challenge during rendered discovery goes through
    /// the gate like any enrichment challenge.
    async fn discover(
        &self,
        ctx: &EnrichmentContext,
        query: &Query,
    ) -> Result<Vec<Candidate>, PipelineError> {
        match self.structured.discover(query).await {
            Ok(candidates) if !candidates.is_empty() => return Ok(candidates),
            Ok(_) => {
                tracing::warn!(term = %query.search_term, "structured discovery empty, trying rendered");
            }
            Err(e) => {
                tracing::warn!(term = %query.search_term, error = %e, "structured discovery failed, trying rendered");
            }
        }

        let mut challenges_resolved: u32 = 0;
        loop {
            match self.rendered.discover(query).await {
                Ok(candidates) if !candidates.is_empty() => {
                    // Discovery navigated the session; keep its cookies.
                    let state = self.rendered.session_snapshot().await;
                    if !state.is_empty() {
                        if let Err(e) = self.session_store.save(&state).await {
                            tracing::warn!(error = %e, "failed to persist session after discovery");
                        }
                    }
                    return Ok(candidates);
                }
                Ok(_) => break,
                Err(FetchError::ChallengeRequired(kind))
                    if challenges_resolved < self.config.challenge_max_retries =>
                {
                    match self.gate.resolve(kind).await {
                        Ok(()) => {
                            challenges_resolved += 1;
                            persist_verified_session(ctx).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "rendered discovery challenge unresolved");
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rendered discovery failed");
                    break;
                }
            }
        }

        Err(PipelineError::DiscoveryExhausted {
            term: query.search_term.clone(),
        })
    }
}
