//! Per-item enrichment.
//!
//! Each candidate moves through one task: try the structured path when the
//! candidate carries an id, fall back to the rendered path when it fails or
//! when there is no id, and resolve challenges through the gate. Every exit
//! produces exactly one [`EnrichedItem`]: failures degrade, never drop.

use std::sync::Arc;

use shelfscan_core::types::{Candidate, EnrichedItem, EnrichmentPath, ItemDetail};
use shelfscan_fetch::{
    ChallengeGate, FetchError, RenderedSource, SessionStore, StructuredSource,
};

use crate::cancel::CancelFlag;

/// Shared dependencies of every enrichment task in a run.
pub(crate) struct EnrichmentContext {
    pub structured: Arc<dyn StructuredSource>,
    pub rendered: Arc<dyn RenderedSource>,
    pub gate: ChallengeGate,
    pub session_store: SessionStore,
    pub challenge_max_retries: u32,
    pub cancel: CancelFlag,
}

/// Enriches one candidate to a terminal state.
pub(crate) async fn enrich_candidate(
    ctx: &EnrichmentContext,
    candidate: Candidate,
    max_reviews: usize,
) -> EnrichedItem {
    if ctx.cancel.is_cancelled() {
        return EnrichedItem::degraded(
            candidate,
            ItemDetail::default(),
            Vec::new(),
            None,
            "cancelled before enrichment started",
        );
    }

    tracing::debug!(link = %candidate.link, id = ?candidate.id, "enriching");

    if candidate.id.is_some() {
        // Detail and reviews are independent calls on the structured path.
        let (detail, reviews) = tokio::join!(
            ctx.structured.fetch_detail(&candidate),
            ctx.structured.fetch_reviews(&candidate, max_reviews),
        );

        match (detail, reviews) {
            (Ok(detail), Ok(reviews)) => {
                return EnrichedItem::succeeded(
                    candidate,
                    detail,
                    reviews,
                    EnrichmentPath::Structured,
                );
            }
            (Ok(detail), Err(reviews_err)) => {
                // Detail landed, so the item stays on the structured path;
                // switching to rendered here would mix paths.
                tracing::warn!(link = %candidate.link, error = %reviews_err, "reviews unavailable");
                return EnrichedItem::degraded(
                    candidate,
                    detail,
                    Vec::new(),
                    Some(EnrichmentPath::Structured),
                    format!("reviews unavailable: {reviews_err}"),
                );
            }
            (Err(detail_err), _) => {
                tracing::warn!(
                    link = %candidate.link,
                    error = %detail_err,
                    "structured detail failed, falling back to rendered path"
                );
            }
        }
    }

    enrich_rendered(ctx, candidate, max_reviews).await
}

/// Rendered-path enrichment with challenge resolution.
///
/// A challenge suspends only this task on the gate; on confirmation the
/// now-verified session is persisted immediately, then the navigation is
/// retried. Timeouts and exhausted retries degrade the item.
async fn enrich_rendered(
    ctx: &EnrichmentContext,
    candidate: Candidate,
    max_reviews: usize,
) -> EnrichedItem {
    let mut challenges_resolved: u32 = 0;
    loop {
        match ctx.rendered.fetch_item(&candidate, max_reviews).await {
            Ok((detail, reviews)) => {
                return EnrichedItem::succeeded(
                    candidate,
                    detail,
                    reviews,
                    EnrichmentPath::Rendered,
                );
            }
            Err(FetchError::ChallengeRequired(kind)) => {
                if challenges_resolved >= ctx.challenge_max_retries {
                    return EnrichedItem::degraded(
                        candidate,
                        ItemDetail::default(),
                        Vec::new(),
                        None,
                        format!("challenge persisted after {challenges_resolved} resolutions ({kind})"),
                    );
                }
                match ctx.gate.resolve(kind).await {
                    Ok(()) => {
                        challenges_resolved += 1;
                        persist_verified_session(ctx).await;
                    }
                    Err(e) => {
                        return EnrichedItem::degraded(
                            candidate,
                            ItemDetail::default(),
                            Vec::new(),
                            None,
                            format!("challenge unresolved: {e}"),
                        );
                    }
                }
            }
            Err(e) => {
                return EnrichedItem::degraded(
                    candidate,
                    ItemDetail::default(),
                    Vec::new(),
                    None,
                    format!("rendered fetch failed: {e}"),
                );
            }
        }
    }
}

/// Saves the session right after an operator confirmation so the verified
/// state survives even if the run dies before its next natural save.
pub(crate) async fn persist_verified_session(ctx: &EnrichmentContext) {
    let mut state = ctx.rendered.session_snapshot().await;
    state.mark_verified();
    if let Err(e) = ctx.session_store.save(&state).await {
        tracing::warn!(error = %e, "failed to persist verified session");
    }
}
