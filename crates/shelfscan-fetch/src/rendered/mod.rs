//! Rendered-page fallback fetcher.
//!
//! Drives a single shared rendering session through [`RenderClient`]. The
//! session is *not* safe to use concurrently across items: every navigation
//! runs under one `tokio::sync::Mutex`, separate from (and in addition to)
//! the pipeline's counting fan-out limit. Between navigations a randomised
//! pacing delay keeps request timing human-shaped.
//!
//! Every navigation is challenge-checked before extraction; a blocked page
//! surfaces as [`FetchError::ChallengeRequired`] for the owning task to
//! resolve through the gate.

mod extract;
mod render_client;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use shelfscan_core::types::{Candidate, ItemDetail, Query, Review};

use crate::challenge;
use crate::error::FetchError;
use crate::fetcher::RenderedSource;
use crate::session::SessionState;

pub use render_client::{RenderClient, RenderedPage};

/// Fallback fetcher over a shared, mutually-exclusive rendering session.
pub struct RenderedFetcher {
    render: RenderClient,
    catalog_base_url: String,
    pacing_min_ms: u64,
    pacing_max_ms: u64,
    session: Mutex<SessionState>,
    navigated: AtomicBool,
}

impl RenderedFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the render client cannot be built.
    pub fn new(
        render_base_url: &str,
        render_token: Option<&str>,
        render_timeout_secs: u64,
        catalog_base_url: &str,
        pacing_min_ms: u64,
        pacing_max_ms: u64,
    ) -> Result<Self, FetchError> {
        let render = RenderClient::new(render_base_url, render_token, render_timeout_secs)?;
        Ok(Self {
            render,
            catalog_base_url: catalog_base_url.trim_end_matches('/').to_owned(),
            pacing_min_ms,
            pacing_max_ms,
            session: Mutex::new(SessionState::default()),
            navigated: AtomicBool::new(false),
        })
    }

    /// Navigates under the session lock: pace, render, absorb the updated
    /// cookie jar, challenge-check. Returns the page HTML.
    ///
    /// The lock is held for the full navigation, including the pacing sleep:
    /// one browser context, one driver at a time.
    async fn navigate(&self, url: &str) -> Result<String, FetchError> {
        let mut session = self.session.lock().await;

        if self.navigated.swap(true, Ordering::SeqCst) && self.pacing_max_ms > 0 {
            let delay_ms = rand::random_range(self.pacing_min_ms..=self.pacing_max_ms);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        let page = self.render.render(url, &session.cookies).await?;
        if !page.cookies.is_empty() {
            session.cookies = page.cookies;
        }

        if let Some(kind) = challenge::classify(&page.final_url, &page.html) {
            tracing::warn!(url, final_url = %page.final_url, %kind, "rendered navigation blocked");
            return Err(FetchError::ChallengeRequired(kind));
        }
        Ok(page.html)
    }
}

#[async_trait]
impl RenderedSource for RenderedFetcher {
    async fn discover(&self, query: &Query) -> Result<Vec<Candidate>, FetchError> {
        let search_url = format!(
            "{}/search?q={}",
            self.catalog_base_url,
            query.search_term.replace(' ', "+")
        );
        let html = self.navigate(&search_url).await?;
        let mut candidates = extract::parse_search(&html, &self.catalog_base_url)?;
        candidates.truncate(query.max_candidates);
        tracing::info!(
            term = %query.search_term,
            count = candidates.len(),
            "rendered discovery complete"
        );
        Ok(candidates)
    }

    async fn fetch_item(
        &self,
        candidate: &Candidate,
        max_reviews: usize,
    ) -> Result<(ItemDetail, Vec<Review>), FetchError> {
        let html = self.navigate(&candidate.link).await?;
        extract::parse_product(&html, max_reviews)
    }

    async fn restore_session(&self, state: SessionState) {
        let mut session = self.session.lock().await;
        *session = state;
    }

    async fn session_snapshot(&self) -> SessionState {
        self.session.lock().await.clone()
    }
}
