//! Capability traits the pipeline depends on.
//!
//! The enrichment core never touches endpoint schemas or page selectors
//! directly: it sees a structured source and a rendered source, each
//! returning domain types or a typed error. Production implementations are
//! [`crate::StructuredClient`] and [`crate::RenderedFetcher`]; tests
//! substitute instrumented mocks.

use async_trait::async_trait;

use shelfscan_core::types::{Candidate, ItemDetail, Query, Review};

use crate::error::FetchError;
use crate::session::SessionState;

/// The fast path: stateless calls against the catalog's structured API.
///
/// Implementations own their retry policy; an `Err` returned here means the
/// call is unavailable after retries and the caller should fall back or
/// degrade, never abort the run.
#[async_trait]
pub trait StructuredSource: Send + Sync {
    /// Fetches one page of candidates for the query, already truncated to
    /// `query.max_candidates`.
    async fn discover(&self, query: &Query) -> Result<Vec<Candidate>, FetchError>;

    /// Fetches full detail for one candidate by numeric id.
    async fn fetch_detail(&self, candidate: &Candidate) -> Result<ItemDetail, FetchError>;

    /// Fetches up to `max_reviews` reviews in source-ranking order.
    async fn fetch_reviews(
        &self,
        candidate: &Candidate,
        max_reviews: usize,
    ) -> Result<Vec<Review>, FetchError>;
}

/// The fallback path: drives a shared page-rendering session.
///
/// The session is a single mutually-exclusive resource; implementations
/// serialize access internally, so callers may invoke these methods from
/// concurrent tasks without extra locking.
#[async_trait]
pub trait RenderedSource: Send + Sync {
    /// Discovers candidates by rendering the search page. Candidates from
    /// this path may lack a numeric id.
    async fn discover(&self, query: &Query) -> Result<Vec<Candidate>, FetchError>;

    /// Renders one candidate's page and extracts detail and reviews in a
    /// single navigation; the rendered path is atomic per item.
    async fn fetch_item(
        &self,
        candidate: &Candidate,
        max_reviews: usize,
    ) -> Result<(ItemDetail, Vec<Review>), FetchError>;

    /// Replaces the session credential state (cookies etc.) with a
    /// previously persisted one.
    async fn restore_session(&self, state: SessionState);

    /// Snapshots the current session state for persistence.
    async fn session_snapshot(&self) -> SessionState;
}
