//! Domain model for a collection run.
//!
//! A run starts from a [`Query`], discovery produces [`Candidate`]s, and
//! enrichment merges an [`ItemDetail`] and a bounded sequence of [`Review`]s
//! onto each candidate to form the [`EnrichedItem`]s that make up the final
//! dataset. The merge is an explicit, fixed-shape assembly: detail fields
//! are never injected into the candidate record as loose keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of one collection run. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct Query {
    /// Search term submitted to the catalog.
    pub search_term: String,
    /// Upper bound on candidates taken from discovery.
    pub max_candidates: usize,
    /// Upper bound on reviews collected per item.
    pub max_reviews: usize,
    /// Width of the enrichment fan-out.
    pub concurrency: usize,
}

/// A discovered item before enrichment.
///
/// `id` is the catalog's numeric identifier. The structured discovery path
/// always yields one; the rendered path may only yield a link, in which case
/// enrichment for that candidate is forced onto the rendered path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub id: Option<i64>,

    /// Canonical product page URL.
    pub link: String,

    pub name: String,

    /// Listing price as a decimal string, passed through as returned by the
    /// source (rendered listings carry formatted text we do not re-parse).
    #[serde(default)]
    pub price: Option<String>,

    /// Average listing rating, when the source exposes one.
    #[serde(default)]
    pub rating: Option<f64>,

    /// Thumbnail URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// One name/value specification row, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub value: String,
}

/// Full product detail merged onto a candidate during enrichment.
///
/// All fields are optional or empty by default: a degraded item carries an
/// empty `ItemDetail` rather than being dropped from the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDetail {
    #[serde(default)]
    pub description: Option<String>,

    /// Ordered specification rows flattened from the source's groups.
    #[serde(default)]
    pub specifications: Vec<Specification>,

    #[serde(default)]
    pub brand: Option<String>,

    #[serde(default)]
    pub seller: Option<String>,

    /// `Some(true)` when the source reports the item purchasable.
    #[serde(default)]
    pub in_stock: Option<bool>,

    /// Gallery image URLs.
    #[serde(default)]
    pub images: Vec<String>,
}

impl ItemDetail {
    /// True when no field carries data, the shape a degraded item gets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.specifications.is_empty()
            && self.brand.is_none()
            && self.seller.is_none()
            && self.in_stock.is_none()
            && self.images.is_empty()
    }
}

/// A single customer review. Order within an item follows the source's
/// ranking at fetch time; it is not stable across review pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    /// Star rating, 1–5.
    #[serde(default)]
    pub rating: Option<u8>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// "Found this helpful" count.
    #[serde(default)]
    pub helpful_count: Option<i64>,

    /// Seller's public reply, when present.
    #[serde(default)]
    pub seller_reply: Option<String>,
}

/// Which fetch path produced an item's detail and reviews. Never mixed:
/// an item is enriched wholly via one path or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPath {
    Structured,
    Rendered,
}

/// Terminal outcome of one item's enrichment, attached to the emitted record
/// for downstream auditing. Degraded items keep their failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentStatus {
    Succeeded,
    Degraded { reason: String },
}

impl EnrichmentStatus {
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, EnrichmentStatus::Succeeded)
    }
}

/// The unit of checkpointing: a candidate plus everything enrichment
/// obtained for it. Exactly one per discovered candidate: partial failure
/// degrades the item, it never removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub candidate: Candidate,

    #[serde(default)]
    pub detail: ItemDetail,

    #[serde(default)]
    pub reviews: Vec<Review>,

    /// Absent when enrichment never completed a path (fully degraded item).
    #[serde(default)]
    pub path: Option<EnrichmentPath>,

    #[serde(flatten)]
    pub status: EnrichmentStatus,
}

impl EnrichedItem {
    /// Assembles a successfully enriched item from its parts.
    #[must_use]
    pub fn succeeded(
        candidate: Candidate,
        detail: ItemDetail,
        reviews: Vec<Review>,
        path: EnrichmentPath,
    ) -> Self {
        Self {
            candidate,
            detail,
            reviews,
            path: Some(path),
            status: EnrichmentStatus::Succeeded,
        }
    }

    /// Assembles a degraded item. Whatever was obtained before the failure
    /// is kept; unavailable fields stay empty.
    #[must_use]
    pub fn degraded(
        candidate: Candidate,
        detail: ItemDetail,
        reviews: Vec<Review>,
        path: Option<EnrichmentPath>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            candidate,
            detail,
            reviews,
            path,
            status: EnrichmentStatus::Degraded {
                reason: reason.into(),
            },
        }
    }
}
