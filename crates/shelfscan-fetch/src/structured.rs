//! HTTP client for the catalog's structured JSON API.
//!
//! Stateless and cheap to parallelize: every call is an independent GET
//! wrapped in the retry policy. Non-success statuses become typed errors
//! (429 with its Retry-After, 404 and friends as `UnexpectedStatus`) and
//! are never fatal to the caller: the pipeline maps them to fallback or
//! degradation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use shelfscan_core::types::{Candidate, ItemDetail, Query, Review};

use crate::error::FetchError;
use crate::fetcher::StructuredSource;
use crate::retry::retry_with_backoff;
use crate::types::{ProductDetailResponse, ReviewsResponse, SearchResponse};

/// Reviews returned per page by the catalog API.
const REVIEW_PAGE_SIZE: usize = 20;

/// Guard against cycling review pagination.
///
/// Note: each page request may itself be retried up to `max_attempts`
/// times, so the worst-case request count per item is
/// `MAX_REVIEW_PAGES * max_attempts`.
const MAX_REVIEW_PAGES: u32 = 50;

/// Client for the catalog's structured endpoints (search, detail, reviews).
pub struct StructuredClient {
    client: Client,
    base_url: Url,
    /// Total attempts per call, first try included.
    max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    backoff_base_ms: u64,
}

impl StructuredClient {
    /// Creates a client with configured timeout, `User-Agent`, and retry
    /// policy. `max_attempts` counts the first try; `1` disables retries.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FetchError::InvalidUrl`] if `base_url`
    /// does not parse.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Normalise: exactly one trailing slash so joins land under the
        // root path rather than replacing the last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            max_attempts,
            backoff_base_ms,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// One retry-wrapped GET returning the deserialized body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, FetchError> {
        retry_with_backoff(self.max_attempts, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url.clone())
                    .header(
                        reqwest::header::ACCEPT,
                        "application/json, text/plain, */*",
                    )
                    .header(reqwest::header::REFERER, self.base_url.as_str())
                    .header("x-guest-token", "default")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(FetchError::RateLimited {
                        url: url.to_string(),
                        retry_after_secs,
                    });
                }

                if !status.is_success() {
                    return Err(FetchError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| FetchError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }

    fn candidate_id(candidate: &Candidate) -> Result<i64, FetchError> {
        candidate.id.ok_or_else(|| FetchError::MissingId {
            link: candidate.link.clone(),
        })
    }
}

#[async_trait]
impl StructuredSource for StructuredClient {
    async fn discover(&self, query: &Query) -> Result<Vec<Candidate>, FetchError> {
        let limit = query.max_candidates.min(40).to_string();
        let url = self.endpoint(
            "api/v2/products",
            &[("q", query.search_term.as_str()), ("limit", &limit)],
        )?;
        let response: SearchResponse = self
            .get_json(url, &format!("search \"{}\"", query.search_term))
            .await?;

        let base = self.base_url.as_str();
        let candidates: Vec<Candidate> = response
            .data
            .into_iter()
            .take(query.max_candidates)
            .map(|item| item.into_candidate(base))
            .collect();
        tracing::info!(
            term = %query.search_term,
            count = candidates.len(),
            "structured discovery complete"
        );
        Ok(candidates)
    }

    async fn fetch_detail(&self, candidate: &Candidate) -> Result<ItemDetail, FetchError> {
        let id = Self::candidate_id(candidate)?;
        let url = self.endpoint(
            &format!("api/v2/products/{id}"),
            &[("platform", "web"), ("version", "3")],
        )?;
        let response: ProductDetailResponse =
            self.get_json(url, &format!("detail for product {id}")).await?;
        Ok(ItemDetail::from(response))
    }

    async fn fetch_reviews(
        &self,
        candidate: &Candidate,
        max_reviews: usize,
    ) -> Result<Vec<Review>, FetchError> {
        let id = Self::candidate_id(candidate)?;
        let mut reviews: Vec<Review> = Vec::new();
        let mut page: u32 = 1;

        while reviews.len() < max_reviews && page <= MAX_REVIEW_PAGES {
            let limit = REVIEW_PAGE_SIZE.min(max_reviews).to_string();
            let id_str = id.to_string();
            let page_str = page.to_string();
            let url = self.endpoint(
                "api/v2/reviews",
                &[
                    ("product_id", id_str.as_str()),
                    ("limit", limit.as_str()),
                    ("page", page_str.as_str()),
                    ("sort", "score|desc,id|desc,stars|all"),
                ],
            )?;
            let response: ReviewsResponse = self
                .get_json(url, &format!("reviews page {page} for product {id}"))
                .await?;

            if response.data.is_empty() {
                break;
            }
            reviews.extend(response.data.into_iter().map(Review::from));

            let last_page = response.paging.as_ref().and_then(|p| p.last_page);
            match last_page {
                Some(last) if page >= last => break,
                // No paging marker: single-page response.
                None => break,
                _ => page += 1,
            }
        }

        reviews.truncate(max_reviews);
        Ok(reviews)
    }
}
