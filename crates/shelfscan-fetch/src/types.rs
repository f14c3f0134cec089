//! Wire types for the catalog's structured JSON API.
//!
//! ## Observed shapes
//!
//! ### Search (`GET /api/v2/products?q=…&limit=…`)
//! Items arrive under a top-level `data` array. `url_path` is a relative
//! page path and may be absent, in which case the canonical link is derived
//! from the numeric id (`/item-p{id}.html`). Prices are plain numbers in the
//! catalog's minor currency unit; we carry them as decimal strings.
//!
//! ### Detail (`GET /api/v2/products/{id}?platform=web&version=3`)
//! Specifications are grouped: each group holds an `attributes` array of
//! name/value pairs. We flatten groups in order. `stock_item.qty` > 0 means
//! purchasable. `images[].base_url` is the gallery.
//!
//! ### Reviews (`GET /api/v2/reviews?product_id=…&limit=…&page=…`)
//! Paged under `data` with a `paging.last_page` marker. `created_at` is a
//! unix timestamp in seconds. `thank_count` is the helpfulness counter.
//! Review order within a page follows the requested sort; it is not stable
//! across pages.

use chrono::DateTime;
use serde::Deserialize;

use shelfscan_core::types::{Candidate, ItemDetail, Review, Specification};

/// Top-level response from the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<SearchItem>,
}

/// One listing from a search page.
#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: i64,

    #[serde(default)]
    pub name: Option<String>,

    /// Relative product page path, e.g. `"phone-case-p101.html"`.
    #[serde(default)]
    pub url_path: Option<String>,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    pub rating_average: Option<f64>,

    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl SearchItem {
    /// Builds the discovery-stage candidate, deriving the canonical link from
    /// `url_path` when present and from the numeric id otherwise.
    #[must_use]
    pub fn into_candidate(self, catalog_base_url: &str) -> Candidate {
        let base = catalog_base_url.trim_end_matches('/');
        let link = match self.url_path.as_deref() {
            Some(path) if !path.is_empty() => format!("{base}/{}", path.trim_start_matches('/')),
            _ => format!("{base}/item-p{}.html", self.id),
        };
        Candidate {
            id: Some(self.id),
            link,
            name: self.name.unwrap_or_default(),
            price: self.price.map(|p| format!("{p}")),
            rating: self.rating_average,
            image: self.thumbnail_url,
        }
    }
}

/// Response from the product detail endpoint.
#[derive(Debug, Deserialize)]
pub struct ProductDetailResponse {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub specifications: Vec<SpecificationGroup>,

    #[serde(default)]
    pub brand: Option<BrandInfo>,

    #[serde(default)]
    pub current_seller: Option<SellerInfo>,

    #[serde(default)]
    pub stock_item: Option<StockInfo>,

    #[serde(default)]
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SpecificationGroup {
    #[serde(default)]
    pub attributes: Vec<SpecificationAttribute>,
}

#[derive(Debug, Deserialize)]
pub struct SpecificationAttribute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrandInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SellerInfo {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockInfo {
    #[serde(default)]
    pub qty: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub base_url: Option<String>,
}

impl From<ProductDetailResponse> for ItemDetail {
    fn from(resp: ProductDetailResponse) -> Self {
        let specifications = resp
            .specifications
            .into_iter()
            .flat_map(|group| group.attributes)
            .filter_map(|attr| {
                let name = attr.name?;
                Some(Specification {
                    name,
                    value: attr.value.unwrap_or_default(),
                })
            })
            .collect();
        ItemDetail {
            description: resp.description.filter(|d| !d.is_empty()),
            specifications,
            brand: resp.brand.and_then(|b| b.name),
            seller: resp.current_seller.and_then(|s| s.name),
            in_stock: resp.stock_item.map(|s| s.qty.unwrap_or(0) > 0),
            images: resp
                .images
                .into_iter()
                .filter_map(|img| img.base_url)
                .collect(),
        }
    }
}

/// One page of reviews.
#[derive(Debug, Deserialize)]
pub struct ReviewsResponse {
    #[serde(default)]
    pub data: Vec<ReviewItem>,

    #[serde(default)]
    pub paging: Option<ReviewPaging>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPaging {
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub last_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewItem {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub rating: Option<u8>,

    #[serde(default)]
    pub created_by: Option<ReviewAuthor>,

    /// Unix timestamp in seconds.
    #[serde(default)]
    pub created_at: Option<i64>,

    #[serde(default)]
    pub thank_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

impl From<ReviewItem> for Review {
    fn from(item: ReviewItem) -> Self {
        Review {
            id: item.id,
            title: item.title.filter(|t| !t.is_empty()),
            content: item.content.filter(|c| !c.is_empty()),
            rating: item.rating,
            author: item.created_by.and_then(|a| a.name),
            created_at: item
                .created_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            helpful_count: item.thank_count,
            // The structured API carries seller replies on a separate
            // endpoint we do not call; only the rendered path fills this.
            seller_reply: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_item_link_prefers_url_path() {
        let item = SearchItem {
            id: 101,
            name: Some("Phone Case".to_owned()),
            url_path: Some("phone-case-p101.html".to_owned()),
            price: Some(12.99),
            rating_average: Some(4.5),
            thumbnail_url: None,
        };
        let candidate = item.into_candidate("https://catalog.example/");
        assert_eq!(
            candidate.link,
            "https://catalog.example/phone-case-p101.html"
        );
        assert_eq!(candidate.id, Some(101));
    }

    #[test]
    fn search_item_link_falls_back_to_id() {
        let item = SearchItem {
            id: 102,
            name: None,
            url_path: None,
            price: None,
            rating_average: None,
            thumbnail_url: None,
        };
        let candidate = item.into_candidate("https://catalog.example");
        assert_eq!(candidate.link, "https://catalog.example/item-p102.html");
    }

    #[test]
    fn detail_flattens_specification_groups_in_order() {
        let resp: ProductDetailResponse = serde_json::from_value(serde_json::json!({
            "description": "A case.",
            "specifications": [
                {"attributes": [{"name": "Material", "value": "Silicone"}]},
                {"attributes": [{"name": "Color", "value": "Black"}, {"value": "ignored"}]}
            ],
            "brand": {"name": "Acme"},
            "current_seller": {"name": "Acme Store"},
            "stock_item": {"qty": 3},
            "images": [{"base_url": "https://cdn.example/1.jpg"}]
        }))
        .expect("fixture should deserialize");
        let detail = ItemDetail::from(resp);
        assert_eq!(detail.specifications.len(), 2);
        assert_eq!(detail.specifications[0].name, "Material");
        assert_eq!(detail.specifications[1].name, "Color");
        assert_eq!(detail.in_stock, Some(true));
        assert_eq!(detail.images, vec!["https://cdn.example/1.jpg"]);
    }

    #[test]
    fn review_converts_unix_timestamp() {
        let item: ReviewItem = serde_json::from_value(serde_json::json!({
            "id": 7,
            "title": "",
            "content": "Great case",
            "rating": 5,
            "created_by": {"name": "lan"},
            "created_at": 1_700_000_000,
            "thank_count": 12
        }))
        .expect("fixture should deserialize");
        let review = Review::from(item);
        assert_eq!(review.title, None, "empty title becomes None");
        assert_eq!(review.author.as_deref(), Some("lan"));
        assert!(review.created_at.is_some());
        assert_eq!(review.helpful_count, Some(12));
    }
}
