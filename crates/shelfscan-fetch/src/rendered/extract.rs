//! Selector-based field extraction from rendered catalog pages.
//!
//! The markup contract lives here and only here: the rest of the crate sees
//! domain types. Selectors target the catalog's stable data attributes with
//! class-based fallbacks for older page variants.

use scraper::{ElementRef, Html, Selector};

use shelfscan_core::types::{Candidate, ItemDetail, Review, Specification};

use crate::error::FetchError;

fn sel(raw: &str) -> Result<Selector, FetchError> {
    Selector::parse(raw).map_err(|e| FetchError::Extraction {
        context: "selector".to_owned(),
        reason: format!("bad selector \"{raw}\": {e}"),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Extracts listing candidates from a rendered search page.
///
/// Candidates from this path have no numeric id; enrichment for them is
/// forced onto the rendered path.
///
/// # Errors
///
/// Returns [`FetchError::Extraction`] when the result container is absent:
/// that page is not a search listing (or the markup shifted under us).
pub fn parse_search(html: &str, catalog_base_url: &str) -> Result<Vec<Candidate>, FetchError> {
    let document = Html::parse_document(html);
    let container = sel("[data-view-id=\"search_list\"], .product-list")?;
    let card = sel("[data-view-id=\"search_item\"], .product-item")?;
    let link_sel = sel("a[href]")?;
    let name_sel = sel("[data-view-id=\"item_name\"], .name")?;
    let price_sel = sel("[data-view-id=\"item_price\"], .price-discount__price")?;
    let image_sel = sel("img[src]")?;

    let Some(list) = document.select(&container).next() else {
        return Err(FetchError::Extraction {
            context: "search page".to_owned(),
            reason: "result container not found".to_owned(),
        });
    };

    let base = catalog_base_url.trim_end_matches('/');
    let mut candidates = Vec::new();
    for item in list.select(&card) {
        let Some(href) = item
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let link = if href.starts_with("http") {
            href.to_owned()
        } else {
            format!("{base}/{}", href.trim_start_matches('/'))
        };
        let Some(name) = first_text(item, &name_sel) else {
            continue;
        };
        candidates.push(Candidate {
            id: None,
            link,
            name,
            price: first_text(item, &price_sel),
            rating: None,
            image: item
                .select(&image_sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_owned),
        });
    }
    Ok(candidates)
}

/// Extracts detail and reviews from a rendered product page in one pass.
///
/// # Errors
///
/// Returns [`FetchError::Extraction`] when the page has neither a
/// description block nor a specification table, i.e. it is not a product page.
pub fn parse_product(
    html: &str,
    max_reviews: usize,
) -> Result<(ItemDetail, Vec<Review>), FetchError> {
    let document = Html::parse_document(html);

    let description_sel = sel("[data-view-id=\"product_description\"], .product-description")?;
    let spec_row_sel = sel("[data-view-id=\"product_specs\"] tr, .specification-table tr")?;
    let cell_sel = sel("td")?;
    let brand_sel = sel("[data-view-id=\"product_brand\"], .brand-name")?;
    let seller_sel = sel("[data-view-id=\"product_seller\"], .seller-name")?;

    let root = document.root_element();
    let description = first_text(root, &description_sel);

    let mut specifications = Vec::new();
    for row in root.select(&spec_row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(text_of).collect();
        if cells.len() >= 2 && !cells[0].is_empty() {
            specifications.push(Specification {
                name: cells[0].clone(),
                value: cells[1].clone(),
            });
        }
    }

    if description.is_none() && specifications.is_empty() {
        return Err(FetchError::Extraction {
            context: "product page".to_owned(),
            reason: "neither description nor specifications found".to_owned(),
        });
    }

    let detail = ItemDetail {
        description,
        specifications,
        brand: first_text(root, &brand_sel),
        seller: first_text(root, &seller_sel),
        // The rendered page does not expose a reliable stock flag.
        in_stock: None,
        images: Vec::new(),
    };

    let reviews = parse_reviews(root, max_reviews)?;
    Ok((detail, reviews))
}

fn parse_reviews(root: ElementRef<'_>, max_reviews: usize) -> Result<Vec<Review>, FetchError> {
    let item_sel = sel("[data-view-id=\"review_item\"], .review-item")?;
    let author_sel = sel("[data-view-id=\"review_author\"], .author-name")?;
    let content_sel = sel("[data-view-id=\"review_content\"], .review-content")?;
    let title_sel = sel("[data-view-id=\"review_title\"], .review-title")?;
    let star_sel = sel("[data-view-id=\"review_rating\"] .star.active, .rating-stars .active")?;
    let helpful_sel = sel("[data-view-id=\"review_helpful\"], .like-count")?;
    let reply_sel = sel("[data-view-id=\"review_seller_reply\"], .seller-reply")?;

    let mut reviews = Vec::new();
    for item in root.select(&item_sel).take(max_reviews) {
        let stars = item.select(&star_sel).count();
        reviews.push(Review {
            id: None,
            title: first_text(item, &title_sel),
            content: first_text(item, &content_sel),
            #[allow(clippy::cast_possible_truncation)]
            rating: (stars > 0).then_some(stars.min(5) as u8),
            author: first_text(item, &author_sel),
            created_at: None,
            helpful_count: first_text(item, &helpful_sel).and_then(|t| {
                t.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .ok()
            }),
            seller_reply: first_text(item, &reply_sel),
        });
    }
    Ok(reviews)
}
