use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::offer::{Offer, Store};
use crate::sources::{get_json, SourceContext, UNPRICED};

const CACHE_KEY: &str = "epic_top";
const CACHE_TTL: Duration = Duration::from_secs(60 * 10);
const MAX_OFFERS: usize = 10;

#[derive(Debug, Deserialize)]
struct EpicResponse {
    data: Option<EpicData>,
}

#[derive(Debug, Deserialize)]
struct EpicData {
    #[serde(rename = "Catalog")]
    catalog: Option<EpicCatalog>,
}

#[derive(Debug, Deserialize)]
struct EpicCatalog {
    #[serde(rename = "searchStore")]
    search_store: Option<EpicSearchStore>,
}

#[derive(Debug, Deserialize)]
struct EpicSearchStore {
    #[serde(default)]
    elements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct EpicElement {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "productSlug")]
    product_slug: Option<String>,
    price: Option<EpicPrice>,
    #[serde(rename = "keyImages", default)]
    key_images: Vec<EpicImage>,
    promotions: Option<EpicPromotions>,
}

#[derive(Debug, Deserialize)]
struct EpicPromotions {
    #[serde(rename = "promotionalOffers", default)]
    current: Vec<Value>,
    #[serde(rename = "upcomingPromotionalOffers", default)]
    upcoming: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct EpicPrice {
    #[serde(rename = "totalPrice")]
    total_price: Option<EpicTotalPrice>,
}

#[derive(Debug, Deserialize)]
struct EpicTotalPrice {
    #[serde(rename = "fmtPrice")]
    fmt_price: Option<EpicFmtPrice>,
}

#[derive(Debug, Deserialize)]
struct EpicFmtPrice {
    #[serde(rename = "originalPrice")]
    original_price: Option<String>,
    #[serde(rename = "discountPrice")]
    discount_price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EpicImage {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
}

/// Current flash-promotion offers from the Epic feed.
///
/// Degrades to empty on any transport failure; malformed elements are
/// skipped so one bad record never drops the rest of the listing.
pub async fn fetch_epic_offers(ctx: &SourceContext) -> Vec<Offer> {
    if let Some(offers) = ctx.cache.get(CACHE_KEY).await {
        return offers;
    }

    let envelope: EpicResponse = match get_json(&ctx.http, &ctx.endpoints.epic, &[]).await {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(source = "epic", error = %err, "fetch failed");
            return Vec::new();
        }
    };

    let offers = normalize(envelope);
    ctx.cache.put(CACHE_KEY, offers.clone(), CACHE_TTL).await;
    offers
}

fn normalize(envelope: EpicResponse) -> Vec<Offer> {
    let elements = envelope
        .data
        .and_then(|d| d.catalog)
        .and_then(|c| c.search_store)
        .map(|s| s.elements)
        .unwrap_or_default();

    let mut offers = Vec::new();
    for element in elements {
        let element: EpicElement = match serde_json::from_value(element) {
            Ok(element) => element,
            Err(err) => {
                warn!(source = "epic", error = %err, "skipping malformed element");
                continue;
            }
        };

        // Only elements with a populated current or upcoming promotion group
        // count as offers; the feed lists the whole storefront page.
        let Some(promos) = element.promotions else {
            continue;
        };
        if promos.current.is_empty() && promos.upcoming.is_empty() {
            continue;
        }

        let slug = element.product_slug.unwrap_or_default();
        let title = element
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| {
                if slug.is_empty() {
                    "Unknown".to_string()
                } else {
                    slug.clone()
                }
            });
        let external_id = element.id.unwrap_or_else(|| title.clone());

        let fmt_price = element
            .price
            .and_then(|p| p.total_price)
            .and_then(|t| t.fmt_price);
        let (original_price, current_price) = match fmt_price {
            Some(fmt) => (
                fmt.original_price.unwrap_or_else(|| UNPRICED.into()),
                fmt.discount_price.unwrap_or_else(|| UNPRICED.into()),
            ),
            None => (UNPRICED.into(), UNPRICED.into()),
        };

        let image_url = element
            .key_images
            .into_iter()
            .find(|img| img.kind.as_deref() == Some("Thumbnail"))
            .and_then(|img| img.url);

        offers.push(Offer {
            store: Store::Epic,
            external_id,
            title,
            original_price,
            current_price,
            url: format!("https://store.epicgames.com/p/{slug}"),
            image_url,
        });

        if offers.len() >= MAX_OFFERS {
            break;
        }
    }

    offers
}
