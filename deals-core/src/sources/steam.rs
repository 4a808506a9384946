use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::offer::{Offer, Store};
use crate::sources::{get_json, scalar_text, SourceContext, UNPRICED};

const CACHE_TTL: Duration = Duration::from_secs(60 * 5);

#[derive(Debug, Deserialize)]
struct SteamResponse {
    items: Option<Vec<Value>>,
    results: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SteamItem {
    id: Option<Value>,
    appid: Option<Value>,
    name: Option<String>,
    title: Option<String>,
    price: Option<SteamPrice>,
    #[serde(default)]
    is_free: bool,
    tiny_image: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SteamPrice {
    #[serde(rename = "final")]
    final_amount: Option<i64>,
    initial: Option<i64>,
}

/// Store-search results for a query term.
///
/// Prices arrive as integer minor units and render as `"$X.YY"`; an explicit
/// free flag or a missing price renders the literal free marker. The cache
/// key incorporates the query and limit so distinct searches never collide.
pub async fn fetch_steam_offers(ctx: &SourceContext, query: &str, limit: usize) -> Vec<Offer> {
    let cache_key = format!("steam:{query}:{limit}");
    if let Some(offers) = ctx.cache.get(&cache_key).await {
        return offers;
    }

    let count = limit.to_string();
    let params = [
        ("term", query),
        ("l", "english"),
        ("cc", "US"),
        ("count", count.as_str()),
    ];
    let envelope: SteamResponse = match get_json(&ctx.http, &ctx.endpoints.steam, &params).await {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(source = "steam", query, error = %err, "fetch failed");
            return Vec::new();
        }
    };

    let offers = normalize(envelope, limit);
    ctx.cache.put(cache_key, offers.clone(), CACHE_TTL).await;
    offers
}

fn normalize(envelope: SteamResponse, limit: usize) -> Vec<Offer> {
    let items = envelope
        .items
        .or(envelope.results)
        .unwrap_or_default();

    let mut offers = Vec::new();
    for item in items.into_iter().take(limit) {
        let item: SteamItem = match serde_json::from_value(item) {
            Ok(item) => item,
            Err(err) => {
                warn!(source = "steam", error = %err, "skipping malformed item");
                continue;
            }
        };

        let app_id = item
            .id
            .as_ref()
            .or(item.appid.as_ref())
            .map(scalar_text)
            .unwrap_or_default();

        let (original_price, current_price) = match &item.price {
            Some(price) => {
                let current = match price.final_amount {
                    Some(cents) => format!("${:.2}", cents as f64 / 100.0),
                    None if item.is_free => "Free".to_string(),
                    None => UNPRICED.to_string(),
                };
                let original = price
                    .initial
                    .map(|cents| cents.to_string())
                    .unwrap_or_else(|| UNPRICED.to_string());
                (original, current)
            }
            None if item.is_free => (UNPRICED.to_string(), "Free".to_string()),
            None => (UNPRICED.to_string(), UNPRICED.to_string()),
        };

        let url = if app_id.is_empty() {
            item.url.unwrap_or_default()
        } else {
            format!("https://store.steampowered.com/app/{app_id}/")
        };

        offers.push(Offer {
            store: Store::Steam,
            external_id: app_id,
            title: item.name.or(item.title).unwrap_or_default(),
            original_price,
            current_price,
            url,
            image_url: item.tiny_image,
        });
    }

    offers
}
