use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::offer::{Offer, Store};
use crate::sources::{get_json, scalar_text, SourceContext, UNPRICED};

const CACHE_KEY: &str = "gog_top";
const CACHE_TTL: Duration = Duration::from_secs(60 * 10);
const MAX_PRODUCTS: usize = 15;

#[derive(Debug, Deserialize)]
struct GogResponse {
    #[serde(default)]
    products: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GogProduct {
    id: Option<Value>,
    title: Option<String>,
    price: Option<GogPrice>,
    url: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GogPrice {
    amount: Option<Value>,
    currency: Option<String>,
}

/// Current top catalog listing from the GOG ajax feed.
///
/// The feed does not expose a separate sale price: a product with no price
/// payload at all is treated as promotional (discount renders the literal
/// `"0"`), otherwise both prices render identically.
pub async fn fetch_gog_offers(ctx: &SourceContext) -> Vec<Offer> {
    if let Some(offers) = ctx.cache.get(CACHE_KEY).await {
        return offers;
    }

    let params = [("mediaType", "game"), ("page", "1"), ("sort", "popularity")];
    let envelope: GogResponse = match get_json(&ctx.http, &ctx.endpoints.gog, &params).await {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(source = "gog", error = %err, "fetch failed");
            return Vec::new();
        }
    };

    let offers = normalize(envelope);
    ctx.cache.put(CACHE_KEY, offers.clone(), CACHE_TTL).await;
    offers
}

fn normalize(envelope: GogResponse) -> Vec<Offer> {
    let mut offers = Vec::new();
    for product in envelope.products.into_iter().take(MAX_PRODUCTS) {
        let product: GogProduct = match serde_json::from_value(product) {
            Ok(product) => product,
            Err(err) => {
                warn!(source = "gog", error = %err, "skipping malformed product");
                continue;
            }
        };

        let (original_price, current_price) = match product.price {
            None => (UNPRICED.to_string(), "0".to_string()),
            Some(price) => {
                let rendered = format!(
                    "{}{}",
                    price.amount.as_ref().map(scalar_text).unwrap_or_default(),
                    price.currency.unwrap_or_default()
                );
                (rendered.clone(), rendered)
            }
        };

        offers.push(Offer {
            store: Store::Gog,
            external_id: product.id.as_ref().map(scalar_text).unwrap_or_default(),
            title: product.title.unwrap_or_default(),
            original_price,
            current_price,
            url: format!("https://www.gog.com{}", product.url.unwrap_or_default()),
            image_url: product.image.map(|image| format!("{image}.jpg")),
        });
    }

    offers
}
