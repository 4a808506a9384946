mod epic;
mod gog;
mod steam;

use std::time::Duration;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::error::PipelineError;

pub use epic::fetch_epic_offers;
pub use gog::fetch_gog_offers;
pub use steam::fetch_steam_offers;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Placeholder the feeds render for a price they do not expose.
pub(crate) const UNPRICED: &str = "—";

// The feeds are inconsistent about scalar types (numeric ids, string or
// numeric amounts), so render whatever arrives.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Upstream endpoints the adapters hit. Overridable so tests can point a
/// source at a mock server; the defaults are the live storefront endpoints.
#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    pub epic: String,
    pub gog: String,
    pub steam: String,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            epic: "https://store-site-backend-static.ak.epicgames.com/freeGamesPromotions".into(),
            gog: "https://www.gog.com/games/ajax/filtered".into(),
            steam: "https://store.steampowered.com/api/storesearch/".into(),
        }
    }
}

/// Everything an adapter needs, constructed once at startup and passed
/// explicitly. The HTTP client's connection pool and the cache are shared
/// across all concurrent adapter invocations.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub http: Client,
    pub cache: ResponseCache,
    pub endpoints: SourceEndpoints,
}

impl SourceContext {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            cache: ResponseCache::new(),
            endpoints: SourceEndpoints::default(),
        }
    }
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, PipelineError> {
    let response = client
        .get(url)
        .query(params)
        .header(header::ACCEPT, "application/json")
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}
