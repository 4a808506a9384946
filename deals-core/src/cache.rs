use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::offer::Offer;

#[derive(Debug, Clone)]
struct CacheEntry {
    expires_at: Instant,
    offers: Vec<Offer>,
}

/// Time-bounded response cache shared by all adapters.
///
/// An entry is visible until its TTL elapses; an expired entry is evicted on
/// the read that observes it, so no background sweeper is needed. A racing
/// `put` for the same key overwrites, last write wins.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Offer>> {
        let mut inner = self.inner.write().await;
        match inner.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => Some(entry.offers.clone()),
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, key: impl Into<String>, offers: Vec<Offer>, ttl: Duration) {
        let entry = CacheEntry {
            expires_at: Instant::now() + ttl,
            offers,
        };
        self.inner.write().await.insert(key.into(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::Store;

    fn offer(id: &str) -> Offer {
        Offer {
            store: Store::Steam,
            external_id: id.into(),
            title: "T".into(),
            original_price: "—".into(),
            current_price: "—".into(),
            url: "https://example.com".into(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn get_returns_payload_before_expiry() {
        let cache = ResponseCache::new();
        cache
            .put("k", vec![offer("1")], Duration::from_secs(60))
            .await;
        let got = cache.get("k").await.expect("entry should be live");
        assert_eq!(got[0].external_id, "1");
    }

    #[tokio::test]
    async fn get_is_absent_and_evicts_after_expiry() {
        let cache = ResponseCache::new();
        cache
            .put("k", vec![offer("1")], Duration::from_millis(20))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k").await.is_none());
        // the expired entry was physically removed by the read
        assert!(cache.inner.read().await.get("k").is_none());
    }

    #[tokio::test]
    async fn racing_put_overwrites_with_last_ttl() {
        let cache = ResponseCache::new();
        cache
            .put("k", vec![offer("old")], Duration::from_secs(60))
            .await;
        cache
            .put("k", vec![offer("new")], Duration::from_secs(60))
            .await;
        let got = cache.get("k").await.unwrap();
        assert_eq!(got[0].external_id, "new");
    }
}
