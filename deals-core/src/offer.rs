use std::fmt;

use serde::{Deserialize, Serialize};

/// Storefronts the aggregator knows how to query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    Epic,
    Gog,
    Steam,
}

impl Store {
    /// Stable lowercase form used as the ledger key and in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Store::Epic => "epic",
            Store::Gog => "gog",
            Store::Steam => "steam",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Store::Epic => "Epic",
            Store::Gog => "GOG",
            Store::Steam => "Steam",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized promotional listing from one store.
///
/// Prices stay opaque display strings: the stores use incompatible formats
/// (currency codes, cents-as-integers, locale symbols) and only the
/// free/non-free classification is derived from them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub store: Store,
    /// Unique within one fetch from one store; `(store, external_id)` is the
    /// dedup key in the ledger.
    pub external_id: String,
    pub title: String,
    pub original_price: String,
    pub current_price: String,
    pub url: String,
    pub image_url: Option<String>,
}

impl Offer {
    pub fn is_free(&self) -> bool {
        is_free_price(&self.current_price)
    }
}

/// Markers the stores render for a zero-cost offer, including the localized
/// one observed in the flash-promotions feed.
const FREE_MARKERS: [&str; 4] = ["0", "0.00", "free", "бесплат"];

/// Loose string classification of a rendered discount price.
///
/// Matches the marker set by equality or substring containment, so `"$0"`
/// classifies as free but so does `"$10.00"`. This reproduces the upstream
/// behaviour on purpose rather than tightening it to a numeric-zero check.
pub fn is_free_price(price: &str) -> bool {
    let normalized = price.trim().to_lowercase();
    FREE_MARKERS
        .iter()
        .any(|marker| normalized == *marker || normalized.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_markers_classify_as_free() {
        for price in ["0", "0.00", "Free", "FREE", "$0", "БЕСПЛАТНО"] {
            assert!(is_free_price(price), "{price} should classify as free");
        }
    }

    #[test]
    fn regular_prices_are_not_free() {
        for price in ["$19.99", "14.99USD", "—", ""] {
            assert!(!is_free_price(price), "{price} should not classify as free");
        }
    }

    #[test]
    fn offer_is_free_uses_current_price() {
        let offer = Offer {
            store: Store::Epic,
            external_id: "x".into(),
            title: "T".into(),
            original_price: "$19.99".into(),
            current_price: "0".into(),
            url: "https://example.com".into(),
            image_url: None,
        };
        assert!(offer.is_free());
    }
}
