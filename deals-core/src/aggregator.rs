use crate::offer::Offer;
use crate::sources::{fetch_epic_offers, fetch_gog_offers, fetch_steam_offers, SourceContext};

const STEAM_COMPARE_LIMIT: usize = 3;

/// Per-store lookup result for one comparison query. A store that returned
/// nothing usable is simply absent; adapter failures look the same here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub steam: Option<Offer>,
    pub epic: Option<Offer>,
    pub gog: Option<Offer>,
}

/// Compare a title across all three stores.
///
/// Steam is query-addressable and gets the term as a search, first result
/// wins. Epic and GOG only expose a current listing, so the query is matched
/// case-insensitively as a substring against each title in source order.
pub async fn compare(ctx: &SourceContext, query: &str) -> Comparison {
    let (steam, epic, gog) = tokio::join!(
        fetch_steam_offers(ctx, query, STEAM_COMPARE_LIMIT),
        fetch_epic_offers(ctx),
        fetch_gog_offers(ctx),
    );

    Comparison {
        steam: steam.into_iter().next(),
        epic: match_by_title(&epic, query),
        gog: match_by_title(&gog, query),
    }
}

fn match_by_title(offers: &[Offer], query: &str) -> Option<Offer> {
    let needle = query.to_lowercase();
    offers
        .iter()
        .find(|offer| !offer.title.is_empty() && offer.title.to_lowercase().contains(&needle))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offer::Store;

    fn offer(title: &str) -> Offer {
        Offer {
            store: Store::Gog,
            external_id: title.into(),
            title: title.into(),
            original_price: "—".into(),
            current_price: "—".into(),
            url: "https://example.com".into(),
            image_url: None,
        }
    }

    #[test]
    fn match_by_title_is_case_insensitive_substring() {
        let offers = vec![offer("Some Other Game"), offer("Foo Bar Deluxe")];
        let found = match_by_title(&offers, "foo").expect("should match");
        assert_eq!(found.title, "Foo Bar Deluxe");
    }

    #[test]
    fn match_by_title_returns_first_in_source_order() {
        let offers = vec![offer("Foo One"), offer("Foo Two")];
        assert_eq!(match_by_title(&offers, "Foo").unwrap().title, "Foo One");
    }

    #[test]
    fn match_by_title_skips_empty_titles_and_misses() {
        let offers = vec![offer("")];
        assert!(match_by_title(&offers, "anything").is_none());
        assert!(match_by_title(&[], "foo").is_none());
    }
}
