pub mod aggregator;
pub mod cache;
pub mod error;
pub mod ledger;
pub mod messenger;
pub mod offer;
pub mod sources;
pub mod watcher;

pub use aggregator::{compare, Comparison};
pub use cache::ResponseCache;
pub use error::{DeliveryError, PipelineError};
pub use ledger::Ledger;
pub use messenger::Messenger;
pub use offer::{is_free_price, Offer, Store};
pub use sources::{
    fetch_epic_offers, fetch_gog_offers, fetch_steam_offers, SourceContext, SourceEndpoints,
};
pub use watcher::{
    check_free_offers_once, notify_subscribers, spawn_free_offer_watcher, WatcherConfig,
    WatcherHandle,
};
