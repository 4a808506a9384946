use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deals_core::{
    check_free_offers_once, notify_subscribers, spawn_free_offer_watcher, DeliveryError, Ledger,
    Messenger, SourceContext, SourceEndpoints, WatcherConfig,
};

struct Recorder {
    sent: Mutex<Vec<(i64, String)>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Messenger for Recorder {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.sent.lock().await.push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Rejects every delivery to one chat, records the rest.
struct Flaky {
    broken_chat: i64,
    sent: Mutex<Vec<(i64, String)>>,
}

#[async_trait]
impl Messenger for Flaky {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        if chat_id == self.broken_chat {
            return Err(DeliveryError::Rejected("blocked by recipient".into()));
        }
        self.sent.lock().await.push((chat_id, text.to_string()));
        Ok(())
    }
}

fn test_ctx(server: &MockServer) -> SourceContext {
    let mut ctx = SourceContext::new(Client::new());
    ctx.endpoints = SourceEndpoints {
        epic: format!("{}/freeGamesPromotions", server.uri()),
        gog: format!("{}/games/ajax/filtered", server.uri()),
        steam: format!("{}/api/storesearch/", server.uri()),
    };
    ctx
}

async fn mount_one_free_epic_offer(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/freeGamesPromotions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "Catalog": { "searchStore": { "elements": [{
                "id": "galaxy-1",
                "title": "Galaxy Raiders",
                "productSlug": "galaxy-raiders",
                "price": { "totalPrice": { "fmtPrice": {
                    "originalPrice": "$19.99",
                    "discountPrice": "0"
                }}},
                "keyImages": [],
                "promotions": { "promotionalOffers": [{ "promotionalOffers": [{}] }] }
            }]}}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/games/ajax/filtered"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "products": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn first_run_notifies_second_run_is_silent() {
    let server = MockServer::start().await;
    mount_one_free_epic_offer(&server).await;

    let ctx = test_ctx(&server);
    let ledger = Ledger::in_memory().await.unwrap();
    ledger.add_subscriber(11).await.unwrap();
    ledger.add_subscriber(22).await.unwrap();
    let recorder = Recorder::new();

    // first run: one new ledger entry, one notice, both subscribers reached
    let notices = check_free_offers_once(&ctx, &ledger).await.unwrap();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("Galaxy Raiders"));
    let delivered = notify_subscribers(&ledger, &recorder, &notices)
        .await
        .unwrap();
    assert_eq!(delivered, 2);
    {
        let sent = recorder.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, text)| text.contains("Galaxy Raiders")));
    }

    // second run against unchanged upstream data: nothing new, nothing sent
    let notices = check_free_offers_once(&ctx, &ledger).await.unwrap();
    assert!(notices.is_empty());
    let delivered = notify_subscribers(&ledger, &recorder, &notices)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert_eq!(recorder.sent.lock().await.len(), 2);
}

#[tokio::test]
async fn one_failed_delivery_does_not_abort_the_batch() {
    let server = MockServer::start().await;
    mount_one_free_epic_offer(&server).await;

    let ctx = test_ctx(&server);
    let ledger = Ledger::in_memory().await.unwrap();
    ledger.add_subscriber(11).await.unwrap();
    ledger.add_subscriber(22).await.unwrap();
    let flaky = Flaky {
        broken_chat: 11,
        sent: Mutex::new(Vec::new()),
    };

    let notices = check_free_offers_once(&ctx, &ledger).await.unwrap();
    let delivered = notify_subscribers(&ledger, &flaky, &notices).await.unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(flaky.sent.lock().await.len(), 1);

    // the ledger write stands even though one delivery failed
    let notices = check_free_offers_once(&ctx, &ledger).await.unwrap();
    assert!(notices.is_empty());
}

#[tokio::test]
async fn empty_subscriber_set_aborts_the_fanout_quietly() {
    let server = MockServer::start().await;
    mount_one_free_epic_offer(&server).await;

    let ctx = test_ctx(&server);
    let ledger = Ledger::in_memory().await.unwrap();
    let recorder = Recorder::new();

    let notices = check_free_offers_once(&ctx, &ledger).await.unwrap();
    assert_eq!(notices.len(), 1);
    let delivered = notify_subscribers(&ledger, &recorder, &notices)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert!(recorder.sent.lock().await.is_empty());
}

#[tokio::test]
async fn spawned_watcher_delivers_and_stops() {
    let server = MockServer::start().await;
    mount_one_free_epic_offer(&server).await;

    let ctx = test_ctx(&server);
    let ledger = Ledger::in_memory().await.unwrap();
    ledger.add_subscriber(7).await.unwrap();
    let recorder = Arc::new(Recorder::new());

    let handle = spawn_free_offer_watcher(
        ctx,
        ledger,
        recorder.clone(),
        WatcherConfig {
            period: Duration::from_millis(50),
            startup_delay: Duration::from_millis(0),
        },
    );

    // wait for the first run to fan out
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !recorder.sent.lock().await.is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher never delivered"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    handle.stop().await.expect("stop watcher");
}
