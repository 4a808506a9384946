use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::ledger::Ledger;
use crate::messenger::Messenger;
use crate::offer::Offer;
use crate::sources::{fetch_epic_offers, fetch_gog_offers, SourceContext};

#[derive(Debug, Clone, Copy)]
pub struct WatcherConfig {
    /// How often to diff the current free offers against the ledger.
    pub period: Duration,
    /// Delay before the first run after startup.
    pub startup_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60 * 60 * 6),
            startup_delay: Duration::from_secs(10),
        }
    }
}

pub struct WatcherHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    pub async fn stop(self) -> Result<(), PipelineError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(PipelineError::from)
    }
}

/// Spawn the recurring free-offer check.
///
/// Runs strictly one check at a time: the run happens inline on the ticker
/// task and missed ticks are skipped, so a slow run can never overlap the
/// next one.
pub fn spawn_free_offer_watcher(
    ctx: SourceContext,
    ledger: Ledger,
    messenger: Arc<dyn Messenger>,
    config: WatcherConfig,
) -> WatcherHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        let start = Instant::now() + config.startup_delay;
        let mut ticker = tokio::time::interval_at(start, config.period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("free-offer watcher shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    match check_free_offers_once(&ctx, &ledger).await {
                        Ok(notices) => {
                            if let Err(err) =
                                notify_subscribers(&ledger, messenger.as_ref(), &notices).await
                            {
                                warn!(error = %err, "free-offer fan-out failed");
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "free-offer check failed");
                        }
                    }
                }
            }
        }
    });

    WatcherHandle { cancel_tx, join }
}

/// One diff pass: fetch the free-offer-participating sources, keep the
/// offers classified free, and record each against the ledger. Returns the
/// formatted notices for offers seen for the first time, so an unchanged
/// upstream set yields an empty batch.
pub async fn check_free_offers_once(
    ctx: &SourceContext,
    ledger: &Ledger,
) -> Result<Vec<String>, PipelineError> {
    let (epic, gog) = tokio::join!(fetch_epic_offers(ctx), fetch_gog_offers(ctx));

    let mut notices = Vec::new();
    for offer in epic.into_iter().chain(gog) {
        if !offer.is_free() {
            continue;
        }
        if ledger.record_offer_if_new(&offer).await? {
            notices.push(render_notice(&offer));
        }
    }

    if notices.is_empty() {
        info!("no new free offers");
    } else {
        info!(count = notices.len(), "new free offers found");
    }
    Ok(notices)
}

/// Deliver the batch to every subscriber independently. A failed delivery is
/// logged and never aborts the rest of the fan-out; the ledger writes made by
/// the diff pass stand regardless of delivery outcome. Returns the number of
/// successful deliveries.
pub async fn notify_subscribers(
    ledger: &Ledger,
    messenger: &dyn Messenger,
    notices: &[String],
) -> Result<usize, PipelineError> {
    if notices.is_empty() {
        return Ok(0);
    }

    let subscribers = ledger.subscribers().await?;
    if subscribers.is_empty() {
        info!("no subscribers, skipping fan-out");
        return Ok(0);
    }

    let text = notices.join("\n\n");
    let mut delivered = 0;
    for chat_id in subscribers {
        match messenger.send_message(chat_id, &text).await {
            Ok(()) => delivered += 1,
            Err(err) => {
                warn!(chat_id, error = %err, "failed to deliver free-offer notice");
            }
        }
    }
    Ok(delivered)
}

fn render_notice(offer: &Offer) -> String {
    format!(
        "🎁 {} — free: {}\n{}",
        offer.store.display_name(),
        offer.title,
        offer.url
    )
}
