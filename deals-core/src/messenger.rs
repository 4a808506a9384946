use async_trait::async_trait;

use crate::error::DeliveryError;

/// Outbound delivery seam. The transport lives outside the pipeline; the
/// watcher only needs a way to push one text to one recipient.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError>;
}
