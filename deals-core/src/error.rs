use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("response decoding error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("watcher task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Failure to reach one recipient. Fan-out catches these per subscriber.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}
