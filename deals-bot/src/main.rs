mod commands;
mod config;
mod telegram;

use std::sync::Arc;

use anyhow::Context as _;
use reqwest::{redirect, ClientBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

use deals_core::{spawn_free_offer_watcher, Ledger, SourceContext, WatcherConfig};

use crate::config::Config;
use crate::telegram::TelegramApi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .user_agent("GameDealsBot/0.1")
        .build()
        .context("failed to build HTTP client")?;

    let ledger = Ledger::connect(&format!("sqlite://{}", config.db_path))
        .await
        .with_context(|| format!("failed to open durable store at {}", config.db_path))?;
    let ctx = SourceContext::new(client.clone());
    let api = Arc::new(TelegramApi::new(client, &config.bot_token));

    let watcher = spawn_free_offer_watcher(
        ctx.clone(),
        ledger.clone(),
        api.clone(),
        WatcherConfig {
            period: config.check_period,
            ..WatcherConfig::default()
        },
    );
    info!(db = %config.db_path, period_secs = config.check_period.as_secs(), "store initialised, starting long-poll loop");

    tokio::select! {
        result = commands::run_dispatch_loop(&api, &ctx, &ledger) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    watcher.stop().await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
