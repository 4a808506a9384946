use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::warn;

const DEFAULT_DB_PATH: &str = "bot.db";
const DEFAULT_CHECK_PERIOD: Duration = Duration::from_secs(60 * 60 * 6);

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub db_path: String,
    pub check_period: Duration,
}

impl Config {
    /// Read the configuration surface from the environment. A missing bot
    /// credential is fatal; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let bot_token = match env::var("BOT_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token,
            _ => bail!("BOT_TOKEN is not set; export it and restart"),
        };

        let db_path = env::var("BOT_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
        let check_period = env::var("FREE_CHECK_INTERVAL")
            .ok()
            .map(|raw| parse_period(&raw))
            .unwrap_or(DEFAULT_CHECK_PERIOD);

        Ok(Self {
            bot_token,
            db_path,
            check_period,
        })
    }
}

fn parse_period(raw: &str) -> Duration {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(value = %raw, "invalid FREE_CHECK_INTERVAL, using default");
            DEFAULT_CHECK_PERIOD
        }
    }
}
