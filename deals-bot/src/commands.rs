use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};
use tracing::warn;

use deals_core::{
    compare, fetch_epic_offers, fetch_gog_offers, fetch_steam_offers, Comparison, Ledger, Offer,
    SourceContext,
};

use crate::telegram::{CallbackQuery, InlineQuery, Message, TelegramApi, Update};

const INLINE_SEARCH_LIMIT: usize = 5;
const TOP_OFFERS_SHOWN: usize = 5;

const USAGE: &str = "GameDeals bot tracks offers on Epic, GOG and Steam.\n\n\
/compare <title> - compare prices across stores\n\
/subscribe - get notified about new free games\n\
/unsubscribe - stop notifications\n\n\
You can also mention the bot inline in any chat with a game title.";

/// Long-poll loop. Handler failures are logged per update and never kill the
/// loop; a failed poll backs off briefly and retries.
pub async fn run_dispatch_loop(
    api: &TelegramApi,
    ctx: &SourceContext,
    ledger: &Ledger,
) -> Result<()> {
    let mut offset = 0i64;
    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(error = %err, "getUpdates failed, retrying");
                tokio::time::sleep(Duration::from_secs(3)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Err(err) = handle_update(api, ctx, ledger, update).await {
                warn!(error = %err, "update handler failed");
            }
        }
    }
}

async fn handle_update(
    api: &TelegramApi,
    ctx: &SourceContext,
    ledger: &Ledger,
    update: Update,
) -> Result<()> {
    if let Some(message) = update.message {
        handle_message(api, ctx, ledger, message).await?;
    } else if let Some(query) = update.inline_query {
        handle_inline_query(api, ctx, query).await?;
    } else if let Some(callback) = update.callback_query {
        handle_callback_query(api, ctx, callback).await?;
    }
    Ok(())
}

/// Split a `/command[@botname] args` line into the bare command token and
/// its argument. Returns `None` for plain text.
fn parse_command(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }
    let (token, rest) = text
        .split_once(char::is_whitespace)
        .unwrap_or((text, ""));
    let command = token.split_once('@').map(|(cmd, _)| cmd).unwrap_or(token);
    Some((command, rest.trim()))
}

async fn handle_message(
    api: &TelegramApi,
    ctx: &SourceContext,
    ledger: &Ledger,
    message: Message,
) -> Result<()> {
    let Some(text) = message.text else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let Some((command, arg)) = parse_command(&text) else {
        return Ok(());
    };

    match command {
        "/compare" => {
            if arg.is_empty() {
                api.send_text(chat_id, "Usage: /compare <game title>").await?;
                return Ok(());
            }
            let result = compare(ctx, arg).await;
            api.send_text(chat_id, &render_comparison(arg, &result))
                .await?;
        }
        "/subscribe" => {
            ledger.add_subscriber(chat_id).await?;
            api.send_text(chat_id, "Subscribed to new free-game notices.")
                .await?;
        }
        "/unsubscribe" => {
            ledger.remove_subscriber(chat_id).await?;
            api.send_text(chat_id, "Unsubscribed from free-game notices.")
                .await?;
        }
        "/start" => {
            api.send_text_with_keyboard(chat_id, USAGE, start_keyboard())
                .await?;
        }
        _ => {}
    }

    Ok(())
}

async fn handle_inline_query(
    api: &TelegramApi,
    ctx: &SourceContext,
    query: InlineQuery,
) -> Result<()> {
    let term = query.query.trim();
    if term.is_empty() {
        let hint = json!([{
            "type": "article",
            "id": "hint",
            "title": "Type a game title",
            "input_message_content": { "message_text": "Type a game title after the bot name." }
        }]);
        return api.answer_inline_query(&query.id, hint).await;
    }

    let offers = fetch_steam_offers(ctx, term, INLINE_SEARCH_LIMIT).await;
    let mut results: Vec<Value> = offers
        .iter()
        .enumerate()
        .map(|(i, offer)| {
            json!({
                "type": "article",
                "id": format!("steam-{}-{i}", offer.external_id),
                "title": format!("{} — {}", offer.title, offer.current_price),
                "input_message_content": {
                    "message_text": format!("{}\n{}\n{}", offer.title, offer.current_price, offer.url)
                }
            })
        })
        .collect();
    if results.is_empty() {
        results.push(json!({
            "type": "article",
            "id": "no-results",
            "title": "Nothing found",
            "input_message_content": { "message_text": format!("No results for \"{term}\".") }
        }));
    }

    api.answer_inline_query(&query.id, Value::Array(results))
        .await
}

/// Button callbacks from the /start keyboard: browse a store's current top
/// listing in place, or prompt for the compare command.
async fn handle_callback_query(
    api: &TelegramApi,
    ctx: &SourceContext,
    callback: CallbackQuery,
) -> Result<()> {
    api.answer_callback_query(&callback.id).await?;
    let Some(message) = callback.message else {
        return Ok(());
    };

    let text = match callback.data.as_deref() {
        Some("store_epic") => render_top_offers("Epic", &fetch_epic_offers(ctx).await),
        Some("store_gog") => render_top_offers("GOG", &fetch_gog_offers(ctx).await),
        Some("compare_prompt") => "Use /compare <game title>".to_string(),
        _ => return Ok(()),
    };

    api.edit_message_text(message.chat.id, message.message_id, &text)
        .await
}

fn start_keyboard() -> Value {
    json!([
        [{ "text": "Epic top offers", "callback_data": "store_epic" }],
        [{ "text": "GOG top offers", "callback_data": "store_gog" }],
        [{ "text": "Compare prices", "callback_data": "compare_prompt" }]
    ])
}

fn render_top_offers(store: &str, offers: &[Offer]) -> String {
    if offers.is_empty() {
        return format!("{store}: no results found");
    }
    let mut text = format!("Top offers on {store}\n\n");
    for (i, offer) in offers.iter().take(TOP_OFFERS_SHOWN).enumerate() {
        text.push_str(&format!(
            "{}. {} — {}\n{}\n\n",
            i + 1,
            offer.title,
            offer.current_price,
            offer.url
        ));
    }
    text.trim_end().to_string()
}

fn render_comparison(query: &str, result: &Comparison) -> String {
    let mut text = format!("Price comparison for {query}\n\n");
    text.push_str(&render_line("Steam", result.steam.as_ref()));
    text.push_str(&render_line("Epic", result.epic.as_ref()));
    text.push_str(&render_line("GOG", result.gog.as_ref()));
    text.trim_end().to_string()
}

fn render_line(store: &str, offer: Option<&Offer>) -> String {
    match offer {
        Some(offer) => format!(
            "{store}: {} — {}\n{}\n\n",
            offer.title, offer.current_price, offer.url
        ),
        None => format!("{store}: no results found\n\n"),
    }
}
