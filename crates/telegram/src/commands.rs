use std::sync::Arc;

use teloxide::{
    dispatching::UpdateHandler,
    payloads::SendMessageSetters,
    prelude::*,
    types::{ChatAction, ParseMode},
    utils::{command::BotCommands, html},
};
use tracing::{info, warn};

use analysis::{change, normalize, parse_query, ChangeReport, Query};
use common::{CandleProvider, LogEntry};
use journal::EventLog;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// How many entries `/log` shows.
const LOG_TAIL: usize = 10;

/// Dependencies injected into every handler via `dptree`.
///
/// The interactive path only reads: it shares the candle provider with the
/// scheduled cycles and never writes the event log.
#[derive(Clone)]
pub struct BotDeps {
    pub candles: Arc<dyn CandleProvider>,
    pub log: Arc<EventLog>,
    pub morning: String,
    pub evening: String,
}

/// Telegram bot commands exposed to users.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "StreakBot commands:")]
pub enum Command {
    #[command(description = "Show what the bot does")]
    Start,
    #[command(description = "Show this help")]
    Help,
    #[command(description = "Show the latest logged streak events")]
    Log,
}

/// Start the Telegram bot in long-polling mode.
pub async fn start_bot(bot: Bot, deps: BotDeps) {
    let deps = Arc::new(deps);

    info!("Telegram bot starting (long-polling)");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(handle_start))
        .branch(case![Command::Help].endpoint(handle_start))
        .branch(case![Command::Log].endpoint(handle_log));

    let query_handler = Message::filter_text()
        .filter(|text: String| !text.starts_with('/'))
        .endpoint(handle_query);

    Update::filter_message()
        .branch(command_handler)
        .branch(query_handler)
}

async fn handle_start(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    bot.send_message(msg.chat.id, help_text(&deps.morning, &deps.evening))
        .await?;
    Ok(())
}

async fn handle_log(bot: Bot, msg: Message, deps: Arc<BotDeps>) -> HandlerResult {
    let text = match deps.log.recent(LOG_TAIL).await {
        Ok(entries) => format_entries(&entries),
        Err(e) => {
            warn!(error = %e, "Failed to read event log");
            "Event log is unavailable right now.".to_string()
        }
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_query(bot: Bot, msg: Message, text: String, deps: Arc<BotDeps>) -> HandlerResult {
    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
    let reply = answer_query(deps.candles.as_ref(), &text).await;
    bot.send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Resolve a `<SYMBOL> [<days>]` request into the reply text.
pub async fn answer_query(candles: &dyn CandleProvider, text: &str) -> String {
    let Some(query) = parse_query(text) else {
        return "Send a ticker, e.g. <code>ETH</code> or <code>XBT 3</code>".to_string();
    };

    // N days of change need N + 1 closes.
    let window = query.days + 1;
    let raw = candles.fetch_candles(&query.symbol, window).await;
    let normalized = normalize(raw, window);

    // The reply is sent as HTML; the ticker is user text.
    let shown = Query {
        symbol: html::escape(&query.symbol),
        ..query
    };
    match ChangeReport::from_candles(&shown, &normalized) {
        Some(report) => {
            info!(symbol = %report.symbol, days = report.days, change_pct = report.change_pct, "Change query answered");
            report.to_html()
        }
        None => change::no_data_message(&shown.symbol),
    }
}

pub fn help_text(morning: &str, evening: &str) -> String {
    format!(
        "KuCoin Futures streak watcher\n\n\
         • {morning}: log growth runs of 5+ days\n\
         • {evening}: alerts for 5+ and 8+ day runs\n\
         • Drop alert after a run of 6+ days\n\
         • /log shows the latest logged events\n\n\
         Send a ticker for its recent change: ETH, XBT 3 (max 30 days)"
    )
}

pub fn format_entries(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "No streak events logged in the last 30 days.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let price = e
                .current_price
                .map(change::format_price)
                .unwrap_or_else(|| "n/a".to_string());
            format!(
                "{} {} {} {}d {price}",
                e.time.format("%m-%d %H:%M"),
                e.symbol,
                e.event,
                e.growth_days
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use common::{Candle, LogEvent};

    use super::*;

    struct Closes(Vec<f64>);

    #[async_trait]
    impl CandleProvider for Closes {
        async fn fetch_candles(&self, _symbol: &str, days: usize) -> Vec<Candle> {
            // Unordered on purpose, and longer than asked for.
            let mut out: Vec<Candle> = self
                .0
                .iter()
                .enumerate()
                .map(|(i, &p)| Candle::close_at(i as i64, p))
                .collect();
            out.reverse();
            assert!(days >= 2);
            out
        }
    }

    #[tokio::test]
    async fn query_reports_change_over_window() {
        // Asking for 2 days uses the last 3 closes: 100 -> 110.
        let provider = Closes(vec![50.0, 100.0, 105.0, 110.0]);
        let reply = answer_query(&provider, "eth 2").await;
        assert!(reply.starts_with("<b>ETH/USDT</b>"), "{reply}");
        assert!(reply.contains("<code>$110.00</code>"));
        assert!(reply.contains("Change over 2 days: <b>+10.00%</b>"), "{reply}");
    }

    #[tokio::test]
    async fn query_without_candles_is_no_data() {
        let provider = Closes(vec![]);
        assert_eq!(answer_query(&provider, "ghost").await, "No data: GHOST");
    }

    #[tokio::test]
    async fn markup_in_ticker_is_escaped() {
        let empty = Closes(vec![]);
        assert_eq!(answer_query(&empty, "a<b").await, "No data: A&lt;B");

        let provider = Closes(vec![100.0, 110.0]);
        let reply = answer_query(&provider, "a&b 1").await;
        assert!(reply.starts_with("<b>A&amp;B/USDT</b>"), "{reply}");
    }

    #[tokio::test]
    async fn blank_query_gets_usage_hint() {
        let provider = Closes(vec![1.0]);
        assert!(answer_query(&provider, "   ").await.contains("Send a ticker"));
    }

    #[test]
    fn entries_are_listed_one_per_line() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        let text = format_entries(&[
            LogEntry::new(t, "BTC", 6, Some(107.0), LogEvent::Break),
            LogEntry::new(t, "PEPE", 5, None, LogEvent::Growth),
        ]);
        assert_eq!(text, "03-09 21:00 BTC break 6d $107.00\n03-09 21:00 PEPE growth 5d n/a");
    }

    #[test]
    fn empty_log_has_friendly_text() {
        assert!(format_entries(&[]).starts_with("No streak events"));
    }

    #[test]
    fn help_mentions_schedule() {
        let text = help_text("09:00", "21:00");
        assert!(text.contains("09:00") && text.contains("21:00"));
    }
}
