use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use common::{CandleProvider, Config, CycleKind};
use engine::{KucoinClient, Orchestrator, Scheduler, SheetSymbolSource};
use journal::EventLog;
use telegram_ctrl::{start_bot, BotDeps, TelegramNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let morning = cfg.watch.morning_time().context("invalid morning time")?;
    let evening = cfg.watch.evening_time().context("invalid evening time")?;
    info!(
        chats = cfg.telegram_chat_ids.len(),
        log_file = %cfg.log_file,
        %morning,
        %evening,
        "StreakBot starting"
    );

    // ── Event log ─────────────────────────────────────────────────────────────
    let log = Arc::new(EventLog::new(&cfg.log_file));
    log.ensure_exists()
        .await
        .with_context(|| format!("cannot open event log at {}", cfg.log_file))?;

    // ── Collaborators ─────────────────────────────────────────────────────────
    let timeout = cfg.watch.http_timeout();
    let candles: Arc<dyn CandleProvider> = Arc::new(KucoinClient::new(timeout));
    let symbols = Arc::new(SheetSymbolSource::new(cfg.symbols_sheet_url.clone(), timeout));
    let bot = teloxide::Bot::new(cfg.telegram_token.clone());
    let notifier = Arc::new(TelegramNotifier::new(bot.clone()));

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let orchestrator = Arc::new(Orchestrator::new(
        symbols,
        candles.clone(),
        notifier,
        log.clone(),
        cfg.telegram_chat_ids.clone(),
        &cfg.watch,
    ));
    let (scheduler, scheduler_handle) = Scheduler::new(orchestrator, morning, evening);

    // ── Liveness endpoint ─────────────────────────────────────────────────────
    let api_state = api::AppState {
        started_at: chrono::Utc::now(),
        last_cycle: scheduler_handle.status(),
    };

    // ── Telegram ──────────────────────────────────────────────────────────────
    let bot_deps = BotDeps {
        candles,
        log,
        morning: cfg.watch.morning.clone(),
        evening: cfg.watch.evening.clone(),
    };

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    let scheduler_task = tokio::spawn(scheduler.run());
    let port = cfg.health_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_state, port).await {
            error!(error = %e, "Liveness endpoint stopped");
        }
    });

    if std::env::var("RUN_ON_START").is_ok_and(|v| v == "1") {
        scheduler_handle.run_now(CycleKind::Passive).await;
    }

    info!("All subsystems started. Polling Telegram until Ctrl-C.");
    // The dispatcher owns the Ctrl-C handler and returns once it fires.
    start_bot(bot, bot_deps).await;

    info!("Shutdown signal received. Waiting for the scheduler to stop.");
    scheduler_handle.shutdown().await;
    scheduler_task.await.context("scheduler task panicked")?;
    Ok(())
}
