use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime};
use tracing::{error, info, info_span, warn, Instrument};

use analysis::{normalize, AlertClassifier, StreakAnalyzer};
use common::{
    base_symbol, CandleProvider, CycleKind, CycleReport, LogEntry, LogEvent,
    Notifier, StreakResult, SymbolSource, WatchConfig,
};
use journal::EventLog;

/// Runs the per-symbol pipeline over the whole watch list.
///
/// Symbols are processed one at a time in source order. Nothing that goes
/// wrong for one symbol (no candles, a failed delivery, a log fault) stops
/// the traversal, and every cycle ends with a prune of the event log.
pub struct Orchestrator {
    symbols: Arc<dyn SymbolSource>,
    candles: Arc<dyn CandleProvider>,
    notifier: Arc<dyn Notifier>,
    log: Arc<EventLog>,
    targets: Vec<i64>,
    analyzer: StreakAnalyzer,
    classifier: AlertClassifier,
    window_days: usize,
    retention: Duration,
}

impl Orchestrator {
    pub fn new(
        symbols: Arc<dyn SymbolSource>,
        candles: Arc<dyn CandleProvider>,
        notifier: Arc<dyn Notifier>,
        log: Arc<EventLog>,
        targets: Vec<i64>,
        watch: &WatchConfig,
    ) -> Self {
        Self {
            symbols,
            candles,
            notifier,
            log,
            targets,
            analyzer: StreakAnalyzer::new(watch.thresholds.break_after),
            classifier: AlertClassifier::new(watch.thresholds),
            window_days: watch.window_days,
            retention: watch.retention(),
        }
    }

    /// Run one full cycle. Always completes; failures are counted, not raised.
    pub async fn run_cycle(&self, kind: CycleKind) -> CycleReport {
        let span = info_span!("cycle", kind = %kind, id = %uuid::Uuid::new_v4());
        self.run_cycle_inner(kind).instrument(span).await
    }

    async fn run_cycle_inner(&self, kind: CycleKind) -> CycleReport {
        let mut report = CycleReport::default();
        let symbols = self.symbols.list_symbols().await;

        if symbols.is_empty() {
            warn!("No symbols to process this cycle");
        } else {
            info!(count = symbols.len(), "Cycle started");
        }

        for symbol in &symbols {
            report.symbols += 1;
            let result = self.analyze_symbol(symbol).await;
            if result.current.is_none() {
                report.no_signal += 1;
            }
            match kind {
                CycleKind::Passive => self.passive_step(symbol, &result, &mut report).await,
                CycleKind::Active => self.active_step(symbol, &result, &mut report).await,
            }
        }

        match self.log.prune(now(), self.retention).await {
            Ok(removed) => report.pruned = removed,
            Err(e) => {
                error!(error = %e, "Event log prune failed");
                report.persistence_faults += 1;
            }
        }

        info!(
            symbols = report.symbols,
            no_signal = report.no_signal,
            logged = report.logged,
            alerts = report.alerts,
            delivery_failures = report.delivery_failures,
            persistence_faults = report.persistence_faults,
            pruned = report.pruned,
            "Cycle finished"
        );
        report
    }

    /// Fetch, normalize and analyze one symbol. Missing data is a no-signal result.
    pub async fn analyze_symbol(&self, symbol: &str) -> StreakResult {
        let raw = self.candles.fetch_candles(symbol, self.window_days).await;
        let candles = normalize(raw, self.window_days);
        if candles.len() < 2 {
            info!(symbol = %symbol, candles = candles.len(), "Not enough candles, no signal");
            return StreakResult::no_signal();
        }
        self.analyzer.analyze_candles(&candles)
    }

    async fn passive_step(&self, symbol: &str, result: &StreakResult, report: &mut CycleReport) {
        if result.is_break || result.growth_days < self.classifier.thresholds.growth {
            return;
        }
        let base = base_symbol(symbol);
        self.record(&base, result, LogEvent::Growth, report).await;
    }

    async fn active_step(&self, symbol: &str, result: &StreakResult, report: &mut CycleReport) {
        let category = self.classifier.classify(result);
        let base = base_symbol(symbol);
        let (Some(text), Some(event)) = (
            AlertClassifier::render(category, &base, result),
            category.event(),
        ) else {
            return;
        };

        info!(symbol = %base, category = %category, growth_days = result.growth_days, "Alert");
        report.alerts += 1;
        for &target in &self.targets {
            if let Err(e) = self.notifier.send(target, &text).await {
                warn!(symbol = %base, chat_id = target, error = %e, "Alert delivery failed");
                report.delivery_failures += 1;
            }
        }

        self.record(&base, result, event, report).await;
    }

    async fn record(&self, base: &str, result: &StreakResult, event: LogEvent, report: &mut CycleReport) {
        let entry = LogEntry::new(now(), base, result.growth_days, result.current, event);
        match self.log.append(&entry).await {
            Ok(true) => report.logged += 1,
            Ok(false) => {}
            Err(e) => {
                error!(symbol = %base, error = %e, "Failed to write event log entry");
                report.persistence_faults += 1;
            }
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
