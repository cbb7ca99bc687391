use std::sync::Arc;

use chrono::{Duration, Local, NaiveDateTime, NaiveTime};
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{CycleKind, CycleStatus, SchedulerCommand};

use crate::cycle::Orchestrator;

/// Cloneable handle passed to other tasks (Telegram, API, shutdown hook).
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    status: Arc<RwLock<Option<CycleStatus>>>,
}

impl SchedulerHandle {
    /// Queue an immediate cycle. It runs after any cycle already in progress.
    pub async fn run_now(&self, kind: CycleKind) {
        let _ = self.command_tx.send(SchedulerCommand::RunNow(kind)).await;
    }

    /// Stop the scheduler once the current cycle, if any, has finished.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown).await;
    }

    pub async fn last_cycle(&self) -> Option<CycleStatus> {
        self.status.read().await.clone()
    }

    /// Shared slot holding the most recent completed cycle.
    pub fn status(&self) -> Arc<RwLock<Option<CycleStatus>>> {
        self.status.clone()
    }
}

/// A daily wall-clock trigger bound to a cycle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub at: NaiveTime,
    pub kind: CycleKind,
}

/// Drives cycles from two daily triggers and on-demand commands.
///
/// Cycles never overlap: the task runs one cycle to completion before it
/// looks at the clock or the command channel again.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    triggers: [Trigger; 2],
    status: Arc<RwLock<Option<CycleStatus>>>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        morning: NaiveTime,
        evening: NaiveTime,
    ) -> (Self, SchedulerHandle) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let status = Arc::new(RwLock::new(None));

        let handle = SchedulerHandle {
            command_tx,
            status: status.clone(),
        };

        let scheduler = Scheduler {
            orchestrator,
            triggers: [
                Trigger { at: morning, kind: CycleKind::Passive },
                Trigger { at: evening, kind: CycleKind::Active },
            ],
            status,
            command_rx,
        };

        (scheduler, handle)
    }

    /// Run the scheduler loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!(
            passive = %self.triggers[0].at,
            active = %self.triggers[1].at,
            "Scheduler started"
        );

        let mut last_fired = None;
        loop {
            let wall = Local::now().naive_local();
            let anchor = schedule_anchor(wall, last_fired);
            let (trigger, fire_at) = next_trigger(anchor, &self.triggers);
            let wait = (fire_at - wall).to_std().unwrap_or_default();
            info!(kind = %trigger.kind, at = %fire_at, "Next cycle scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    last_fired = Some(fire_at);
                    self.run_cycle(trigger.kind).await;
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::RunNow(kind)) => {
                        info!(kind = %kind, "Manual cycle requested");
                        self.run_cycle(kind).await;
                    }
                    Some(SchedulerCommand::Shutdown) => {
                        info!("Scheduler shutting down");
                        break;
                    }
                    None => {
                        warn!("Scheduler command channel closed, shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn run_cycle(&self, kind: CycleKind) {
        let report = self.orchestrator.run_cycle(kind).await;
        *self.status.write().await = Some(CycleStatus {
            kind,
            finished_at: Local::now().naive_local(),
            report,
        });
    }
}

/// Next time `at` occurs strictly after `now`: today if still ahead, else tomorrow.
pub fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Instant the next trigger is searched from: the wall clock, clamped to
/// no earlier than the trigger that last fired. A timer may wake before
/// the wall clock reaches `fire_at`; each trigger fires once per day.
pub fn schedule_anchor(wall: NaiveDateTime, last_fired: Option<NaiveDateTime>) -> NaiveDateTime {
    match last_fired {
        Some(fired) if fired > wall => fired,
        _ => wall,
    }
}

/// The trigger that fires soonest after `now`. Ties go to the first trigger.
pub fn next_trigger(now: NaiveDateTime, triggers: &[Trigger; 2]) -> (Trigger, NaiveDateTime) {
    let first = (triggers[0], next_occurrence(now, triggers[0].at));
    let second = (triggers[1], next_occurrence(now, triggers[1].at));
    if second.1 < first.1 {
        second
    } else {
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::WatchConfig;
    use journal::EventLog;

    use crate::testing::{FixedCandles, FixedSymbols, RecordingNotifier};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn triggers() -> [Trigger; 2] {
        [
            Trigger { at: hm(9, 0), kind: CycleKind::Passive },
            Trigger { at: hm(21, 0), kind: CycleKind::Active },
        ]
    }

    #[test]
    fn occurrence_later_today() {
        assert_eq!(next_occurrence(at(10, 8, 59), hm(9, 0)), at(10, 9, 0));
    }

    #[test]
    fn occurrence_rolls_to_tomorrow_once_passed() {
        assert_eq!(next_occurrence(at(10, 9, 0), hm(9, 0)), at(11, 9, 0));
        assert_eq!(next_occurrence(at(10, 23, 30), hm(9, 0)), at(11, 9, 0));
    }

    #[test]
    fn picks_morning_before_nine() {
        let (t, when) = next_trigger(at(10, 3, 0), &triggers());
        assert_eq!(t.kind, CycleKind::Passive);
        assert_eq!(when, at(10, 9, 0));
    }

    #[test]
    fn picks_evening_during_the_day() {
        let (t, when) = next_trigger(at(10, 12, 0), &triggers());
        assert_eq!(t.kind, CycleKind::Active);
        assert_eq!(when, at(10, 21, 0));
    }

    #[test]
    fn picks_next_morning_after_evening() {
        let (t, when) = next_trigger(at(10, 21, 0), &triggers());
        assert_eq!(t.kind, CycleKind::Passive);
        assert_eq!(when, at(11, 9, 0));
    }

    #[test]
    fn early_wake_does_not_refire_same_trigger() {
        let fired = at(10, 21, 0);
        let wall = fired - Duration::milliseconds(40);

        // Searching from the lagging wall clock alone finds 21:00 again.
        assert_eq!(next_trigger(wall, &triggers()).1, fired);

        let (t, when) = next_trigger(schedule_anchor(wall, Some(fired)), &triggers());
        assert_eq!(t.kind, CycleKind::Passive);
        assert_eq!(when, at(11, 9, 0));
    }

    #[test]
    fn anchor_follows_wall_clock_once_past_last_fire() {
        assert_eq!(schedule_anchor(at(10, 9, 5), Some(at(10, 9, 0))), at(10, 9, 5));
        assert_eq!(schedule_anchor(at(10, 3, 0), None), at(10, 3, 0));
    }

    #[tokio::test]
    async fn run_now_executes_cycle_and_records_status() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(EventLog::new(dir.path().join("prices.log")));
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(FixedSymbols::new(&["SOL"])),
            Arc::new(FixedCandles::new(&[("SOL", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])])),
            notifier.clone(),
            log.clone(),
            vec![42],
            &WatchConfig::default(),
        ));

        let (scheduler, handle) = Scheduler::new(orchestrator, hm(9, 0), hm(21, 0));
        assert!(handle.last_cycle().await.is_none());
        let task = tokio::spawn(scheduler.run());

        handle.run_now(CycleKind::Active).await;
        handle.shutdown().await;
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        let status = handle.last_cycle().await.expect("no cycle recorded");
        assert_eq!(status.kind, CycleKind::Active);
        assert_eq!(status.report.alerts, 1);
        assert_eq!(status.report.logged, 1);

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert_eq!(log.entries().await.unwrap()[0].growth_days, 5);
    }

    #[tokio::test]
    async fn stops_when_every_handle_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(FixedSymbols::new(&[])),
            Arc::new(FixedCandles::new(&[])),
            Arc::new(RecordingNotifier::default()),
            Arc::new(EventLog::new(dir.path().join("prices.log"))),
            vec![],
            &WatchConfig::default(),
        ));
        let (scheduler, handle) = Scheduler::new(orchestrator, hm(9, 0), hm(21, 0));
        let task = tokio::spawn(scheduler.run());
        drop(handle);
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
