//! Due-check scheduler.
//!
//! A single wall-clock tick drives every check. On each tick the check store
//! is rescanned; a check is due when its frequency has elapsed since the
//! start of the tick that last ran it (or it has never run). Due checks run
//! concurrently as independent tasks. A check still executing from an earlier
//! tick is skipped rather than dispatched twice.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::alert::AlertTrigger;
use super::cache::{BatchWriter, FlushOutcome};
use super::dispatcher::RegionDispatcher;
use super::types::{Check, TickBatch};
use super::validation::validate_check;
use crate::database::CheckStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SlotState {
    #[default]
    Idle,
    Executing,
}

/// Engine-owned bookkeeping for one check, rebuilt empty on restart
#[derive(Debug, Clone, Copy, Default)]
struct CheckSlot {
    state: SlotState,
    last_executed_at: Option<DateTime<Utc>>,
}

type Slots = Arc<Mutex<HashMap<Uuid, CheckSlot>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<Uuid, CheckSlot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Claim {
    NotDue,
    /// Due, but an earlier tick is still running it
    Busy,
    Claimed(SlotGuard),
}

/// Exclusion token for one check. Dropping it returns the slot to idle and
/// stamps the tick start as the last execution time, even if the run panicked.
struct SlotGuard {
    slots: Slots,
    check_id: Uuid,
    tick_started_at: DateTime<Utc>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(self.check_id).or_default();
        slot.state = SlotState::Idle;
        slot.last_executed_at = Some(self.tick_started_at);
    }
}

/// What one tick did
#[derive(Debug, Default)]
pub struct TickSummary {
    pub scanned: usize,
    pub due: usize,
    /// Due but still executing from an earlier tick
    pub skipped: usize,
    pub invalid: usize,
    /// Checks gone from the scan whose bookkeeping was dropped
    pub pruned: usize,
    pub handles: Vec<JoinHandle<()>>,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub tick: Duration,
    pub deny_private_targets: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self { tick: Duration::from_secs(30), deny_private_targets: false }
    }
}

/// Monitoring scheduler - decides which checks are due and runs them
#[derive(Clone)]
pub struct MonitoringScheduler {
    checks: Arc<dyn CheckStore>,
    dispatcher: Arc<RegionDispatcher>,
    writer: Arc<BatchWriter>,
    alerts: AlertTrigger,
    slots: Slots,
    options: SchedulerOptions,
}

impl MonitoringScheduler {
    pub fn new(
        checks: Arc<dyn CheckStore>,
        dispatcher: Arc<RegionDispatcher>,
        writer: Arc<BatchWriter>,
        alerts: AlertTrigger,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            checks,
            dispatcher,
            writer,
            alerts,
            slots: Arc::new(Mutex::new(HashMap::new())),
            options,
        }
    }

    pub fn writer(&self) -> &Arc<BatchWriter> {
        &self.writer
    }

    /// Tick until `shutdown` fires, then wait for in-flight check runs
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.options.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

        info!(tick = ?self.options.tick, "Scheduler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    in_flight.retain(|handle| !handle.is_finished());
                    match self.tick(Utc::now()).await {
                        Ok(summary) => {
                            debug!(
                                scanned = summary.scanned,
                                due = summary.due,
                                skipped = summary.skipped,
                                invalid = summary.invalid,
                                "Tick dispatched"
                            );
                            in_flight.extend(summary.handles);
                        }
                        Err(e) => error!("Failed to load checks for tick: {e:#}"),
                    }
                }
            }
        }

        info!(in_flight = in_flight.len(), "Scheduler stopping, waiting for running checks");
        join_all(in_flight).await;
    }

    /// Run one tick at `now`: scan, claim due checks, spawn their runs.
    ///
    /// Returns once every due check is spawned; the handles in the summary
    /// complete when each run (dispatch, alert, buffer, flush) is done.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let checks = self.checks.enabled_checks().await?;
        let mut summary = TickSummary { scanned: checks.len(), ..TickSummary::default() };
        let live: HashSet<Uuid> = checks.iter().map(|check| check.id).collect();

        for check in checks {
            if let Err(e) = validate_check(&check, self.options.deny_private_targets) {
                warn!(check_id = %check.id, "Skipping invalid check: {e:#}");
                summary.invalid += 1;
                continue;
            }

            match self.claim(&check, now) {
                Claim::NotDue => {}
                Claim::Busy => {
                    debug!(check_id = %check.id, "Check still running from an earlier tick");
                    summary.skipped += 1;
                }
                Claim::Claimed(guard) => {
                    summary.due += 1;
                    let this = self.clone();
                    summary.handles.push(tokio::spawn(async move {
                        this.run_check(check, now, guard).await;
                    }));
                }
            }
        }

        summary.pruned = self.prune(&live).await;
        Ok(summary)
    }

    /// Forget deleted or paused checks: drop their idle slots and flush
    /// whatever they still had buffered.
    async fn prune(&self, live: &HashSet<Uuid>) -> usize {
        let mut pruned: HashSet<Uuid> = HashSet::new();
        lock(&self.slots).retain(|check_id, slot| {
            let keep = live.contains(check_id) || slot.state == SlotState::Executing;
            if !keep {
                pruned.insert(*check_id);
            }
            keep
        });

        for (check_id, outcome) in self.writer.flush_stale(live).await {
            pruned.insert(check_id);
            if let FlushOutcome::Lost(rows) | FlushOutcome::Retained(rows) = outcome {
                warn!(%check_id, rows, "Buffered results of a removed check were not persisted");
            }
        }

        if !pruned.is_empty() {
            debug!(count = pruned.len(), "Pruned checks no longer scheduled");
        }
        pruned.len()
    }

    fn claim(&self, check: &Check, now: DateTime<Utc>) -> Claim {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(check.id).or_default();

        let due = slot.last_executed_at.is_none_or(|last| {
            (now - last).to_std().is_ok_and(|elapsed| elapsed >= check.frequency())
        });

        match (due, slot.state) {
            (false, _) => Claim::NotDue,
            (true, SlotState::Executing) => Claim::Busy,
            (true, SlotState::Idle) => {
                slot.state = SlotState::Executing;
                Claim::Claimed(SlotGuard {
                    slots: self.slots.clone(),
                    check_id: check.id,
                    tick_started_at: now,
                })
            }
        }
    }

    async fn run_check(&self, check: Check, tick_started_at: DateTime<Utc>, guard: SlotGuard) {
        let outcomes = self.dispatcher.dispatch_all(&check).await;
        let batch = TickBatch::new(tick_started_at, outcomes);

        let up = batch.outcomes.iter().filter(|o| o.is_up()).count();
        info!(
            check_id = %check.id,
            check = %check.label(),
            up,
            down = batch.outcomes.len() - up,
            "Check executed"
        );

        self.writer.append(check.id, batch.clone());
        self.alerts.fire(&check, &batch).await;
        self.writer.maybe_flush(check.id).await;

        drop(guard);
    }
}
