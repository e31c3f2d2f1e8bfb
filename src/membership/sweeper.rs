//! Periodic decay of confidence for processes that stopped sending heartbeats
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::table::{MembershipStore, Visit};
use super::types::{Decay, ProcessKey};
use crate::clock::{system_clock, Clock};
use crate::error::Result;
use crate::presentation::Presenter;
use crate::settings::{DetectorSettings, MAX_SWEEP_INTERVAL_SECS};

#[derive(Clone, Copy, Debug)]
pub struct SweepPolicy {
    pub staleness_threshold_secs: u64,
    pub failure_point: f64,
    pub confidence_step: f64,
}

impl From<&DetectorSettings> for SweepPolicy {
    fn from(settings: &DetectorSettings) -> Self {
        Self {
            staleness_threshold_secs: settings.staleness_threshold_secs,
            failure_point: settings.failure_point,
            confidence_step: settings.confidence_step,
        }
    }
}

/// Outcome of a single sweep
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SweepReport {
    pub visited: usize,
    pub decayed: usize,
    pub evicted: Vec<ProcessKey>,
}

impl SweepReport {
    pub fn changed(&self) -> bool {
        self.decayed > 0 || !self.evicted.is_empty()
    }
}

pub struct DecaySweeper<S> {
    store: Arc<S>,
    policy: SweepPolicy,
    interval: Duration,
    presenter: Arc<dyn Presenter>,
    clock: Clock,
}

impl<S: MembershipStore + 'static> DecaySweeper<S> {
    pub fn new(
        store: Arc<S>,
        policy: SweepPolicy,
        interval: Duration,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            store,
            policy,
            interval,
            presenter,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one sweep as of `now` (unix seconds).
    ///
    /// Each stale record loses one step; a record whose confidence would
    /// reach the failure point is removed instead. Fails on the first record
    /// that breaks the table invariants, which the caller must treat as fatal.
    pub fn sweep_at(&self, now: i64) -> Result<SweepReport> {
        let policy = self.policy;
        let mut visited = 0;
        let mut stale: Vec<(ProcessKey, i64, Decay)> = Vec::new();

        let evicted = self.store.for_each_snapshot(|key, record| {
            visited += 1;
            record.check_invariants(key, policy.failure_point)?;
            if !record.is_stale(now, policy.staleness_threshold_secs) {
                return Ok(Visit::Keep);
            }
            let age = record.age(now);
            let decay = record.decay(policy.confidence_step, policy.failure_point);
            stale.push((key.clone(), age, decay));
            Ok(match decay {
                Decay::Retained(_) => Visit::Keep,
                Decay::Evicted(_) => Visit::Evict,
            })
        })?;

        let mut decayed = 0;
        for (key, age, decay) in &stale {
            info!(
                "Haven't received a heartbeat from process {} for the past {} seconds",
                key, age
            );
            match decay {
                Decay::Retained(confidence) => {
                    decayed += 1;
                    debug!("Process {} confidence decremented to {:.2}", key, confidence);
                }
                Decay::Evicted(confidence) => warn!(
                    "Process {} now has confidence {:.2} which is at or below the failure point {:.2} and is marked as dead",
                    key, confidence, policy.failure_point
                ),
            }
        }

        let report = SweepReport {
            visited,
            decayed,
            evicted: evicted.into_iter().map(|(key, _)| key).collect(),
        };
        if self.presenter.enabled() {
            self.presenter.refresh(self.store.snapshot());
        }
        Ok(report)
    }

    /// Sweep period actually used, capped at [`MAX_SWEEP_INTERVAL_SECS`]
    pub fn period(&self) -> Duration {
        self.interval.min(Duration::from_secs(MAX_SWEEP_INTERVAL_SECS))
    }

    /// Start sweeping every [`period`](Self::period) on a background task.
    ///
    /// The first sweep runs one period after the call. Sweeps never overlap:
    /// a tick that comes due while a sweep is still running is skipped.
    pub fn spawn(self: &Arc<Self>) -> SweeperHandle {
        let sweeper = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let period = sweeper.period();
            let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Decay sweeper started with {}ms interval", period.as_millis());

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Decay sweeper stopped");
                        return Ok(());
                    }
                    _ = ticker.tick() => {
                        debug!("Checking for inactive processes...");
                        let now = (sweeper.clock)();
                        match sweeper.sweep_at(now) {
                            Ok(report) if report.changed() => info!(
                                "Sweep decayed {} and evicted {} of {} processes",
                                report.decayed,
                                report.evicted.len(),
                                report.visited
                            ),
                            Ok(_) => {}
                            Err(err) => {
                                error!("Membership table is corrupt, stopping sweeper: {}", err);
                                return Err(err);
                            }
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Control handle for a running sweeper task
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl SweeperHandle {
    /// Resolves when the sweeper ends on its own, which only happens on a fatal error
    pub async fn wait(&mut self) -> Result<()> {
        (&mut self.task).await?
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // Err means the task already exited; its result is collected below.
            let _ = shutdown.send(());
        }
        self.task.await?
    }
}
