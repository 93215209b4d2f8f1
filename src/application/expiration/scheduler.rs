//! Recurring driver for the expiration sweep.
//!
//! A single long-lived tokio task ticks on a fixed interval and runs one
//! sweep per tick. All scheduler state lives in one shared struct; start and
//! stop are channel-based transitions and the overlap guard is an atomic flag
//! shared between timer ticks and manual triggers.
//!
//! ## Overlap Guard
//!
//! At most one sweep executes at a time. A tick that lands while the previous
//! sweep is still running is skipped entirely (logged as a skip, not an
//! error) rather than queued: overlapping sweeps over the same table would
//! risk double-processing an order under weak isolation. The flag bounds
//! in-process concurrency only; the store transaction remains the correctness
//! boundary against the webhook path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time;

use crate::config::LifecycleConfig;
use crate::domain::foundation::Timestamp;

use super::service::{ExpirationService, SweepOutcome};

/// Delay before the optional run-on-start sweep, giving the rest of the
/// process time to finish booting.
const RUN_ON_START_DELAY: Duration = Duration::from_secs(5);

/// Errors from manual scheduler operations.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// A sweep is currently executing; the manual trigger was rejected, not
    /// queued.
    #[error("An expiration sweep is already running")]
    AlreadyRunning,

    /// The sweep itself failed before producing an outcome.
    #[error("Expiration sweep failed: {0}")]
    Sweep(String),
}

/// Snapshot of scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    /// Whether the recurring task is active.
    pub active: bool,
    /// Whether a sweep is executing right now.
    pub running: bool,
    pub interval_minutes: u64,
}

/// Periodic expiration sweep driver with overlap protection.
///
/// Cheap to clone; every clone drives the same underlying state.
pub struct ExpirationScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    service: Arc<ExpirationService>,
    interval: Duration,
    interval_minutes: u64,
    run_on_start: bool,
    /// True while the recurring task is alive.
    active: AtomicBool,
    /// Overlap guard, shared by timer ticks and `run_now`.
    sweep_in_progress: AtomicBool,
    /// Shutdown signal for the running task; present only while active.
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl ExpirationScheduler {
    pub fn new(service: Arc<ExpirationService>, config: &LifecycleConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                interval: config.sweep_interval(),
                interval_minutes: config.sweep_interval_minutes,
                run_on_start: config.run_on_start,
                active: AtomicBool::new(false),
                sweep_in_progress: AtomicBool::new(false),
                shutdown: Mutex::new(None),
            }),
        }
    }

    /// Starts the recurring task.
    ///
    /// Idempotent: starting an active scheduler logs and returns.
    pub fn start(&self) {
        if self.inner.active.swap(true, Ordering::SeqCst) {
            tracing::warn!("Expiration scheduler already started");
            return;
        }

        let (tx, rx) = watch::channel(false);
        *self.inner.shutdown.lock().expect("shutdown lock poisoned") = Some(tx);

        tracing::info!(
            interval_minutes = self.inner.interval_minutes,
            run_on_start = self.inner.run_on_start,
            "Starting expiration scheduler"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run(rx).await;
        });
    }

    /// Stops the recurring task. An in-flight sweep runs to completion.
    pub fn stop(&self) {
        let sender = self
            .inner
            .shutdown
            .lock()
            .expect("shutdown lock poisoned")
            .take();
        match sender {
            Some(tx) => {
                let _ = tx.send(true);
                self.inner.active.store(false, Ordering::SeqCst);
                tracing::info!("Expiration scheduler stopped");
            }
            None => {
                tracing::warn!("Expiration scheduler is not running");
            }
        }
    }

    /// Runs one sweep synchronously, sharing the overlap guard with the
    /// timer-driven path.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::AlreadyRunning`] if a sweep is in flight.
    pub async fn run_now(&self) -> Result<SweepOutcome, SchedulerError> {
        if !self.inner.try_begin_sweep() {
            return Err(SchedulerError::AlreadyRunning);
        }

        tracing::info!("Manual expiration sweep triggered");
        let result = self.inner.service.check_and_expire(Timestamp::now()).await;
        self.inner.end_sweep();

        result.map_err(|e| SchedulerError::Sweep(e.to_string()))
    }

    /// Pure read of scheduler state.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            active: self.inner.active.load(Ordering::SeqCst),
            running: self.inner.sweep_in_progress.load(Ordering::SeqCst),
            interval_minutes: self.inner.interval_minutes,
        }
    }
}

impl Clone for ExpirationScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Inner {
    /// The task body: tick until the shutdown signal flips.
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if self.run_on_start {
            time::sleep(RUN_ON_START_DELAY).await;
            tracing::info!("Running initial expiration sweep");
            self.tick().await;
        }

        let mut interval = time::interval(self.interval);
        // The first tick of a tokio interval fires immediately; consume it so
        // the first sweep happens one full interval after start.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Expiration scheduler task exiting");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One timer-driven tick: skip if a sweep is still running, otherwise
    /// execute a sweep and log its outcome.
    async fn tick(&self) {
        if !self.try_begin_sweep() {
            tracing::warn!("Previous expiration sweep still running, skipping this tick");
            return;
        }

        let started = std::time::Instant::now();
        match self.service.check_and_expire(Timestamp::now()).await {
            Ok(outcome) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    total = outcome.total,
                    expired = outcome.expired.len(),
                    failures = outcome.failures.len(),
                    "Scheduled expiration sweep completed"
                );
            }
            Err(error) => {
                tracing::error!(%error, "Scheduled expiration sweep failed");
            }
        }

        self.end_sweep();
    }

    fn try_begin_sweep(&self) -> bool {
        self.sweep_in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn end_sweep(&self) {
        self.sweep_in_progress.store(false, Ordering::SeqCst);
    }
}
