//! Fixed-interval scheduler driving the cycle orchestrator.
//!
//! Cycles never overlap. After each cycle the scheduler sleeps for whatever is
//! left of the interval; a cycle that overruns is followed immediately by the
//! next one. Stopping is cooperative: an in-flight cycle always finishes, and
//! only the wait between cycles is cut short.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use smsa_core::{ConfigError, SourcesConfig};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::orchestrator::CycleOrchestrator;
use crate::stats::CycleStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Stopping,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchedulerState::Stopped => "stopped",
            SchedulerState::Running => "running",
            SchedulerState::Stopping => "stopping",
        })
    }
}

struct Shared {
    state: watch::Sender<SchedulerState>,
    stop: watch::Sender<bool>,
    keywords: watch::Sender<Vec<String>>,
}

/// Cloneable control surface for a running [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop after the current cycle.
    ///
    /// Has no effect unless the scheduler is running; returns whether this
    /// call requested the stop.
    pub fn stop(&self) -> bool {
        let requested = self.shared.state.send_if_modified(|state| {
            if *state == SchedulerState::Running {
                *state = SchedulerState::Stopping;
                true
            } else {
                false
            }
        });
        if requested {
            self.shared.stop.send_replace(true);
            tracing::info!("scheduler stop requested");
        }
        requested
    }

    /// Replace the keyword set used from the next cycle on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSources`] if no non-blank keyword remains after
    /// normalization. The current keyword set is left unchanged.
    pub fn update_keywords(&self, keywords: &[String]) -> Result<(), ConfigError> {
        let normalized = SourcesConfig::normalize_keywords(keywords)?;
        tracing::info!(keywords = ?normalized, "keyword set updated");
        self.shared.keywords.send_replace(normalized);
        Ok(())
    }

    #[must_use]
    pub fn keywords(&self) -> Vec<String> {
        self.shared.keywords.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }
}

pub struct Scheduler {
    orchestrator: CycleOrchestrator,
    interval: Duration,
    shared: Arc<Shared>,
}

impl Scheduler {
    #[must_use]
    pub fn new(orchestrator: CycleOrchestrator, interval: Duration, keywords: Vec<String>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        let (stop, _) = watch::channel(false);
        let (keywords, _) = watch::channel(keywords);
        Self {
            orchestrator,
            interval,
            shared: Arc::new(Shared {
                state,
                stop,
                keywords,
            }),
        }
    }

    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        *self.shared.state.borrow()
    }

    #[must_use]
    pub fn orchestrator(&self) -> &CycleOrchestrator {
        &self.orchestrator
    }

    /// Run cycles until stopped, then release pipeline resources.
    ///
    /// Returns the number of cycles run. Calling this when the scheduler is
    /// not stopped, or after its resources were released, does nothing and
    /// returns 0.
    pub async fn start(&mut self) -> u64 {
        if self.orchestrator.is_released() {
            tracing::warn!("scheduler resources already released, not starting");
            return 0;
        }
        // The flag must be cleared before the state reads `Running`; a stop()
        // landing in between would otherwise be overwritten and lost.
        self.shared.stop.send_replace(false);
        let mut stop_rx = self.shared.stop.subscribe();
        let started = self.shared.state.send_if_modified(|state| {
            if *state == SchedulerState::Stopped {
                *state = SchedulerState::Running;
                true
            } else {
                false
            }
        });
        if !started {
            tracing::debug!(state = %self.state(), "scheduler already running");
            return 0;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "scheduler started"
        );

        let mut cycles = 0_u64;
        loop {
            if *stop_rx.borrow_and_update() {
                break;
            }

            let keywords = self.shared.keywords.borrow().clone();
            let cycle_started = Instant::now();
            self.orchestrator.run_cycle(&keywords).await;
            cycles += 1;
            let elapsed = cycle_started.elapsed();

            if *stop_rx.borrow_and_update() {
                break;
            }

            match sleep_duration(self.interval, elapsed) {
                Some(wait) => {
                    tokio::select! {
                        () = tokio::time::sleep(wait) => {}
                        () = stop_requested(&mut stop_rx) => break,
                    }
                }
                None if elapsed > self.interval => {
                    tracing::warn!(
                        elapsed_secs = elapsed.as_secs_f64(),
                        interval_secs = self.interval.as_secs(),
                        "cycle overran the interval, starting the next one immediately"
                    );
                }
                None => {}
            }
        }

        self.shared.state.send_replace(SchedulerState::Stopping);
        self.orchestrator.release().await;
        self.shared.state.send_replace(SchedulerState::Stopped);
        tracing::info!(cycles, "scheduler stopped");
        cycles
    }

    /// Run a single cycle with the current keywords, outside the loop.
    ///
    /// Returns `None` once resources have been released.
    pub async fn run_once(&mut self) -> Option<CycleStats> {
        if self.orchestrator.is_released() {
            tracing::warn!("scheduler resources already released, skipping cycle");
            return None;
        }
        let keywords = self.shared.keywords.borrow().clone();
        Some(self.orchestrator.run_cycle(&keywords).await)
    }

    /// Release resources without running the loop. Returns `false` if they
    /// were already released.
    pub async fn shutdown(&mut self) -> bool {
        self.orchestrator.release().await
    }
}

/// Time left in the interval after a cycle took `elapsed`, or `None` when the
/// cycle used it all.
#[must_use]
pub fn sleep_duration(interval: Duration, elapsed: Duration) -> Option<Duration> {
    match interval.checked_sub(elapsed) {
        Some(left) if !left.is_zero() => Some(left),
        _ => None,
    }
}

async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone; nobody can ask us to stop any more.
            std::future::pending::<()>().await;
        }
    }
}
