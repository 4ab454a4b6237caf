//! Singleton production loop
//!
//! Started on demand by the first admission, then free-runs: every interval
//! it checks whether anyone is listening and, if so, produces, persists and
//! broadcasts one reading.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::broadcast::{Message, Multicaster};
use crate::data::{DataSource, Reading, RecordStore};
use crate::error::Result;
use crate::feed::MIN_BROADCAST_INTERVAL;
use crate::registry::ConnectionRegistry;
use crate::stats::FeedStats;

use super::state::{ProducerState, TickOutcome};

/// Everything one loop instance needs
#[derive(Clone)]
pub struct ProducerContext {
    /// Gate: production only happens while this is non-empty
    pub registry: Arc<ConnectionRegistry>,
    /// Delivers each update
    pub multicaster: Arc<Multicaster>,
    /// Where new readings come from
    pub source: Arc<dyn DataSource>,
    /// Where new readings are persisted
    pub store: Arc<dyn RecordStore>,
    /// Shared counters
    pub stats: Arc<FeedStats>,
    /// Time between ticks
    pub interval: Duration,
}

impl ProducerContext {
    /// Run one tick
    ///
    /// Errors are logged and reported as [`TickOutcome::Failed`]; they never
    /// escape into the loop.
    pub async fn tick(&self) -> TickOutcome {
        if self.registry.count() == 0 {
            self.stats.record_tick_skipped();
            return TickOutcome::Skipped;
        }

        let reading = match self.produce().await {
            Ok(reading) => reading,
            Err(e) => {
                self.stats.record_tick_failed();
                tracing::warn!(error = %e, "Producer tick failed");
                return TickOutcome::Failed;
            }
        };

        match self.multicaster.broadcast(&Message::Update(reading)).await {
            Ok(report) => {
                self.stats.record_tick_produced();
                TickOutcome::Produced {
                    delivered: report.delivered,
                }
            }
            Err(e) => {
                self.stats.record_tick_failed();
                tracing::warn!(error = %e, "Failed to encode update");
                TickOutcome::Failed
            }
        }
    }

    async fn produce(&self) -> Result<Reading> {
        let reading = self.source.next_reading().await?;
        let saved = self.store.save(reading).await?;
        tracing::debug!(id = ?saved.id, timestamp = %saved.timestamp, "Reading produced");
        Ok(saved)
    }
}

struct RunningLoop {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

struct Slot {
    state: ProducerState,
    running: Option<RunningLoop>,
}

/// Owner of the singleton loop handle
///
/// Check-and-start happens under one mutex, so concurrent admissions can
/// never end up with two live loops.
pub struct Producer {
    ctx: ProducerContext,
    slot: Mutex<Slot>,
}

impl Producer {
    /// Create a producer that has not started yet
    pub fn new(ctx: ProducerContext) -> Self {
        Self {
            ctx,
            slot: Mutex::new(Slot {
                state: ProducerState::NotStarted,
                running: None,
            }),
        }
    }

    /// Start the loop unless an instance is already live
    ///
    /// Returns true if this call started a new instance. Must be called from
    /// within a Tokio runtime.
    pub fn ensure_running(&self) -> bool {
        let mut slot = self.lock_slot();

        if let Some(running) = &slot.running {
            if !running.handle.is_finished() {
                return false;
            }
            tracing::debug!("Previous producer instance exited; restarting");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(self.ctx.clone(), cancel.clone()));

        slot.running = Some(RunningLoop { handle, cancel });
        slot.state = ProducerState::Running;
        true
    }

    /// Current lifecycle state
    pub fn state(&self) -> ProducerState {
        let slot = self.lock_slot();
        match &slot.running {
            Some(running) if running.handle.is_finished() => ProducerState::Stopped,
            _ => slot.state,
        }
    }

    /// Whether a loop instance is live
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Cancel the live instance and wait for it to exit
    ///
    /// A tick already in progress finishes first. The handle is cleared so a
    /// later [`ensure_running`](Self::ensure_running) starts a fresh instance.
    pub async fn stop(&self) {
        let running = {
            let mut slot = self.lock_slot();
            if slot.state != ProducerState::NotStarted {
                slot.state = ProducerState::Stopped;
            }
            slot.running.take()
        };

        if let Some(running) = running {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                tracing::warn!(error = %e, "Producer task ended abnormally");
            }
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // The slot holds no invariant a panicking holder could break
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(running) = slot.running.take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(ctx: ProducerContext, cancel: CancellationToken) {
    let period = ctx.interval.max(MIN_BROADCAST_INTERVAL);
    tracing::info!(interval_ms = period.as_millis() as u64, "Producer started");

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Producer cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        // Not raced against cancellation: an in-flight tick completes
        let outcome = ctx.tick().await;
        tracing::trace!(?outcome, "Producer tick");
    }

    tracing::info!("Producer stopped");
}
