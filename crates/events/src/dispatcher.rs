//! Background dispatcher for undelivered events.
//!
//! Polls the [`EventStore`] every `poll_interval` for rows still marked
//! `new`, notifies the [`SubscriberRegistry`], and marks each row
//! `processed`. Catches up on rows left over from a restart and on rows
//! written by paths that bypass the [`EventGateway`](crate::EventGateway).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::gateway::PublishGate;
use crate::registry::SubscriberRegistry;
use crate::store::{EventStore, StoreError};

/// Default polling interval for the dispatcher loop.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default maximum number of rows handled per tick.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Shortest poll interval the loop accepts. `tokio::time::interval`
/// panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
}

impl DispatcherConfig {
    /// Raise zero values to the smallest usable ones. A zero batch would
    /// scan nothing forever; a zero interval would panic the loop.
    fn normalized(self) -> Self {
        let poll_interval = self.poll_interval.max(MIN_POLL_INTERVAL);
        let batch_size = self.batch_size.max(1);
        if poll_interval != self.poll_interval || batch_size != self.batch_size {
            tracing::warn!(
                poll_interval_ms = poll_interval.as_millis() as u64,
                batch_size,
                "Dispatcher config contained zero values, clamped"
            );
        }
        Self {
            poll_interval,
            batch_size,
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Outcome of a single dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Rows found with status `new`.
    pub scanned: usize,
    /// Rows notified and marked `processed` by this tick.
    pub delivered: usize,
}

/// Single long-lived polling task per process.
pub struct Dispatcher {
    store: Arc<dyn EventStore>,
    registry: Arc<SubscriberRegistry>,
    gate: PublishGate,
    config: DispatcherConfig,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<SubscriberRegistry>,
        gate: PublishGate,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            registry,
            gate,
            config: config.normalized(),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the dispatcher loop.
    ///
    /// Only the first call spawns; every later call is a no-op returning
    /// `None`.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("Event dispatcher already started");
            return None;
        }
        let dispatcher = Arc::clone(self);
        Some(tokio::spawn(async move { dispatcher.run().await }))
    }

    /// Ask the loop to exit. The in-flight tick, if any, is abandoned at its
    /// next suspension point; unmarked rows are picked up after restart.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Run the dispatcher loop until [`stop`](Self::stop) is called.
    ///
    /// A failed tick is logged and the loop carries on with the next one.
    async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            "Event dispatcher started",
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Event dispatcher shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => {
                            tracing::info!("Event dispatcher shutting down mid-tick");
                            break;
                        }
                        result = self.tick() => match result {
                            Ok(report) if report.scanned > 0 => {
                                tracing::debug!(
                                    scanned = report.scanned,
                                    delivered = report.delivered,
                                    "Dispatch cycle complete",
                                );
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::error!(error = %e, "Dispatch cycle failed");
                            }
                        },
                    }
                }
            }
        }
    }

    /// One dispatch cycle: scan `new` rows, notify, mark processed.
    ///
    /// Rows are handled in store insertion order. A failed mark aborts the
    /// cycle; that row and the rest of the batch are retried next tick.
    pub async fn tick(&self) -> Result<TickReport, StoreError> {
        let batch = {
            let _gate = self.gate.scanning().await;
            self.store.list_new(self.config.batch_size).await?
        };

        let mut report = TickReport {
            scanned: batch.len(),
            delivered: 0,
        };

        for event in batch {
            self.registry.notify(&event).await;
            if self.store.mark_processed(event.id).await? {
                report.delivered += 1;
            } else {
                tracing::debug!(event_id = event.id, "Event was already processed");
            }
        }

        Ok(report)
    }
}
