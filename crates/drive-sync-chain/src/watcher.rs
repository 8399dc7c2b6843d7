//! Change watcher: polls the checkpoint and announces when it moves.
//!
//! The watcher is idle until [`ChangeWatcher::listen`] loads a baseline and
//! starts a polling task. Each tick reloads the checkpoint and compares it
//! with the baseline field for field:
//!
//! - different: emit [`WatchEvent::Change`] and adopt it as the new baseline
//! - load failed: emit [`WatchEvent::Error`] and keep the old baseline
//!
//! Ticks run one after another on a single task, so a slow reload delays
//! the next tick instead of overlapping it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use drive_sync_core::SyncCheckpoint;
use drive_sync_store::{CheckpointSource, StoreError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default polling period.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);

const EVENT_CAPACITY: usize = 16;

/// Watcher configuration.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Time between checkpoint reloads.
    pub watch_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

/// What a tick observed.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The checkpoint differs from the previous baseline.
    Change(SyncCheckpoint),
    /// Reloading the checkpoint failed.
    Error(Arc<StoreError>),
}

enum WatchState {
    Idle,
    Active {
        stop: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
}

/// Polls a [`CheckpointSource`] and broadcasts [`WatchEvent`]s.
///
/// At most one polling task exists per watcher. Dropping the watcher stops
/// it.
pub struct ChangeWatcher<S: CheckpointSource + 'static> {
    source: Arc<S>,
    config: WatcherConfig,
    events: broadcast::Sender<WatchEvent>,
    state: Mutex<WatchState>,
}

impl<S: CheckpointSource + 'static> ChangeWatcher<S> {
    pub fn new(source: Arc<S>, config: WatcherConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            source,
            config,
            events,
            state: Mutex::new(WatchState::Idle),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Receive events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    pub fn is_listening(&self) -> bool {
        matches!(*self.lock_state(), WatchState::Active { .. })
    }

    /// Load the baseline and start polling.
    ///
    /// Returns `Ok(false)` without touching the source if the watcher is
    /// already active. A failed baseline load leaves the watcher idle.
    pub async fn listen(&self) -> Result<bool, StoreError> {
        if self.is_listening() {
            return Ok(false);
        }

        let baseline = self.source.load().await?;

        let mut state = self.lock_state();
        if matches!(*state, WatchState::Active { .. }) {
            return Ok(false);
        }

        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(poll(
            self.source.clone(),
            baseline,
            self.config.watch_interval,
            self.events.clone(),
            stop_rx,
        ));
        *state = WatchState::Active { stop, task };

        info!(
            interval_ms = self.config.watch_interval.as_millis() as u64,
            "watching checkpoint"
        );
        Ok(true)
    }

    /// Stop polling. Idempotent, and a no-op on an idle watcher.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), WatchState::Idle);
        if let WatchState::Active { stop, task } = previous {
            let _ = stop.send(true);
            drop(task);
            info!("stopped watching checkpoint");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S: CheckpointSource + 'static> Drop for ChangeWatcher<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll<S: CheckpointSource>(
    source: Arc<S>,
    mut baseline: SyncCheckpoint,
    period: Duration,
    events: broadcast::Sender<WatchEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        let loaded = tokio::select! {
            biased;
            _ = stop.changed() => break,
            loaded = source.load() => loaded,
        };

        if *stop.borrow() {
            break;
        }

        match loaded {
            Ok(checkpoint) if checkpoint != baseline => {
                debug!(tip = ?checkpoint.tip_height(), "checkpoint changed");
                baseline = checkpoint.clone();
                // No subscribers is fine; the next change is still reported.
                let _ = events.send(WatchEvent::Change(checkpoint));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "checkpoint reload failed");
                let _ = events.send(WatchEvent::Error(Arc::new(e)));
            }
        }
    }
}
