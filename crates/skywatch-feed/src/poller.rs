// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Periodic refresh of the aircraft set.
//!
//! [`PollScheduler::start`] runs one fetch-ingest cycle immediately and then
//! repeats on a fixed interval. The returned [`PollHandle`] owns the timer:
//! dropping it (or calling [`PollHandle::stop`]) cancels the loop, so no
//! update is published after the consumer is gone.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::fetch::FlightSource;
use crate::ingest::{Fleet, IngestPolicy};

/// Default aircraft refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Time between the start of consecutive cycles.
    pub interval: Duration,
    /// How unpositioned records are treated on ingest.
    pub policy: IngestPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            policy: IngestPolicy::default(),
        }
    }
}

/// The current aircraft set, tagged with the cycle that produced it.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    /// Monotonic cycle number. `0` means no cycle has completed yet.
    pub generation: u64,
    pub fleet: Arc<Fleet>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Publish `snapshot` unless a newer generation is already visible.
///
/// Returns whether the snapshot was applied.
pub(crate) fn publish(tx: &watch::Sender<FleetSnapshot>, snapshot: FleetSnapshot) -> bool {
    tx.send_if_modified(|current| {
        if snapshot.generation <= current.generation {
            debug!(
                "Discarding poll result for generation {} (current {})",
                snapshot.generation, current.generation
            );
            return false;
        }
        *current = snapshot;
        true
    })
}

/// Entry point for the poll loop.
#[derive(Debug)]
pub struct PollScheduler;

impl PollScheduler {
    /// Start polling `source`. The first cycle runs immediately.
    #[must_use]
    pub fn start<S: FlightSource>(source: Arc<S>, config: PollConfig) -> PollHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(FleetSnapshot::default());
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let task = tokio::spawn(async move {
            poll_loop(source, config, snapshot_tx, task_cancel).await;
        });

        PollHandle {
            snapshot_rx,
            cancel_token,
            task: Some(task),
        }
    }
}

/// Owned handle to a running poll loop.
pub struct PollHandle {
    snapshot_rx: watch::Receiver<FleetSnapshot>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollHandle")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl PollHandle {
    /// Watch the published aircraft set.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FleetSnapshot> {
        self.snapshot_rx.clone()
    }

    /// The most recently published aircraft set.
    #[must_use]
    pub fn latest(&self) -> FleetSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    /// Cancel the loop without waiting for it to exit.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }

    /// Cancel the loop and wait for the task to finish.
    pub async fn stop(mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn poll_loop<S: FlightSource>(
    source: Arc<S>,
    config: PollConfig,
    snapshot_tx: watch::Sender<FleetSnapshot>,
    cancel_token: CancellationToken,
) {
    let period = config.interval.max(MIN_POLL_INTERVAL);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut generation = 0u64;

    info!("Polling aircraft feed every {:?}", period);

    loop {
        tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        generation += 1;

        let records = tokio::select! {
            biased;
            () = cancel_token.cancelled() => break,
            records = source.fetch_flights() => records,
        };

        let fleet = Fleet::ingest(records, config.policy);
        debug!("Poll cycle {} produced {} aircraft", generation, fleet.len());

        publish(
            &snapshot_tx,
            FleetSnapshot {
                generation,
                fleet: Arc::new(fleet),
                fetched_at: Some(Utc::now()),
            },
        );
    }

    info!("Poll loop stopped after {} cycles", generation);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::model::AircraftState;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicU32,
    }

    impl FlightSource for CountingSource {
        async fn fetch_flights(&self) -> Vec<AircraftState> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            vec![
                AircraftState {
                    icao24: "abc123".to_string(),
                    latitude: Some(45.0),
                    longitude: Some(9.0),
                    geo_altitude: Some(1000.0 + f64::from(n)),
                    ..Default::default()
                },
                AircraftState {
                    icao24: "def456".to_string(),
                    ..Default::default()
                },
            ]
        }
    }

    fn config(secs: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(secs),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_runs_immediately() {
        let source = Arc::new(CountingSource::default());
        let handle = PollScheduler::start(Arc::clone(&source), config(10));
        let mut rx = handle.subscribe();

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.fleet.len(), 1);
        assert!(snapshot.fetched_at.is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeats_on_interval() {
        let source = Arc::new(CountingSource::default());
        let handle = PollScheduler::start(Arc::clone(&source), config(10));
        let mut rx = handle.subscribe();

        for expected in 1..=3u64 {
            rx.changed().await.unwrap();
            assert_eq!(rx.borrow_and_update().generation, expected);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        let latest = handle.latest();
        assert_eq!(latest.fleet.get("abc123").unwrap().geo_altitude, Some(1002.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let source = Arc::new(CountingSource::default());
        let handle = PollScheduler::start(Arc::clone(&source), config(10));
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();

        drop(handle);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        // Sender is gone once the loop exits.
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_exit() {
        let source = Arc::new(CountingSource::default());
        let handle = PollScheduler::start(Arc::clone(&source), config(10));
        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        assert!(handle.is_running());

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_older_generation_discarded() {
        let (tx, rx) = watch::channel(FleetSnapshot::default());
        let newer = FleetSnapshot {
            generation: 2,
            ..Default::default()
        };
        let older = FleetSnapshot {
            generation: 1,
            ..Default::default()
        };

        assert!(publish(&tx, newer));
        assert!(!publish(&tx, older));
        assert_eq!(rx.borrow().generation, 2);
    }
}
