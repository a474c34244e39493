//! Periodic readiness polling with per-assignment cancellation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use hive_core::config::ReadinessConfig;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::ReadinessStatus;
use super::probe::ReadinessProbe;

/// Broadcast buffer for status updates. Slow subscribers see `Lagged`.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// `tokio::time::interval` panics on a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Probe cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Delay between the starts of consecutive probes.
    pub interval: Duration,
    /// Upper bound on a single probe; expiry counts as unreachable.
    pub probe_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from(&ReadinessConfig::default())
    }
}

impl From<&ReadinessConfig> for PollerConfig {
    fn from(config: &ReadinessConfig) -> Self {
        Self {
            interval: config.interval(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

/// One status change for one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub assignment_id: String,
    pub status: ReadinessStatus,
}

struct Watch {
    address: String,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

/// Watches environment addresses until they answer.
///
/// Every watched assignment gets its own task: it probes immediately, then
/// once per interval, until the address answers or the assignment is
/// unwatched. `Available` is final for a watch and is never reverted.
/// The status map is updated one entry at a time.
pub struct ReadinessPoller<P> {
    probe: Arc<P>,
    config: PollerConfig,
    statuses: Arc<RwLock<HashMap<String, ReadinessStatus>>>,
    watches: Mutex<HashMap<String, Watch>>,
    updates: broadcast::Sender<StatusUpdate>,
    shutdown: CancellationToken,
}

impl<P: ReadinessProbe> ReadinessPoller<P> {
    pub fn new(probe: Arc<P>, config: PollerConfig) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            probe,
            config,
            statuses: Arc::new(RwLock::new(HashMap::new())),
            watches: Mutex::new(HashMap::new()),
            updates,
            shutdown: CancellationToken::new(),
        }
    }

    /// Start watching `assignment_id` at `address`.
    ///
    /// Returns `false` when nothing new was scheduled: the address is empty
    /// (any existing watch is dropped) or the same address is already watched.
    pub async fn watch(&self, assignment_id: &str, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            self.unwatch(assignment_id).await;
            return false;
        }

        let mut watches = self.watches.lock().await;
        if let Some(existing) = watches.get(assignment_id) {
            if existing.address == address {
                return false;
            }
            debug!(
                %assignment_id,
                old = %existing.address,
                new = %address,
                "Environment address changed"
            );
            existing.cancel.cancel();
        }

        let cancel = self.shutdown.child_token();
        // A cancelled predecessor re-checks its token under this lock.
        self.statuses
            .write()
            .await
            .insert(assignment_id.to_string(), ReadinessStatus::Pending);

        let task = tokio::spawn(run_watch(
            assignment_id.to_string(),
            address.to_string(),
            Arc::clone(&self.probe),
            self.config,
            Arc::clone(&self.statuses),
            self.updates.clone(),
            cancel.clone(),
        ));
        watches.insert(
            assignment_id.to_string(),
            Watch {
                address: address.to_string(),
                cancel,
                _task: task,
            },
        );
        info!(%assignment_id, %address, "Watching environment");
        true
    }

    /// Stop probing `assignment_id` and forget its status.
    ///
    /// Once this returns no further update for the assignment is published.
    pub async fn unwatch(&self, assignment_id: &str) -> bool {
        let mut watches = self.watches.lock().await;
        let Some(watch) = watches.remove(assignment_id) else {
            return false;
        };
        watch.cancel.cancel();
        // Status and watch entries leave together under the watch lock.
        self.statuses.write().await.remove(assignment_id);
        drop(watches);
        debug!(%assignment_id, "Stopped watching environment");
        true
    }

    /// Replace the watch set with `(assignment_id, address)` pairs.
    ///
    /// Vanished ids are unwatched, new ones watched, and ids whose address
    /// changed restart from `Pending`. Untouched watches keep running.
    pub async fn sync<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let desired: HashMap<String, String> = pairs
            .into_iter()
            .filter(|(_, address)| !address.trim().is_empty())
            .collect();

        let stale: Vec<String> = self
            .watches
            .lock()
            .await
            .keys()
            .filter(|id| !desired.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            self.unwatch(&id).await;
        }

        for (id, address) in &desired {
            self.watch(id, address).await;
        }
    }

    pub async fn status(&self, assignment_id: &str) -> Option<ReadinessStatus> {
        self.statuses.read().await.get(assignment_id).copied()
    }

    /// Point-in-time copy of every known status.
    pub async fn snapshot(&self) -> HashMap<String, ReadinessStatus> {
        self.statuses.read().await.clone()
    }

    pub async fn watched(&self) -> Vec<String> {
        self.watches.lock().await.keys().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusUpdate> {
        self.updates.subscribe()
    }

    /// Cancel every watch. Statuses stay readable; watches added afterwards
    /// never probe.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.watches.lock().await.clear();
        info!("Readiness poller stopped");
    }
}

impl<P> Drop for ReadinessPoller<P> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn run_watch<P: ReadinessProbe>(
    assignment_id: String,
    address: String,
    probe: Arc<P>,
    config: PollerConfig,
    statuses: Arc<RwLock<HashMap<String, ReadinessStatus>>>,
    updates: broadcast::Sender<StatusUpdate>,
    cancel: CancellationToken,
) {
    let mut timer = tokio::time::interval(config.interval.max(MIN_INTERVAL));
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately.
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = timer.tick() => {}
        }

        let reachable = tokio::select! {
            () = cancel.cancelled() => return,
            outcome = tokio::time::timeout(config.probe_timeout, probe.probe(&address)) => {
                outcome.unwrap_or(false)
            }
        };
        let status = if reachable {
            ReadinessStatus::Available
        } else {
            ReadinessStatus::Pending
        };

        {
            let mut map = statuses.write().await;
            if cancel.is_cancelled() {
                return;
            }
            map.insert(assignment_id.clone(), status);
            // No receivers is fine.
            let _ = updates.send(StatusUpdate {
                assignment_id: assignment_id.clone(),
                status,
            });
        }

        if status == ReadinessStatus::Available {
            info!(%assignment_id, %address, "Environment available");
            return;
        }
        debug!(%assignment_id, %address, "Environment not reachable yet");
    }
}
