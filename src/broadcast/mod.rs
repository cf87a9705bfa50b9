//! Subscription broadcaster: pushes scan snapshots to connected observers
//!
//! A newly registered observer gets a snapshot straight away; after that a
//! fixed-interval ticker scans and pushes to everyone, but only while at least
//! one observer is connected.

use crate::scanner::{ScanSnapshot, Scanner};
use crate::ScanError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle identifying a registered observer
pub type ObserverId = u64;

/// A push channel to one connected party
#[async_trait]
pub trait Observer: Send + Sync {
    /// Whether the underlying connection can still take messages
    fn is_open(&self) -> bool;

    /// Push one serialized snapshot; an error means the observer is gone
    async fn send(&self, payload: &str) -> crate::Result<()>;
}

/// Snapshots a transport may fall behind by before its observer is dropped
pub const OBSERVER_QUEUE_CAPACITY: usize = 8;

/// Observer backed by a bounded channel, drained by a transport task.
///
/// Sends never wait: a full queue means the other end stopped reading.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::Sender<String>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }

    /// Observer plus the receiving end its transport reads from
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(OBSERVER_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl Observer for ChannelObserver {
    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn send(&self, payload: &str) -> crate::Result<()> {
        self.sender.try_send(payload.to_string()).map_err(|e| match e {
            TrySendError::Full(_) => ScanError::ObserverBacklogged(self.sender.max_capacity()),
            TrySendError::Closed(_) => ScanError::ObserverClosed,
        })
    }
}

/// Owns the active observer set and drives scan timing
pub struct Broadcaster {
    scanner: Arc<dyn Scanner>,
    observers: RwLock<HashMap<ObserverId, Arc<dyn Observer>>>,
    next_id: AtomicU64,
    interval: Duration,
}

impl Broadcaster {
    pub fn new(scanner: Arc<dyn Scanner>, interval: Duration) -> Self {
        Self {
            scanner,
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            interval,
        }
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Add an observer to the active set without scanning
    pub async fn register(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut observers = self.observers.write().await;
            observers.insert(id, observer);
            observers.len()
        };
        log::info!("Observer {} connected ({} active)", id, count);
        id
    }

    /// Register an observer and push it a fresh snapshot immediately
    pub async fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = self.register(observer).await;
        self.push_initial(id).await;
        id
    }

    /// Scan and push the result to one registered observer only.
    ///
    /// Returns whether the snapshot was delivered.
    pub async fn push_initial(&self, id: ObserverId) -> bool {
        let snapshot = self.scanner.scan().await;

        let observer = match self.observers.read().await.get(&id) {
            Some(observer) => observer.clone(),
            // Disconnected while the scan ran
            None => return false,
        };

        match snapshot.to_json() {
            Ok(payload) => self.deliver(id, observer.as_ref(), &payload).await,
            Err(e) => {
                log::warn!("Failed to serialize snapshot: {}", e);
                false
            }
        }
    }

    /// Remove an observer; returns whether it was still registered
    pub async fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            log::info!("Observer {} disconnected", id);
        }
        removed
    }

    /// One interval step: scan and push to every observer, or do nothing
    /// when nobody is connected.
    ///
    /// Returns the number of observers reached, `None` if the scan was skipped.
    pub async fn tick(&self) -> Option<usize> {
        if self.observer_count().await == 0 {
            return None;
        }

        let snapshot = self.scanner.scan().await;
        Some(self.broadcast(&snapshot).await)
    }

    /// Push a snapshot to every currently active observer.
    ///
    /// Works on a copy of the set, so observers may come and go meanwhile.
    /// Observers whose send fails are dropped; the rest still get the push.
    pub async fn broadcast(&self, snapshot: &ScanSnapshot) -> usize {
        let payload = match snapshot.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Failed to serialize snapshot: {}", e);
                return 0;
            }
        };

        let targets: Vec<(ObserverId, Arc<dyn Observer>)> = self
            .observers
            .read()
            .await
            .iter()
            .map(|(id, observer)| (*id, observer.clone()))
            .collect();

        let mut delivered = 0;
        for (id, observer) in targets {
            if self.deliver(id, observer.as_ref(), &payload).await {
                delivered += 1;
            }
        }
        delivered
    }

    async fn deliver(&self, id: ObserverId, observer: &dyn Observer, payload: &str) -> bool {
        if observer.is_open() && observer.send(payload).await.is_ok() {
            return true;
        }

        log::debug!("Dropping observer {} after failed push", id);
        self.unsubscribe(id).await;
        false
    }

    /// Tick on the configured interval until `shutdown` is cancelled.
    ///
    /// The first tick fires one full interval after start; subscribers get
    /// their first snapshot from [`Broadcaster::subscribe`] instead.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Some(delivered) = self.tick().await {
                        log::debug!("Pushed snapshot to {} observers", delivered);
                    }
                }
            }
        }

        log::info!("Broadcaster stopped");
    }
}
