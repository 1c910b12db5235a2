//! Point Cloud Distribution Service
//!
//! Holds the current point cloud and pushes every newly loaded snapshot to
//! all live subscribers.
//!
//! # Delivery policy
//!
//! Each subscriber owns a bounded queue. Publishing never waits on a
//! subscriber:
//! - **Full queue**: the incoming update is dropped for that subscriber only
//!   (drop-newest) and counted in `updates_dropped_total`
//! - **Closed queue**: the receiver is gone, so the sender is removed from
//!   the subscriber set and counted in `subscribers_pruned_total`
//!
//! Replacing the snapshot and fanning it out happen under one write lock,
//! so every subscriber observes loads in the order they were applied.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StreamResult;
use crate::pointcloud::{PointCloudSnapshot, PointCloudStatus};

/// Identifier handed out by [`PointCloudService::subscribe`]
pub type SubscriberId = u64;

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 16;

/// Receiving half of a point cloud subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<PointCloudSnapshot>>,
}

impl Subscription {
    /// Identifier to pass to [`PointCloudService::unsubscribe`]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription has been removed from the
    /// service and all queued snapshots have been received.
    pub async fn recv(&mut self) -> Option<Arc<PointCloudSnapshot>> {
        self.receiver.recv().await
    }

    /// Take a queued snapshot without waiting
    pub fn try_recv(&mut self) -> Option<Arc<PointCloudSnapshot>> {
        self.receiver.try_recv().ok()
    }
}

/// Counters for fan-out behaviour
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DistributionMetrics {
    /// Successful loads
    pub snapshots_loaded_total: u64,
    /// Snapshots enqueued to subscribers
    pub updates_delivered_total: u64,
    /// Snapshots discarded because a subscriber queue was full
    pub updates_dropped_total: u64,
    /// Subscribers removed after their receiver was dropped
    pub subscribers_pruned_total: u64,
}

struct DistributionState {
    current: Option<Arc<PointCloudSnapshot>>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Arc<PointCloudSnapshot>>>,
    metrics: DistributionMetrics,
}

/// Point cloud store and broadcaster
///
/// Construct once and share with `Arc`; all methods take `&self`.
pub struct PointCloudService {
    state: RwLock<DistributionState>,
    streaming: AtomicBool,
    next_subscriber_id: AtomicU64,
    subscriber_capacity: usize,
}

impl Default for PointCloudService {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_CAPACITY)
    }
}

impl PointCloudService {
    /// Create a service whose subscriber queues hold `subscriber_capacity`
    /// snapshots (at least one).
    pub fn new(subscriber_capacity: usize) -> Self {
        Self {
            state: RwLock::new(DistributionState {
                current: None,
                subscribers: HashMap::new(),
                metrics: DistributionMetrics::default(),
            }),
            streaming: AtomicBool::new(false),
            next_subscriber_id: AtomicU64::new(1),
            subscriber_capacity: subscriber_capacity.max(1),
        }
    }

    /// Validate and store a new point cloud, then push it to every subscriber.
    ///
    /// On a validation error the current snapshot is left untouched and
    /// nothing is delivered.
    pub async fn load_point_cloud(
        &self,
        positions: Vec<f32>,
        colors: Option<Vec<f32>>,
    ) -> StreamResult<Arc<PointCloudSnapshot>> {
        let snapshot = Arc::new(PointCloudSnapshot::new(positions, colors)?);

        let mut guard = self.state.write().await;
        let state = &mut *guard;

        state.current = Some(Arc::clone(&snapshot));
        state.metrics.snapshots_loaded_total += 1;

        let mut delivered = 0u64;
        let mut dropped = 0u64;
        let mut closed = Vec::new();

        for (id, sender) in &state.subscribers {
            match sender.try_send(Arc::clone(&snapshot)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    warn!(
                        subscriber_id = id,
                        "Subscriber queue full, dropping point cloud update"
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in &closed {
            state.subscribers.remove(id);
            debug!(subscriber_id = id, "Pruned closed point cloud subscriber");
        }

        state.metrics.updates_delivered_total += delivered;
        state.metrics.updates_dropped_total += dropped;
        state.metrics.subscribers_pruned_total += closed.len() as u64;

        info!(
            point_count = snapshot.point_count,
            delivered,
            dropped,
            "Loaded point cloud"
        );

        Ok(snapshot)
    }

    /// The most recently loaded snapshot
    pub async fn current_point_cloud(&self) -> Option<Arc<PointCloudSnapshot>> {
        self.state.read().await.current.clone()
    }

    /// Mark streaming as active (idempotent)
    pub fn start_streaming(&self) {
        if !self.streaming.swap(true, Ordering::SeqCst) {
            info!("Point cloud streaming started");
        }
    }

    /// Mark streaming as stopped (idempotent)
    pub fn stop_streaming(&self) {
        if self.streaming.swap(false, Ordering::SeqCst) {
            info!("Point cloud streaming stopped");
        }
    }

    /// Streaming flag; informational only, loads are delivered regardless
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Load and streaming state for status reporting
    pub async fn status(&self) -> PointCloudStatus {
        let state = self.state.read().await;
        let point_count = state.current.as_ref().map(|pc| pc.point_count);

        PointCloudStatus {
            is_loaded: point_count.is_some(),
            is_streaming: self.is_streaming(),
            point_count,
        }
    }

    /// Register a new subscriber queue
    pub async fn subscribe(&self) -> Subscription {
        let mut state = self.state.write().await;
        self.register(&mut state)
    }

    /// Register a subscriber and read the current snapshot atomically.
    ///
    /// Every later load is delivered through the subscription and none is
    /// already reflected in the returned snapshot, so a caller that sends
    /// the snapshot first never sees the same load twice.
    pub async fn subscribe_with_current(&self) -> (Subscription, Option<Arc<PointCloudSnapshot>>) {
        let mut state = self.state.write().await;
        let subscription = self.register(&mut state);
        (subscription, state.current.clone())
    }

    fn register(&self, state: &mut DistributionState) -> Subscription {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.subscriber_capacity);

        state.subscribers.insert(id, sender);

        debug!(
            subscriber_id = id,
            subscribers = state.subscribers.len(),
            "Point cloud subscriber registered"
        );

        Subscription { id, receiver }
    }

    /// Remove a subscriber; returns whether it was still registered.
    ///
    /// Calling this for an unknown or already removed id is a no-op.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut state = self.state.write().await;
        let removed = state.subscribers.remove(&id).is_some();

        if removed {
            debug!(
                subscriber_id = id,
                subscribers = state.subscribers.len(),
                "Point cloud subscriber removed"
            );
        }

        removed
    }

    /// Number of registered subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }

    /// Snapshot of fan-out counters
    pub async fn metrics(&self) -> DistributionMetrics {
        self.state.read().await.metrics.clone()
    }

    /// Queue depth given to each subscriber
    pub fn subscriber_capacity(&self) -> usize {
        self.subscriber_capacity
    }
}
