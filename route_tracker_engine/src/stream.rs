//! Position stream adapter.
//!
//! Fixes arrive as an asynchronous push stream from some platform watcher.
//! The engine consumes them through a cancellable subscription; cancelling
//! is idempotent so shutdown paths can fire it more than once.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use route_tracker_lib::{distance::haversine_m, geo_fix::GeoFix};
use tokio::sync::mpsc;

use crate::error::TrackerError;

/// Delivery thresholds for a position watch, mirroring the usual platform
/// watcher options: a fix is delivered once at least `min_interval_ms` has
/// passed *and* the device moved at least `min_distance_m` since the last
/// delivered fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub min_interval_ms: i64,
    pub min_distance_m: f64,
}

impl WatchOptions {
    /// High-accuracy tracking: a fix per second and per meter moved.
    pub fn high_accuracy() -> Self {
        Self {
            min_interval_ms: 1_000,
            min_distance_m: 1.0,
        }
    }

    /// Coarse updates every 50 m, for battery-light monitoring.
    pub fn low_power() -> Self {
        Self {
            min_interval_ms: 0,
            min_distance_m: 50.0,
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::high_accuracy()
    }
}

/// A source of live position fixes.
///
/// Implementors must watch the subscription's [`SubscriptionHandle`]: once
/// it is cancelled, stop sending and drop the sender, so a consumer parked
/// on [`FixSubscription::recv`] wakes up instead of waiting forever. The
/// consumer side re-checks the handle on its own, so a fix already in
/// flight when the cancel lands is never applied.
pub trait FixSource {
    /// Starts delivery. A denied location permission surfaces as
    /// [`TrackerError::PermissionDenied`] and nothing is started.
    fn subscribe(&self, options: WatchOptions) -> Result<FixSubscription, TrackerError>;
}

/// Cancel handle for a running subscription. Cloneable so the producer,
/// the consumer and the teardown path can each hold one.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Idempotent; calling it on an already-cancelled subscription has no
    /// further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// The consuming end of a position watch.
#[derive(Debug)]
pub struct FixSubscription {
    receiver: mpsc::Receiver<GeoFix>,
    handle: SubscriptionHandle,
}

impl FixSubscription {
    pub fn new(receiver: mpsc::Receiver<GeoFix>, handle: SubscriptionHandle) -> Self {
        Self { receiver, handle }
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next fix in arrival order, or `None` once the stream ended or the
    /// subscription was cancelled.
    pub async fn recv(&mut self) -> Option<GeoFix> {
        if self.handle.is_cancelled() {
            return None;
        }
        self.receiver.recv().await
    }
}

/// Replays a scripted route as if a platform watcher produced it, applying
/// the same interval/distance thinning a real watcher would. Used by the
/// demo binary and the engine tests.
pub struct SimulatedFixSource {
    fixes: Vec<GeoFix>,
    permission_granted: bool,
}

impl SimulatedFixSource {
    pub fn new(fixes: Vec<GeoFix>) -> Self {
        Self {
            fixes,
            permission_granted: true,
        }
    }

    /// A source whose permission prompt was declined; `subscribe` always
    /// fails and no stream ever starts.
    pub fn denied() -> Self {
        Self {
            fixes: Vec::new(),
            permission_granted: false,
        }
    }
}

impl FixSource for SimulatedFixSource {
    fn subscribe(&self, options: WatchOptions) -> Result<FixSubscription, TrackerError> {
        if !self.permission_granted {
            return Err(TrackerError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(64);
        let handle = SubscriptionHandle::new();
        let producer_handle = handle.clone();
        let fixes = self.fixes.clone();

        tokio::spawn(async move {
            let mut last_sent: Option<GeoFix> = None;
            for fix in fixes {
                if producer_handle.is_cancelled() {
                    break;
                }
                if let Some(prev) = last_sent {
                    let interval = fix.timestamp_ms - prev.timestamp_ms;
                    let moved = haversine_m(prev.position(), fix.position());
                    if interval < options.min_interval_ms || moved < options.min_distance_m {
                        continue;
                    }
                }
                if tx.send(fix).await.is_err() {
                    break;
                }
                last_sent = Some(fix);
            }
        });

        Ok(FixSubscription::new(rx, handle))
    }
}
