use std::sync::Arc;

use chrono::Utc;
use route_tracker_lib::{geo_fix::GeoFix, session::Session};
use tokio::sync::Mutex;

use crate::{
    error::TrackerError,
    state_machine::{FixOutcome, Phase, TrackingState},
    store::SessionStore,
    stream::{FixSource, SubscriptionHandle, WatchOptions},
};

/// Read-only view of the live tracking state, for rendering.
#[derive(Debug, Clone)]
pub struct TrackingSnapshot {
    pub phase: Phase,
    pub route: Vec<GeoFix>,
    pub total_distance_m: f64,
    pub started_at_ms: Option<i64>,
    pub elapsed_sec: u64,
}

/// The public interface of the tracking session engine.
///
/// Fixes from the live stream, the periodic tick and user-triggered
/// transitions all serialize through one mutex, so no two transitions ever
/// interleave on the same state.
#[derive(Clone)]
pub struct RouteTracker {
    state: Arc<Mutex<TrackingState>>,
    store: SessionStore,
    subscription: Arc<Mutex<Option<SubscriptionHandle>>>,
}

impl RouteTracker {
    pub fn new(store: SessionStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackingState::new())),
            store,
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribes to the position stream and begins a new attempt. Denied
    /// permission surfaces before any state changes, so the engine stays
    /// idle until it is resolved.
    pub async fn start(
        &self,
        source: &dyn FixSource,
        options: WatchOptions,
    ) -> Result<(), TrackerError> {
        let mut state = self.state.lock().await;

        let mut subscription = source.subscribe(options)?;
        if let Err(err) = state.start(Utc::now().timestamp_millis()) {
            subscription.handle().cancel();
            return Err(err);
        }

        {
            let mut slot = self.subscription.lock().await;
            if let Some(stale) = slot.replace(subscription.handle()) {
                stale.cancel();
            }
        }

        tracing::info!("Tracking started");

        let state_ref = self.state.clone();
        let pump_handle = subscription.handle();
        tokio::spawn(async move {
            while let Some(fix) = subscription.recv().await {
                let mut state = state_ref.lock().await;
                // The subscription may have been cancelled between receiving
                // this fix and acquiring the lock; a later attempt could own
                // the state by now, and its route must not see this fix.
                if pump_handle.is_cancelled() {
                    tracing::debug!("Fix at {} discarded after cancellation", fix.timestamp_ms);
                    break;
                }
                match state.apply_fix(fix) {
                    Ok(FixOutcome::Appended { delta_m }) => {
                        tracing::trace!("Fix applied, +{delta_m:.1} m");
                    }
                    Ok(FixOutcome::OutOfOrder { delta_m }) => {
                        tracing::warn!(
                            "Out-of-order fix at {} applied anyway, +{delta_m:.1} m",
                            fix.timestamp_ms
                        );
                    }
                    Err(err) => {
                        tracing::warn!("Fix dropped: {err}");
                    }
                }
            }
            tracing::debug!("Fix stream ended");
        });

        Ok(())
    }

    /// Advances the elapsed timer from the wall clock.
    pub async fn tick(&self) -> Result<(), TrackerError> {
        self.state.lock().await.tick(Utc::now().timestamp_millis())
    }

    /// Freezes the attempt and cancels the stream subscription.
    pub async fn stop(&self) -> Result<(), TrackerError> {
        self.state.lock().await.stop()?;
        self.cancel_subscription().await;
        tracing::info!("Tracking stopped");
        Ok(())
    }

    /// Persists the stopped attempt as a session. Only a successful write
    /// resets the engine; a store failure leaves the stopped state intact
    /// so the caller can retry or discard.
    pub async fn save(&self) -> Result<Session, TrackerError> {
        let mut state = self.state.lock().await;

        let now_ms = Utc::now().timestamp_millis();
        let session_id = match self.store.max_session_id().await {
            Some(max) if max >= now_ms => max + 1,
            _ => now_ms,
        };

        let session = state.finalize_session(session_id)?;
        self.store.append_and_persist(session.clone()).await?;

        state.reset_to_idle();
        self.cancel_subscription().await;

        tracing::info!(
            "Session {} saved: {} km in {} s",
            session.session_id,
            session.distance_km,
            session.duration_sec
        );
        Ok(session)
    }

    /// Abandons the current attempt without persisting anything.
    pub async fn discard(&self) -> Result<(), TrackerError> {
        self.state.lock().await.discard()?;
        self.cancel_subscription().await;
        tracing::info!("Tracking discarded");
        Ok(())
    }

    pub async fn snapshot(&self) -> TrackingSnapshot {
        let state = self.state.lock().await;
        TrackingSnapshot {
            phase: state.phase(),
            route: state.route().to_vec(),
            total_distance_m: state.total_distance_m(),
            started_at_ms: state.started_at_ms(),
            elapsed_sec: state.elapsed_sec(),
        }
    }

    /// Whether a save could currently succeed; lets a caller disable its
    /// save control while the route is too short.
    pub async fn can_save(&self) -> bool {
        self.state.lock().await.can_save()
    }

    /// Stored sessions, oldest first.
    pub async fn saved_sessions(&self) -> Vec<Session> {
        self.store.load_all().await
    }

    async fn cancel_subscription(&self) {
        if let Some(handle) = self.subscription.lock().await.take() {
            handle.cancel();
        }
    }
}
