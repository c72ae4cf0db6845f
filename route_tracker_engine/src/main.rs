use route_tracker_engine::{
    RouteTracker, STORE_PATH,
    store::SessionStore,
    stream::{SimulatedFixSource, WatchOptions},
};
use route_tracker_lib::geo_fix::GeoFix;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Replays a short synthetic walk through the full engine: start, stream,
// tick, stop, save, then list the stored sessions newest first.
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = project_root::get_project_root().unwrap_or_else(|_| ".".into());
    let store = SessionStore::open(root.join(STORE_PATH)).await.unwrap();
    let tracker = RouteTracker::new(store);

    let start_ms = chrono::Utc::now().timestamp_millis();
    let walk: Vec<GeoFix> = (0..10)
        .map(|i| {
            GeoFix::new(
                55.6761 + i as f64 * 0.0004,
                12.5683 + i as f64 * 0.0002,
                start_ms + i * 2_000,
            )
        })
        .collect();
    let source = SimulatedFixSource::new(walk);

    tracker
        .start(&source, WatchOptions::high_accuracy())
        .await
        .unwrap();

    // Let the stream drain, ticking the timer like a UI would.
    for _ in 0..10 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tracker.tick().await.unwrap();
        if tracker.snapshot().await.route.len() >= 10 {
            break;
        }
    }

    let snapshot = tracker.snapshot().await;
    tracing::info!(
        "Captured {} fixes, {:.0} m, {} s elapsed",
        snapshot.route.len(),
        snapshot.total_distance_m,
        snapshot.elapsed_sec
    );

    tracker.stop().await.unwrap();
    let session = tracker.save().await.unwrap();
    tracing::info!("Saved session {}", session.session_id);

    let mut sessions = tracker.saved_sessions().await;
    sessions.reverse(); // newest first for display
    for session in &sessions {
        tracing::info!(
            "Session {}: {} km in {} s over {} points",
            session.session_id,
            session.distance_km,
            session.duration_sec,
            session.path.len()
        );
    }
}
