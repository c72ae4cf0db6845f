//! Durable session collection.
//!
//! The whole collection is one JSON blob, stored oldest-first, rewritten
//! atomically on every append (temp file + rename) so a failed write can
//! never corrupt previously saved sessions. Unreadable contents on load
//! degrade to an empty collection instead of blocking new tracking.

use std::{path::PathBuf, sync::Arc};

use route_tracker_lib::session::Session;
use tokio::sync::Mutex;

use crate::error::TrackerError;

#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl SessionStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|err| {
                    TrackerError::Persistence(format!(
                        "Failed to create store directory {parent:?}: {err}"
                    ))
                })?;
            }
        }

        let sessions = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => match serde_json::from_slice::<Vec<Session>>(&bytes) {
                Ok(sessions) => sessions,
                Err(err) => {
                    tracing::warn!("Stored sessions in {path:?} are unreadable, starting empty: {err}");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(TrackerError::Persistence(format!(
                    "Failed to read session store {path:?}: {err}"
                )));
            }
        };

        Ok(Self {
            path,
            sessions: Arc::new(Mutex::new(sessions)),
        })
    }

    /// All stored sessions, oldest first. Newest-first display is the
    /// caller's concern.
    pub async fn load_all(&self) -> Vec<Session> {
        self.sessions.lock().await.clone()
    }

    pub async fn max_session_id(&self) -> Option<i64> {
        self.sessions
            .lock()
            .await
            .iter()
            .map(|session| session.session_id)
            .max()
    }

    /// Appends and rewrites the blob. All-or-nothing: on any failure the
    /// in-memory collection is rolled back and the file keeps its previous
    /// contents.
    pub async fn append_and_persist(&self, session: Session) -> Result<(), TrackerError> {
        let mut sessions = self.sessions.lock().await;

        if sessions.iter().any(|s| s.session_id == session.session_id) {
            return Err(TrackerError::Persistence(format!(
                "Session id {} already stored",
                session.session_id
            )));
        }

        sessions.push(session);

        if let Err(err) = self.write_blob(&sessions).await {
            sessions.pop();
            return Err(err);
        }

        Ok(())
    }

    async fn write_blob(&self, sessions: &[Session]) -> Result<(), TrackerError> {
        let blob = serde_json::to_vec(sessions).map_err(|err| {
            TrackerError::Persistence(format!("Failed to serialize session collection: {err}"))
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &blob).await.map_err(|err| {
            TrackerError::Persistence(format!("Failed to write {tmp_path:?}: {err}"))
        })?;

        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|err| {
            TrackerError::Persistence(format!(
                "Failed to replace session store {:?}: {err}",
                self.path
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_tracker_lib::geo_fix::GeoFix;

    fn session(id: i64) -> Session {
        let route = vec![
            GeoFix::new(55.6761, 12.5683, 1_000),
            GeoFix::new(55.6772, 12.5690, 2_000),
        ];
        Session::from_route(id, &route, 140.0, 12_000)
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("routes.json")).await.unwrap();
        assert!(store.load_all().await.is_empty());
        assert_eq!(store.max_session_id().await, None);
    }

    #[tokio::test]
    async fn round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");

        let store = SessionStore::open(&path).await.unwrap();
        let saved = session(17);
        store.append_and_persist(saved.clone()).await.unwrap();

        // Reopen from disk to exercise the full round trip.
        let reopened = SessionStore::open(&path).await.unwrap();
        let loaded = reopened.load_all().await;
        assert_eq!(loaded, vec![saved]);
    }

    #[tokio::test]
    async fn appends_keep_oldest_first_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("routes.json")).await.unwrap();

        store.append_and_persist(session(1)).await.unwrap();
        store.append_and_persist(session(2)).await.unwrap();
        store.append_and_persist(session(3)).await.unwrap();

        let ids: Vec<i64> = store
            .load_all()
            .await
            .iter()
            .map(|s| s.session_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.max_session_id().await, Some(3));
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("routes.json")).await.unwrap();

        store.append_and_persist(session(5)).await.unwrap();
        let err = store.append_and_persist(session(5)).await.unwrap_err();
        assert!(matches!(err, TrackerError::Persistence(_)));
        assert_eq!(store.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn corrupt_blob_fails_closed_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        tokio::fs::write(&path, b"{ not json ").await.unwrap();

        let store = SessionStore::open(&path).await.unwrap();
        assert!(store.load_all().await.is_empty());

        // A new session can still be saved over the corrupt blob.
        store.append_and_persist(session(1)).await.unwrap();
        let reopened = SessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_all().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_rolls_the_collection_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");
        let store = SessionStore::open(&path).await.unwrap();
        store.append_and_persist(session(1)).await.unwrap();

        // Occupy the temp path with a directory so the rewrite fails.
        tokio::fs::create_dir(path.with_extension("json.tmp"))
            .await
            .unwrap();

        let err = store.append_and_persist(session(2)).await.unwrap_err();
        assert!(matches!(err, TrackerError::Persistence(_)));
        assert_eq!(store.load_all().await.len(), 1);

        // The previously stored session is untouched on disk.
        let reopened = SessionStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_all().await.len(), 1);
    }
}
