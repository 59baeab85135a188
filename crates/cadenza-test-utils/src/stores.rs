#![forbid(unsafe_code)]

use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use cadenza_core::{CacheKey, Quality, Session, SessionId, TrackId, UserId};
use cadenza_engine::{EvictionTracker, SessionStore, TrackSource, TrackStore};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// In-memory track/user lookup.
#[derive(Default)]
pub struct MemoryTrackStore {
    sources: Mutex<HashMap<TrackId, TrackSource>>,
    preferences: Mutex<HashMap<UserId, Quality>>,
}

impl MemoryTrackStore {
    pub fn insert_source(&self, track_id: &TrackId, path: &Path, modified: DateTime<Utc>) {
        self.sources.lock().insert(
            track_id.clone(),
            TrackSource {
                file_path: path.to_path_buf(),
                file_modified: modified,
            },
        );
    }

    pub fn remove_source(&self, track_id: &TrackId) {
        self.sources.lock().remove(track_id);
    }

    pub fn set_preferred_quality(&self, user_id: &UserId, quality: Quality) {
        self.preferences.lock().insert(user_id.clone(), quality);
    }
}

#[async_trait]
impl TrackStore for MemoryTrackStore {
    async fn find_track_source(&self, track_id: &TrackId) -> Option<TrackSource> {
        self.sources.lock().get(track_id).cloned()
    }

    async fn preferred_quality(&self, user_id: &UserId) -> Option<Quality> {
        self.preferences.lock().get(user_id).cloned()
    }
}

/// In-memory session store with lazy TTL enforcement on access.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, session: Session) {
        self.sessions
            .lock()
            .insert(session.session_id.clone(), session);
    }

    async fn get(&self, session_id: &SessionId) -> Option<Session> {
        let mut sessions = self.sessions.lock();
        match sessions.get(session_id) {
            Some(session) if session.expires_at > Utc::now() => Some(session.clone()),
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }

    async fn remove(&self, session_id: &SessionId) {
        self.sessions.lock().remove(session_id);
    }
}

/// Records reference registration calls instead of talking to a cache.
#[derive(Default)]
pub struct CountingEvictionTracker {
    registered: Mutex<Vec<(SessionId, CacheKey)>>,
    cleared: Mutex<Vec<SessionId>>,
}

impl CountingEvictionTracker {
    #[must_use]
    pub fn registered(&self) -> Vec<(SessionId, CacheKey)> {
        self.registered.lock().clone()
    }

    #[must_use]
    pub fn cleared(&self) -> Vec<SessionId> {
        self.cleared.lock().clone()
    }
}

#[async_trait]
impl EvictionTracker for CountingEvictionTracker {
    async fn register_session_reference(&self, session_id: &SessionId, cache_key: &CacheKey) {
        self.registered
            .lock()
            .push((session_id.clone(), cache_key.clone()));
    }

    async fn clear_session_reference(&self, session_id: &SessionId) {
        self.cleared.lock().push(session_id.clone());
    }
}
