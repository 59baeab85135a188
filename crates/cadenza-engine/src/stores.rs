#![forbid(unsafe_code)]

use std::path::PathBuf;

use async_trait::async_trait;
use cadenza_core::{CacheKey, Quality, Session, SessionId, TrackId, UserId};
use chrono::{DateTime, Utc};

/// Source metadata for a track, as persisted by the library.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSource {
    pub file_path: PathBuf,
    pub file_modified: DateTime<Utc>,
}

/// Track/user persistence, reduced to what session creation and repair need.
#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Current source file path and modification time for a track.
    async fn find_track_source(&self, track_id: &TrackId) -> Option<TrackSource>;

    /// The user's preferred playback quality, used as a fallback when a
    /// session-creation call does not request one explicitly.
    async fn preferred_quality(&self, user_id: &UserId) -> Option<Quality>;
}

/// TTL'd session persistence.
///
/// Expiry enforcement is the store's concern: `get` must not return records
/// whose `expires_at` has passed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: Session);

    async fn get(&self, session_id: &SessionId) -> Option<Session>;

    async fn remove(&self, session_id: &SessionId);
}

/// Eviction bookkeeping for the raw key-value cache: which sessions currently
/// reference which cache keys.
#[async_trait]
pub trait EvictionTracker: Send + Sync {
    async fn register_session_reference(&self, session_id: &SessionId, cache_key: &CacheKey);

    async fn clear_session_reference(&self, session_id: &SessionId);
}
