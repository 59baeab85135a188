#![forbid(unsafe_code)]

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CacheKey, ManifestProfile, Quality, SessionId, SourceType, TrackId, UserId};

/// One playback attempt.
///
/// Created by the session manager, mutated only by heartbeats (expiry and
/// activity), never by readiness checks. Expiry enforcement belongs to the
/// session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub track_id: TrackId,
    /// Identifies the built asset; shared between sessions for the same
    /// (track, quality, profile).
    pub cache_key: CacheKey,
    pub quality: Quality,
    pub source_type: SourceType,
    pub manifest_profile: ManifestProfile,
    /// Location of the DASH manifest on shared storage.
    pub manifest_path: PathBuf,
    /// Directory holding the init/chunk segment files.
    pub asset_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Extended by heartbeats.
    pub expires_at: DateTime<Utc>,
    /// Last heartbeat; token continuity checks compare against this.
    pub last_activity: DateTime<Utc>,
}
