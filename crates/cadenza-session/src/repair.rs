#![forbid(unsafe_code)]

//! Playback-error repair scheduling.
//!
//! Clients report playback failures fire-and-forget; at most one repair runs
//! per session at a time, with at most one follow-up queued behind it.
//! Anything beyond that is dropped silently. Repairs themselves are strictly
//! best-effort: every failure inside a repair is logged and swallowed so this
//! path can never break playback-error reporting.

use std::{collections::HashSet, sync::Arc};

use cadenza_core::{InflightMap, SessionId, SourceType, StreamResult, TrackId, UserId};
use cadenza_engine::{BuildEngine, DashBuildRequest, SessionStore, TrackStore};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

/// A client-reported playback failure.
#[derive(Debug, Clone)]
pub struct PlaybackErrorReport {
    pub user_id: UserId,
    /// Raw session id from the client; may be blank.
    pub session_id: String,
    /// When present, the repair is skipped unless it matches the session's
    /// active track (guards against stale client reports).
    pub track_id: Option<TrackId>,
    pub source_type: SourceType,
}

/// Single-slot plus one-queued-follow-up repair scheduling, keyed by session.
#[derive(Clone)]
pub struct RepairScheduler {
    sessions: Arc<dyn SessionStore>,
    tracks: Arc<dyn TrackStore>,
    engine: Arc<dyn BuildEngine>,
    inflight: InflightMap<()>,
    queued: Arc<Mutex<HashSet<String>>>,
}

impl RepairScheduler {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        tracks: Arc<dyn TrackStore>,
        engine: Arc<dyn BuildEngine>,
    ) -> Self {
        Self {
            sessions,
            tracks,
            engine,
            inflight: InflightMap::new(),
            queued: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a repair is currently executing for this session.
    #[must_use]
    pub fn has_active_repair(&self, session_id: &str) -> bool {
        self.inflight.contains(session_id.trim())
    }

    /// Schedule a repair for a reported playback error. Never blocks and
    /// never fails; the repair itself runs on a spawned task.
    pub fn schedule_playback_error_repair(&self, report: PlaybackErrorReport) {
        let key = report.session_id.trim().to_string();
        if key.is_empty() {
            return;
        }
        if report.source_type != SourceType::Local {
            trace!(session_id = %key, "skipping repair for non-local source");
            return;
        }

        if let Some(active) = self.inflight.join_existing(&key) {
            // Busy: queue exactly one follow-up to run when the active
            // repair settles; drop anything beyond that.
            if self.queued.lock().insert(key.clone()) {
                debug!(session_id = %key, "repair in flight, queueing one follow-up");
                let scheduler = self.clone();
                tokio::spawn(async move {
                    let _ = active.await;
                    scheduler.queued.lock().remove(&key);
                    let run = scheduler.inflight.start(&key, {
                        let scheduler = scheduler.clone();
                        move || scheduler.repair_future(report)
                    });
                    let _ = run.await;
                });
            } else {
                trace!(session_id = %key, "repair already queued, dropping report");
            }
            return;
        }

        let run = self.inflight.start(&key, {
            let scheduler = self.clone();
            move || scheduler.repair_future(report)
        });
        tokio::spawn(async move {
            let _ = run.await;
        });
    }

    fn repair_future(
        self,
        report: PlaybackErrorReport,
    ) -> impl std::future::Future<Output = StreamResult<()>> + Send + 'static {
        async move {
            self.repair_playback_error_session_cache(&report).await;
            Ok(())
        }
    }

    /// Force-regenerate the session's assets. All errors end here.
    async fn repair_playback_error_session_cache(&self, report: &PlaybackErrorReport) {
        let session_id = SessionId::new(report.session_id.trim());
        let Some(session) = self.sessions.get(&session_id).await else {
            debug!(session_id = %session_id, "repair skipped, session gone");
            return;
        };
        if session.user_id != report.user_id {
            debug!(session_id = %session_id, "repair skipped, session owned by another user");
            return;
        }
        if let Some(track_id) = &report.track_id {
            if *track_id != session.track_id {
                debug!(
                    session_id = %session_id,
                    reported_track = %track_id,
                    active_track = %session.track_id,
                    "repair skipped, stale track reference"
                );
                return;
            }
        }
        let Some(source) = self.tracks.find_track_source(&session.track_id).await else {
            debug!(track_id = %session.track_id, "repair skipped, track source unavailable");
            return;
        };

        debug!(
            session_id = %session_id,
            track_id = %session.track_id,
            "forcing segment regeneration after playback error"
        );
        let request = DashBuildRequest {
            track_id: session.track_id.clone(),
            source_path: source.file_path,
            source_modified: source.file_modified,
            quality: session.quality.clone(),
            manifest_profile: session.manifest_profile.clone(),
        };
        if let Err(err) = self.engine.force_regenerate_dash_segments(request).await {
            warn!(
                session_id = %session_id,
                error = %err,
                "forced segment regeneration failed"
            );
        }
    }
}
