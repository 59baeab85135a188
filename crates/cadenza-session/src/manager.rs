#![forbid(unsafe_code)]

use std::sync::Arc;

use cadenza_core::{
    EngineHints, ManifestProfile, PlaybackProfile, Protocol, Quality, Session, SessionId,
    SourceType, StreamError, StreamResult, TrackId, UserId,
};
use cadenza_engine::{EnsureRequest, EvictionTracker, ManifestAssetProvider, SessionStore, TrackStore};
use chrono::Utc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    options::SessionOptions,
    repair::{PlaybackErrorReport, RepairScheduler},
    token::{TokenClaims, TokenSigner},
};

/// Everything a client needs to start playback.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: Session,
    pub session_token: String,
    pub playback_profile: PlaybackProfile,
    pub engine_hints: EngineHints,
}

/// Client-reported progress carried on a heartbeat.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatUpdate {
    pub position_sec: f64,
    pub is_playing: bool,
}

/// Knobs for token validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCheckOptions {
    /// Tolerate a token scoped to a different session id: used for in-flight
    /// media requests issued under a soon-to-be-superseded session.
    pub allow_session_id_mismatch: bool,
}

/// Creates sessions, mints/validates their tokens and owns the repair
/// scheduler.
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    tracks: Arc<dyn TrackStore>,
    evictions: Arc<dyn EvictionTracker>,
    provider: ManifestAssetProvider,
    signer: TokenSigner,
    opts: SessionOptions,
    repair: RepairScheduler,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        tracks: Arc<dyn TrackStore>,
        evictions: Arc<dyn EvictionTracker>,
        provider: ManifestAssetProvider,
        token_secret: impl Into<Vec<u8>>,
        opts: SessionOptions,
    ) -> Self {
        let repair = RepairScheduler::new(
            Arc::clone(&sessions),
            Arc::clone(&tracks),
            Arc::clone(provider.engine()),
        );
        Self {
            sessions,
            tracks,
            evictions,
            provider,
            signer: TokenSigner::new(token_secret),
            opts,
            repair,
        }
    }

    /// Create a playback session for a local-library track.
    ///
    /// Quality resolution: explicit request, then the user's stored
    /// preference, then `original`. The build engine's in-flight status is
    /// captured into the hints *at creation time*; it is a snapshot, not a
    /// subscription.
    pub async fn create_local_session(
        &self,
        user_id: &UserId,
        track_id: &TrackId,
        desired_quality: Option<Quality>,
    ) -> StreamResult<CreatedSession> {
        let quality = match desired_quality {
            Some(quality) => quality,
            None => self
                .tracks
                .preferred_quality(user_id)
                .await
                .unwrap_or_else(Quality::original),
        };

        let source = self
            .tracks
            .find_track_source(track_id)
            .await
            .ok_or_else(|| StreamError::TrackNotFound(track_id.to_string()))?;
        let source_type = SourceType::Local;
        let playback_profile = PlaybackProfile::derive(&source.file_path, &quality, source_type);

        let ensured = self
            .provider
            .ensure(&EnsureRequest {
                track_id: track_id.clone(),
                quality: quality.clone(),
                manifest_profile: ManifestProfile::default(),
            })
            .await?;

        let status = self
            .provider
            .engine()
            .build_in_flight_status(&ensured.cache_key)
            .await;
        let engine_hints = EngineHints {
            protocol: Protocol::Dash,
            source_type,
            recommended_engine: "dash",
            asset_build_in_flight: status.in_flight(),
        };

        let now = Utc::now();
        let session = Session {
            session_id: SessionId::new(Uuid::new_v4().to_string()),
            user_id: user_id.clone(),
            track_id: track_id.clone(),
            cache_key: ensured.cache_key,
            quality: ensured.quality,
            source_type,
            manifest_profile: ManifestProfile::default(),
            manifest_path: ensured.manifest_path,
            asset_dir: ensured.output_dir,
            created_at: now,
            expires_at: now + self.opts.session_ttl,
            last_activity: now,
        };

        debug!(
            session_id = %session.session_id,
            track_id = %track_id,
            cache_key = %session.cache_key,
            build_in_flight = engine_hints.asset_build_in_flight,
            "created playback session"
        );

        self.evictions
            .register_session_reference(&session.session_id, &session.cache_key)
            .await;
        self.sessions.put(session.clone()).await;

        let claims = TokenClaims {
            sid: session.session_id.as_str().to_string(),
            uid: user_id.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.opts.token_ttl).timestamp(),
        };
        let session_token = self.signer.mint(&claims);

        Ok(CreatedSession {
            session,
            session_token,
            playback_profile,
            engine_hints,
        })
    }

    /// Look up a session, enforcing user ownership. Absent or foreign-owned
    /// sessions yield `None`, never an error.
    pub async fn get_authorized_session(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Option<Session> {
        let session = self.sessions.get(session_id).await?;
        (session.user_id == *user_id).then_some(session)
    }

    /// Refresh the session's expiry and activity marker. This is what makes
    /// token continuity meaningful: a heartbeated session keeps accepting
    /// its wall-clock-expired token.
    pub async fn heartbeat_session(
        &self,
        session_id: &SessionId,
        update: HeartbeatUpdate,
    ) -> Option<Session> {
        let mut session = self.sessions.get(session_id).await?;
        let now = Utc::now();
        session.expires_at = now + self.opts.session_ttl;
        session.last_activity = now;
        trace!(
            session_id = %session_id,
            position_sec = update.position_sec,
            is_playing = update.is_playing,
            "session heartbeat"
        );
        self.sessions.put(session.clone()).await;
        Some(session)
    }

    /// Validate a token against a session record.
    ///
    /// Signature or structural failures and user mismatches fail closed. A
    /// token scoped to a different session is a scope mismatch unless the
    /// caller opted in. Wall-clock expiry is forgiven while the session
    /// record itself has been heartbeated past the token's mint time.
    pub fn validate_session_token(
        &self,
        session: &Session,
        token: &str,
        opts: TokenCheckOptions,
    ) -> StreamResult<()> {
        let claims = self.signer.verify(token)?;

        if claims.uid != session.user_id.as_str() {
            return Err(StreamError::TokenInvalid(
                "token user does not match session owner".into(),
            ));
        }
        if claims.sid != session.session_id.as_str() && !opts.allow_session_id_mismatch {
            return Err(StreamError::TokenScopeMismatch);
        }

        let now = Utc::now().timestamp();
        if claims.exp >= now {
            return Ok(());
        }
        // Expired by wall clock: accept while the session record has been
        // kept alive by heartbeats since the token was minted.
        if session.last_activity.timestamp() > claims.iat {
            trace!(
                session_id = %session.session_id,
                "accepting wall-clock-expired token on session continuity"
            );
            return Ok(());
        }
        Err(StreamError::TokenInvalid("token expired".into()))
    }

    /// Fire-and-forget repair entry point for playback-error telemetry.
    pub fn schedule_playback_error_repair(&self, report: PlaybackErrorReport) {
        self.repair.schedule_playback_error_repair(report);
    }

    /// The token signer, for layers that mint elsewhere (tests, migrations).
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }
}
