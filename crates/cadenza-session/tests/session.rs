#![forbid(unsafe_code)]

//! Session manager integration tests: creation, authorization, heartbeats
//! and token continuity.

use std::{sync::Arc, time::Duration};

use cadenza_core::{Codec, Quality, SessionId, StreamError, TrackId, UserId};
use cadenza_engine::{BuildEngine, ManifestAssetProvider, SessionStore};
use cadenza_session::{
    HeartbeatUpdate, SessionManager, SessionOptions, TokenCheckOptions, TokenClaims,
};
use cadenza_test_utils::{
    CountingEvictionTracker, MemorySessionStore, MemoryTrackStore, ScriptedBuildEngine,
};
use chrono::{TimeZone, Utc};
use rstest::rstest;
use tempfile::TempDir;

struct Harness {
    _root: TempDir,
    engine: Arc<ScriptedBuildEngine>,
    tracks: Arc<MemoryTrackStore>,
    sessions: Arc<MemorySessionStore>,
    evictions: Arc<CountingEvictionTracker>,
    manager: SessionManager,
}

fn harness() -> Harness {
    let root = TempDir::new().expect("tempdir");
    let engine = ScriptedBuildEngine::new(root.path());
    let tracks = Arc::new(MemoryTrackStore::default());
    let sessions = Arc::new(MemorySessionStore::default());
    let evictions = Arc::new(CountingEvictionTracker::default());

    tracks.insert_source(
        &TrackId::new("track-1"),
        &root.path().join("song.flac"),
        Utc::now(),
    );
    tracks.insert_source(
        &TrackId::new("track-2"),
        &root.path().join("song.mp3"),
        Utc::now(),
    );

    let provider = ManifestAssetProvider::new(
        Arc::clone(&engine) as Arc<dyn BuildEngine>,
        Arc::clone(&tracks) as Arc<_>,
    );
    let manager = SessionManager::new(
        Arc::clone(&sessions) as Arc<_>,
        Arc::clone(&tracks) as Arc<_>,
        Arc::clone(&evictions) as Arc<_>,
        provider,
        b"test-secret".to_vec(),
        SessionOptions::default(),
    );
    Harness {
        _root: root,
        engine,
        tracks,
        sessions,
        evictions,
        manager,
    }
}

fn user() -> UserId {
    UserId::new("user-1")
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn lossless_original_session_passes_through() {
    let h = harness();
    h.engine.set_local_in_flight(true);

    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();

    assert_eq!(created.playback_profile.codec, Codec::LosslessPassthrough);
    assert_eq!(created.playback_profile.bitrate_kbps, None);
    assert!(created.engine_hints.asset_build_in_flight);
    assert_eq!(created.engine_hints.recommended_engine, "dash");
    assert!(created.session.quality.is_original());

    // Reference registered for eviction bookkeeping, record persisted.
    assert_eq!(
        h.evictions.registered(),
        vec![(created.session.session_id.clone(), created.session.cache_key.clone())]
    );
    assert_eq!(h.sessions.len(), 1);

    // The minted token validates against its own session.
    h.manager
        .validate_session_token(
            &created.session,
            &created.session_token,
            TokenCheckOptions::default(),
        )
        .unwrap();
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn quality_falls_back_to_the_user_preference() {
    let h = harness();
    h.tracks.set_preferred_quality(&user(), Quality::new("high"));

    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();

    // Lossless source, but not at original quality: transcoded.
    assert_eq!(created.session.quality, Quality::new("high"));
    assert_eq!(created.playback_profile.codec, Codec::Aac);
    assert_eq!(created.playback_profile.bitrate_kbps, Some(320));
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn explicit_quality_wins_over_the_preference() {
    let h = harness();
    h.tracks.set_preferred_quality(&user(), Quality::new("high"));

    let created = h
        .manager
        .create_local_session(
            &user(),
            &TrackId::new("track-1"),
            Some(Quality::original()),
        )
        .await
        .unwrap();
    assert!(created.session.quality.is_original());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn missing_track_fails_closed() {
    let h = harness();
    let err = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-404"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::TrackNotFound(_)));
    assert_eq!(err.status_code(), 404);
    assert!(h.sessions.is_empty());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn repeated_creation_yields_distinct_sessions_sharing_a_cache_key() {
    let h = harness();
    let track = TrackId::new("track-1");
    let a = h
        .manager
        .create_local_session(&user(), &track, None)
        .await
        .unwrap();
    let b = h
        .manager
        .create_local_session(&user(), &track, None)
        .await
        .unwrap();

    assert_ne!(a.session.session_id, b.session.session_id);
    assert_eq!(a.session.cache_key, b.session.cache_key);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn authorized_lookup_enforces_ownership() {
    let h = harness();
    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();
    let sid = &created.session.session_id;

    assert!(h.manager.get_authorized_session(sid, &user()).await.is_some());
    assert!(h
        .manager
        .get_authorized_session(sid, &UserId::new("user-2"))
        .await
        .is_none());
    assert!(h
        .manager
        .get_authorized_session(&SessionId::new("nope"), &user())
        .await
        .is_none());
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn heartbeat_extends_expiry_and_activity() {
    let h = harness();
    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();

    let refreshed = h
        .manager
        .heartbeat_session(
            &created.session.session_id,
            HeartbeatUpdate {
                position_sec: 12.5,
                is_playing: true,
            },
        )
        .await
        .unwrap();

    assert!(refreshed.expires_at >= created.session.expires_at);
    assert!(refreshed.last_activity >= created.session.last_activity);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn expired_token_is_rescued_by_session_continuity() {
    let h = harness();
    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();
    let session = created.session;

    // A token minted an hour ago that expired 10 minutes ago.
    let now = Utc::now().timestamp();
    let stale_token = h.manager.signer().mint(&TokenClaims {
        sid: session.session_id.as_str().to_string(),
        uid: session.user_id.as_str().to_string(),
        iat: now - 3600,
        exp: now - 600,
    });

    // Backdate the session's activity to before the mint: no continuity.
    let mut stale_session = session.clone();
    stale_session.last_activity = Utc.timestamp_opt(now - 7200, 0).unwrap();
    h.sessions.put(stale_session.clone()).await;
    let err = h
        .manager
        .validate_session_token(&stale_session, &stale_token, TokenCheckOptions::default())
        .unwrap_err();
    assert!(matches!(err, StreamError::TokenInvalid(_)));

    // Heartbeat after the mint time rescues the same token.
    let refreshed = h
        .manager
        .heartbeat_session(
            &session.session_id,
            HeartbeatUpdate {
                position_sec: 0.0,
                is_playing: false,
            },
        )
        .await
        .unwrap();
    h.manager
        .validate_session_token(&refreshed, &stale_token, TokenCheckOptions::default())
        .unwrap();
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn foreign_session_token_is_a_scope_mismatch_unless_overridden() {
    let h = harness();
    let a = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();
    let b = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-2"), None)
        .await
        .unwrap();

    let err = h
        .manager
        .validate_session_token(&a.session, &b.session_token, TokenCheckOptions::default())
        .unwrap_err();
    assert!(matches!(err, StreamError::TokenScopeMismatch));
    assert_eq!(err.code(), "STREAMING_SESSION_TOKEN_SCOPE_MISMATCH");

    // Explicit override for in-flight requests under a superseded session.
    h.manager
        .validate_session_token(
            &a.session,
            &b.session_token,
            TokenCheckOptions {
                allow_session_id_mismatch: true,
            },
        )
        .unwrap();
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn another_users_token_fails_closed_even_with_override() {
    let h = harness();
    let a = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();
    let other = h
        .manager
        .create_local_session(&UserId::new("user-2"), &TrackId::new("track-2"), None)
        .await
        .unwrap();

    let err = h
        .manager
        .validate_session_token(
            &a.session,
            &other.session_token,
            TokenCheckOptions {
                allow_session_id_mismatch: true,
            },
        )
        .unwrap_err();
    assert!(matches!(err, StreamError::TokenInvalid(_)));
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn malformed_tokens_are_invalid() {
    let h = harness();
    let created = h
        .manager
        .create_local_session(&user(), &TrackId::new("track-1"), None)
        .await
        .unwrap();

    let err = h
        .manager
        .validate_session_token(&created.session, "garbage", TokenCheckOptions::default())
        .unwrap_err();
    assert!(matches!(err, StreamError::TokenInvalid(_)));
    assert_eq!(err.code(), "STREAMING_SESSION_TOKEN_INVALID");
}
