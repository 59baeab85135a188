#![forbid(unsafe_code)]

//! Repair-scheduler integration tests: single-slot + one-queued coalescing
//! and the best-effort no-op guards.

use std::{sync::Arc, time::Duration};

use cadenza_core::{SourceType, TrackId, UserId};
use cadenza_engine::{BuildEngine, SessionStore, TrackStore};
use cadenza_session::{PlaybackErrorReport, RepairScheduler};
use cadenza_test_utils::{test_session, MemorySessionStore, MemoryTrackStore, ScriptedBuildEngine};
use chrono::Utc;
use rstest::rstest;
use tempfile::TempDir;
use tokio::sync::Semaphore;

struct Harness {
    _root: TempDir,
    engine: Arc<ScriptedBuildEngine>,
    tracks: Arc<MemoryTrackStore>,
    sessions: Arc<MemorySessionStore>,
    scheduler: RepairScheduler,
}

fn harness(gate: Option<Arc<Semaphore>>) -> Harness {
    let root = TempDir::new().expect("tempdir");
    let engine = match gate {
        Some(gate) => ScriptedBuildEngine::with_regen_gate(root.path(), gate),
        None => ScriptedBuildEngine::new(root.path()),
    };
    let tracks = Arc::new(MemoryTrackStore::default());
    let sessions = Arc::new(MemorySessionStore::default());
    tracks.insert_source(
        &TrackId::new("track-1"),
        &root.path().join("song.flac"),
        Utc::now(),
    );
    let scheduler = RepairScheduler::new(
        Arc::clone(&sessions) as Arc<dyn SessionStore>,
        Arc::clone(&tracks) as Arc<dyn TrackStore>,
        Arc::clone(&engine) as Arc<dyn BuildEngine>,
    );
    Harness {
        _root: root,
        engine,
        tracks,
        sessions,
        scheduler,
    }
}

async fn seeded_session(h: &Harness) -> cadenza_core::Session {
    let session = test_session(&h.engine.asset_dir_for(&TrackId::new("track-1")));
    h.sessions.put(session.clone()).await;
    session
}

fn report(session_id: &str) -> PlaybackErrorReport {
    PlaybackErrorReport {
        user_id: UserId::new("user-1"),
        session_id: session_id.to_string(),
        track_id: None,
        source_type: SourceType::Local,
    }
}

/// Poll until `check` holds, or panic after two seconds.
async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[rstest]
#[timeout(Duration::from_secs(10))]
#[tokio::test]
async fn three_reports_coalesce_to_two_repairs_then_a_fresh_one() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(Some(Arc::clone(&gate)));
    let session = seeded_session(&h).await;
    let sid = session.session_id.as_str();

    // Three rapid reports: one active repair, one queued follow-up, one drop.
    h.scheduler.schedule_playback_error_repair(report(sid));
    h.scheduler.schedule_playback_error_repair(report(sid));
    h.scheduler.schedule_playback_error_repair(report(sid));

    wait_until(|| h.engine.regenerate_calls() == 1).await;
    // Still blocked on the gate; nothing else may start.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.regenerate_calls(), 1);

    gate.add_permits(1);
    wait_until(|| h.engine.regenerate_calls() == 2).await;
    gate.add_permits(1);
    wait_until(|| !h.scheduler.has_active_repair(sid)).await;
    assert_eq!(h.engine.regenerate_calls(), 2);

    // Both settled: a fourth report starts a fresh repair.
    h.scheduler.schedule_playback_error_repair(report(sid));
    gate.add_permits(1);
    wait_until(|| h.engine.regenerate_calls() == 3).await;
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn blank_session_id_and_remote_sources_are_noops() {
    let h = harness(None);
    seeded_session(&h).await;

    h.scheduler.schedule_playback_error_repair(report("   "));
    let mut remote = report("sess-remote");
    remote.source_type = SourceType::Remote;
    h.scheduler.schedule_playback_error_repair(remote);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.engine.regenerate_calls(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn stale_track_reference_skips_regeneration() {
    let h = harness(None);
    let session = seeded_session(&h).await;

    let mut stale = report(session.session_id.as_str());
    stale.track_id = Some(TrackId::new("track-2"));
    h.scheduler.schedule_playback_error_repair(stale);

    wait_until(|| !h.scheduler.has_active_repair(session.session_id.as_str())).await;
    assert_eq!(h.engine.regenerate_calls(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn missing_session_or_source_is_swallowed() {
    let h = harness(None);
    let session = seeded_session(&h).await;

    // Unknown session: no repair.
    h.scheduler
        .schedule_playback_error_repair(report("sess-unknown"));
    wait_until(|| !h.scheduler.has_active_repair("sess-unknown")).await;
    assert_eq!(h.engine.regenerate_calls(), 0);

    // Known session whose source vanished: looked up, then skipped.
    h.tracks.remove_source(&session.track_id);
    h.scheduler
        .schedule_playback_error_repair(report(session.session_id.as_str()));
    wait_until(|| !h.scheduler.has_active_repair(session.session_id.as_str())).await;
    assert_eq!(h.engine.regenerate_calls(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn foreign_owner_report_is_skipped() {
    let h = harness(None);
    let session = seeded_session(&h).await;

    let mut foreign = report(session.session_id.as_str());
    foreign.user_id = UserId::new("user-2");
    h.scheduler.schedule_playback_error_repair(foreign);

    wait_until(|| !h.scheduler.has_active_repair(session.session_id.as_str())).await;
    assert_eq!(h.engine.regenerate_calls(), 0);
}

#[rstest]
#[timeout(Duration::from_secs(5))]
#[tokio::test]
async fn repair_carries_the_sessions_quality_and_profile() {
    let h = harness(None);
    let session = seeded_session(&h).await;

    h.scheduler
        .schedule_playback_error_repair(report(session.session_id.as_str()));
    wait_until(|| h.engine.regenerate_calls() == 1).await;

    let regenerated = h.engine.regenerated();
    assert_eq!(regenerated.len(), 1);
    assert_eq!(regenerated[0].track_id, session.track_id);
    assert_eq!(regenerated[0].quality, session.quality);
    assert_eq!(regenerated[0].manifest_profile, session.manifest_profile);
}
