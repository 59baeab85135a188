#![forbid(unsafe_code)]

use std::{
    fmt::Write as _,
    fs,
    ops::RangeInclusive,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use cadenza_core::{
    CacheKey, ManifestProfile, Quality, Session, SessionId, SourceType, TrackId, UserId,
};
use cadenza_manifest::{chunk_segment_name, init_segment_name, SegmentExt};
use chrono::{Duration, Utc};

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// A local-source session rooted at `asset_dir`, with the same cache key the
/// scripted engine resolves for `track-1` at `original` quality.
#[must_use]
pub fn test_session(asset_dir: &Path) -> Session {
    let now = Utc::now();
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    Session {
        session_id: SessionId::new(format!("sess-{seq}")),
        user_id: UserId::new("user-1"),
        track_id: TrackId::new("track-1"),
        cache_key: CacheKey::new("audio:track-1:original"),
        quality: Quality::original(),
        source_type: SourceType::Local,
        manifest_profile: ManifestProfile::default(),
        manifest_path: asset_dir.join("manifest.mpd"),
        asset_dir: asset_dir.to_path_buf(),
        created_at: now,
        expires_at: now + Duration::hours(1),
        last_activity: now,
    }
}

/// Write a manifest declaring one representation per entry in
/// `segment_counts`, each with that many timeline entries.
pub fn write_manifest(dir: &Path, segment_counts: &[u64]) {
    fs::create_dir_all(dir).expect("create asset dir");
    let mut body = String::new();
    for (index, count) in segment_counts.iter().enumerate() {
        if *count == 0 {
            let _ = writeln!(body, r#"      <Representation id="{index}"/>"#);
            continue;
        }
        let _ = writeln!(
            body,
            r#"      <Representation id="{index}" bandwidth="320000">
        <SegmentTemplate initialization="init-{index}.m4s" media="chunk-{index}-$Number%05d$.m4s" startNumber="1">
          <SegmentTimeline>
            <S t="0" d="40000" r="{}"/>
          </SegmentTimeline>
        </SegmentTemplate>
      </Representation>"#,
            count - 1
        );
    }
    let xml = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static">
  <Period>
    <AdaptationSet contentType="audio">
{body}    </AdaptationSet>
  </Period>
</MPD>
"#
    );
    fs::write(dir.join("manifest.mpd"), xml).expect("write manifest");
}

pub fn write_init_segment(dir: &Path, rep_index: usize, ext: SegmentExt) {
    fs::create_dir_all(dir).expect("create asset dir");
    fs::write(dir.join(init_segment_name(rep_index, ext)), b"init").expect("write init segment");
}

pub fn write_chunks(dir: &Path, rep_index: usize, ext: SegmentExt, seqs: RangeInclusive<u32>) {
    fs::create_dir_all(dir).expect("create asset dir");
    for seq in seqs {
        fs::write(dir.join(chunk_segment_name(rep_index, seq, ext)), b"chunk")
            .expect("write chunk segment");
    }
}

/// Manifest + init + startup chunks for a single-representation asset.
pub fn write_ready_asset(dir: &Path) {
    write_manifest(dir, &[3]);
    write_init_segment(dir, 0, SegmentExt::M4s);
    write_chunks(dir, 0, SegmentExt::M4s, 1..=3);
}
