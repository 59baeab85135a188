#![forbid(unsafe_code)]

use std::{path::PathBuf, sync::Arc, time::Instant};

use cadenza_core::{InflightMap, Session, StreamError, StreamResult};
use cadenza_engine::{EnsureRequest, ManifestAssetProvider};
use cadenza_manifest::{
    init_segment_name, parse_manifest_timeline, required_rep_indices, startup_chunk_names,
    validate_segment_name, SegmentExt, STARTUP_WINDOW_CHUNKS,
};
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::{microcache::Microcache, options::ReadinessOptions};

/// Polls the filesystem and the build engine's signals until a session's
/// assets are servable, the deadline elapses, or a build failure is recorded.
///
/// Concurrent identical waits are coalesced: manifest waits by session id,
/// segment waits by `"{session_id}:{segment_name}"`. Sequential waits always
/// re-execute (manifest contents can legitimately change between calls).
pub struct ReadinessEngine {
    provider: ManifestAssetProvider,
    opts: ReadinessOptions,
    manifest_waits: InflightMap<PathBuf>,
    segment_waits: InflightMap<PathBuf>,
    microcache: Microcache,
}

impl ReadinessEngine {
    #[must_use]
    pub fn new(provider: ManifestAssetProvider, opts: ReadinessOptions) -> Self {
        let microcache = Microcache::new(opts.microcache_ttl);
        Self {
            provider,
            opts,
            manifest_waits: InflightMap::new(),
            segment_waits: InflightMap::new(),
            microcache,
        }
    }

    /// Block (cooperatively) until the manifest parses and every required
    /// representation's startup window is on disk, or `deadline` elapses.
    ///
    /// A recorded terminal build failure rejects immediately, bypassing the
    /// remaining deadline. A self-heal grants the startup-window phase a
    /// fresh full budget even when `deadline` is tight.
    pub async fn wait_for_manifest_ready(
        &self,
        session: &Session,
        deadline: Instant,
    ) -> StreamResult<()> {
        let task = WaitTask {
            provider: self.provider.clone(),
            opts: self.opts.clone(),
            session: session.clone(),
            target: WaitTarget::Manifest,
            deadline,
        };
        self.manifest_waits
            .coalesce(session.session_id.as_str(), move || task.run())
            .await
            .map(|_| ())
    }

    /// Same polling discipline scoped to one segment file; consults the
    /// segment readiness microcache first. Returns the resolved path.
    pub async fn wait_for_segment_ready(
        &self,
        session: &Session,
        segment_name: &str,
    ) -> StreamResult<PathBuf> {
        let path = self.resolve_segment_path(session, segment_name)?;
        let key = format!("{}:{}", session.session_id, segment_name);

        if self.microcache.hit(&key) {
            trace!(key = %key, "segment readiness microcache hit");
            return Ok(path);
        }

        let task = WaitTask {
            provider: self.provider.clone(),
            opts: self.opts.clone(),
            session: session.clone(),
            target: WaitTarget::Segment { path },
            deadline: Instant::now() + self.opts.segment_timeout,
        };
        let resolved = self.segment_waits.coalesce(&key, move || task.run()).await?;
        self.microcache.store(&key);
        Ok(resolved)
    }

    /// Pure path join under the session's asset directory. Accepts modern
    /// (`.m4s`) and legacy (`.webm`) segment names.
    pub fn resolve_segment_path(&self, session: &Session, name: &str) -> StreamResult<PathBuf> {
        if !validate_segment_name(name) {
            return Err(StreamError::InvalidSegmentName(name.to_string()));
        }
        Ok(session.asset_dir.join(name))
    }
}

enum WaitTarget {
    Manifest,
    Segment { path: PathBuf },
}

struct WaitTask {
    provider: ManifestAssetProvider,
    opts: ReadinessOptions,
    session: Session,
    target: WaitTarget,
    deadline: Instant,
}

impl WaitTask {
    async fn run(self) -> StreamResult<PathBuf> {
        let engine = Arc::clone(self.provider.engine());
        let started = Instant::now();
        let mut deadline = self.deadline;
        let mut healed = false;

        loop {
            // A terminal failure short-circuits the remaining deadline.
            if let Some(failure) = engine.build_failure(&self.session.cache_key).await {
                debug!(
                    session_id = %self.session.session_id,
                    cache_key = %self.session.cache_key,
                    "terminal build failure recorded for cache key"
                );
                return Err(StreamError::AssetBuildFailed {
                    message: failure.message,
                });
            }

            let target_path = self.target_path();
            let target_exists = fs::try_exists(&target_path).await.unwrap_or(false);

            if engine.is_cache_marked_invalid(&self.session.cache_key).await {
                // Existence wins over the invalidation flag once the artifact
                // is actually present.
                if target_exists {
                    trace!(
                        path = %target_path.display(),
                        "cache marked invalid but artifact present, serving"
                    );
                    return Ok(target_path);
                }
            } else if target_exists && self.target_ready().await {
                return Ok(target_path);
            }

            let status = engine.build_in_flight_status(&self.session.cache_key).await;
            if status.distributed {
                // Another pod is building this key; its files will appear on
                // shared storage. No track lookups, no self-heal.
                trace!(
                    session_id = %self.session.session_id,
                    cache_key = %self.session.cache_key,
                    "distributed build in flight, waiting"
                );
            } else if !status.local && !healed {
                healed = true;
                self.self_heal().await;
                // The startup-window phase gets its own full budget after the
                // self-heal call returns; the caller's budget never shrinks.
                deadline = deadline.max(Instant::now() + self.opts.startup_window_timeout);
                continue;
            }

            if Instant::now() >= deadline {
                let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Err(StreamError::AssetNotReady { waited_ms });
            }
            tokio::time::sleep(self.opts.poll_interval).await;
        }
    }

    fn target_path(&self) -> PathBuf {
        match &self.target {
            WaitTarget::Manifest => self.session.manifest_path.clone(),
            WaitTarget::Segment { path } => path.clone(),
        }
    }

    async fn target_ready(&self) -> bool {
        match &self.target {
            // Segment existence was already established by the caller.
            WaitTarget::Segment { .. } => true,
            WaitTarget::Manifest => self.startup_window_ready().await,
        }
    }

    /// Re-read and re-parse the manifest (never cached between polls) and
    /// check the startup window of every required representation.
    async fn startup_window_ready(&self) -> bool {
        let xml = match fs::read_to_string(&self.session.manifest_path).await {
            Ok(xml) => xml,
            Err(err) => {
                trace!(error = %err, "manifest not readable yet");
                return false;
            }
        };
        let timeline = match parse_manifest_timeline(&xml) {
            Ok(timeline) => timeline,
            Err(err) => {
                trace!(error = %err, "manifest does not parse yet");
                return false;
            }
        };

        for rep_index in required_rep_indices(&self.session.manifest_profile, &timeline) {
            let Some(rep) = timeline.representation(rep_index) else {
                trace!(rep_index, "required representation missing from manifest");
                return false;
            };
            if rep.segment_count < u64::from(STARTUP_WINDOW_CHUNKS) {
                trace!(
                    rep_index,
                    segment_count = rep.segment_count,
                    "timeline shorter than startup window"
                );
                return false;
            }
            let Some(ext) = self.probe_init_ext(rep_index).await else {
                trace!(rep_index, "init segment missing");
                return false;
            };
            for chunk in startup_chunk_names(rep_index, ext) {
                let path = self.session.asset_dir.join(&chunk);
                if !fs::try_exists(&path).await.unwrap_or(false) {
                    trace!(chunk = %chunk, "startup chunk missing");
                    return false;
                }
            }
        }
        true
    }

    async fn probe_init_ext(&self, rep_index: usize) -> Option<SegmentExt> {
        for ext in SegmentExt::ALL {
            let path = self.session.asset_dir.join(init_segment_name(rep_index, ext));
            if fs::try_exists(&path).await.unwrap_or(false) {
                return Some(ext);
            }
        }
        None
    }

    /// Best-effort: failures here must never fail the wait.
    async fn self_heal(&self) {
        debug!(
            session_id = %self.session.session_id,
            track_id = %self.session.track_id,
            "asset missing with no build in flight, re-requesting build"
        );
        let request = EnsureRequest {
            track_id: self.session.track_id.clone(),
            quality: self.session.quality.clone(),
            manifest_profile: self.session.manifest_profile.clone(),
        };
        if let Err(err) = self.provider.ensure(&request).await {
            warn!(
                session_id = %self.session.session_id,
                error = %err,
                "self-heal build request failed"
            );
        }
    }
}
