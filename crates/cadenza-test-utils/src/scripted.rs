#![forbid(unsafe_code)]

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use cadenza_core::{CacheKey, TrackId};
use cadenza_engine::{
    BuildEngine, BuildFailure, BuildInFlightStatus, DashBuildRequest, EngineResult, EnsuredAsset,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

#[derive(Default)]
struct EngineState {
    local: bool,
    distributed: bool,
    failure: Option<BuildFailure>,
    invalid: bool,
    ensure_calls: u32,
    regenerate_calls: u32,
    failure_checks: u32,
    regenerated: Vec<DashBuildRequest>,
}

/// A build engine whose signals are set by the test script.
///
/// `ensure` resolves deterministic paths under `root` and never writes files;
/// tests deposit fixture files themselves. Forced regeneration can be gated
/// on a semaphore so tests can hold a repair open while scheduling more.
pub struct ScriptedBuildEngine {
    root: PathBuf,
    state: Mutex<EngineState>,
    regen_gate: Option<Arc<Semaphore>>,
}

impl ScriptedBuildEngine {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            state: Mutex::new(EngineState::default()),
            regen_gate: None,
        })
    }

    /// Forced regenerations block until a permit is added to `gate`.
    #[must_use]
    pub fn with_regen_gate(root: impl Into<PathBuf>, gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            state: Mutex::new(EngineState::default()),
            regen_gate: Some(gate),
        })
    }

    /// Directory `ensure` resolves for a track.
    #[must_use]
    pub fn asset_dir_for(&self, track_id: &TrackId) -> PathBuf {
        self.root.join(track_id.as_str())
    }

    pub fn set_local_in_flight(&self, value: bool) {
        self.state.lock().local = value;
    }

    pub fn set_distributed_in_flight(&self, value: bool) {
        self.state.lock().distributed = value;
    }

    pub fn set_failure(&self, message: &str) {
        self.state.lock().failure = Some(BuildFailure {
            message: message.to_string(),
        });
    }

    pub fn clear_failure(&self) {
        self.state.lock().failure = None;
    }

    pub fn set_cache_invalid(&self, value: bool) {
        self.state.lock().invalid = value;
    }

    #[must_use]
    pub fn ensure_calls(&self) -> u32 {
        self.state.lock().ensure_calls
    }

    #[must_use]
    pub fn regenerate_calls(&self) -> u32 {
        self.state.lock().regenerate_calls
    }

    /// How many poll iterations consulted the failure signal.
    #[must_use]
    pub fn failure_checks(&self) -> u32 {
        self.state.lock().failure_checks
    }

    #[must_use]
    pub fn regenerated(&self) -> Vec<DashBuildRequest> {
        self.state.lock().regenerated.clone()
    }
}

#[async_trait]
impl BuildEngine for ScriptedBuildEngine {
    async fn ensure_local_dash_segments(
        &self,
        request: &DashBuildRequest,
    ) -> EngineResult<EnsuredAsset> {
        self.state.lock().ensure_calls += 1;
        let output_dir = self.asset_dir_for(&request.track_id);
        Ok(EnsuredAsset {
            cache_key: CacheKey::new(format!(
                "audio:{}:{}",
                request.track_id, request.quality
            )),
            manifest_path: output_dir.join("manifest.mpd"),
            output_dir,
            quality: request.quality.clone(),
        })
    }

    async fn has_in_flight_build(&self, _cache_key: &CacheKey) -> bool {
        self.state.lock().local
    }

    async fn build_in_flight_status(&self, _cache_key: &CacheKey) -> BuildInFlightStatus {
        let state = self.state.lock();
        BuildInFlightStatus {
            local: state.local,
            distributed: state.distributed,
        }
    }

    async fn build_failure(&self, _cache_key: &CacheKey) -> Option<BuildFailure> {
        let mut state = self.state.lock();
        state.failure_checks += 1;
        state.failure.clone()
    }

    async fn is_cache_marked_invalid(&self, _cache_key: &CacheKey) -> bool {
        self.state.lock().invalid
    }

    async fn force_regenerate_dash_segments(&self, request: DashBuildRequest) -> EngineResult<()> {
        {
            let mut state = self.state.lock();
            state.regenerate_calls += 1;
            state.regenerated.push(request);
        }
        if let Some(gate) = &self.regen_gate {
            // Consume the permit so each regeneration needs its own release.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        Ok(())
    }
}
