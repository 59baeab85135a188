#![forbid(unsafe_code)]

use std::sync::Arc;

use cadenza_core::{ManifestProfile, Quality, TrackId};
use tracing::debug;

use crate::{
    build::{BuildEngine, DashBuildRequest, EngineError, EngineResult, EnsuredAsset},
    stores::TrackStore,
};

/// A build request before source resolution: what the session layer and the
/// readiness self-heal path know about.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsureRequest {
    pub track_id: TrackId,
    pub quality: Quality,
    pub manifest_profile: ManifestProfile,
}

/// Thin wrapper over the build engine: resolves a track reference into an
/// explicit source-backed build request and delegates.
#[derive(Clone)]
pub struct ManifestAssetProvider {
    engine: Arc<dyn BuildEngine>,
    tracks: Arc<dyn TrackStore>,
}

impl ManifestAssetProvider {
    #[must_use]
    pub fn new(engine: Arc<dyn BuildEngine>, tracks: Arc<dyn TrackStore>) -> Self {
        Self { engine, tracks }
    }

    /// The underlying build engine, for status queries.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn BuildEngine> {
        &self.engine
    }

    /// Resolve the track's current source metadata and ensure assets exist
    /// (or a build is under way) for it.
    pub async fn ensure(&self, request: &EnsureRequest) -> EngineResult<EnsuredAsset> {
        let source = self
            .tracks
            .find_track_source(&request.track_id)
            .await
            .ok_or_else(|| EngineError::SourceUnavailable(request.track_id.clone()))?;

        debug!(
            track_id = %request.track_id,
            quality = %request.quality,
            source_path = %source.file_path.display(),
            "ensuring dash segments"
        );

        let build = DashBuildRequest {
            track_id: request.track_id.clone(),
            source_path: source.file_path,
            source_modified: source.file_modified,
            quality: request.quality.clone(),
            manifest_profile: request.manifest_profile.clone(),
        };
        self.engine.ensure_local_dash_segments(&build).await
    }
}
