#![forbid(unsafe_code)]

use std::path::PathBuf;

use async_trait::async_trait;
use cadenza_core::{CacheKey, ManifestProfile, Quality, StreamError, TrackId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Build-engine side errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("track source unavailable: {0}")]
    SourceUnavailable(TrackId),

    #[error("build rejected: {0}")]
    Rejected(String),

    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<EngineError> for StreamError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::SourceUnavailable(track) => Self::TrackNotFound(track.0),
            other => Self::Engine(other.to_string()),
        }
    }
}

/// A request to produce (or locate) DASH assets for a source file.
///
/// Carries explicit source metadata so the engine can detect stale builds;
/// the same shape drives both `ensure` and forced regeneration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashBuildRequest {
    pub track_id: TrackId,
    pub source_path: PathBuf,
    pub source_modified: DateTime<Utc>,
    pub quality: Quality,
    pub manifest_profile: ManifestProfile,
}

/// Resolved location of a (possibly still building) asset.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsuredAsset {
    pub cache_key: CacheKey,
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// The quality the engine actually resolved the request to.
    pub quality: Quality,
}

/// Combined local + cross-pod build activity for a cache key.
///
/// Staleness of the distributed signal is tolerated by continuing to poll
/// rather than trusting it permanently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildInFlightStatus {
    /// A build task in this process.
    pub local: bool,
    /// The distributed lock reports some other pod is building this key.
    pub distributed: bool,
}

impl BuildInFlightStatus {
    #[must_use]
    pub fn in_flight(self) -> bool {
        self.local || self.distributed
    }
}

/// A terminal build failure recorded for a cache key.
///
/// Cleared only when the engine reports the failure superseded (e.g. after a
/// forced regeneration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub message: String,
}

/// The out-of-process transcode/segmentation engine, as seen by this core.
///
/// The engine writes init/chunk files and the manifest to shared storage;
/// this core never inspects how.
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Ensure assets exist (or a build is under way) for the request; returns
    /// the resolved cache key and on-disk locations.
    async fn ensure_local_dash_segments(
        &self,
        request: &DashBuildRequest,
    ) -> EngineResult<EnsuredAsset>;

    /// Whether a build for this cache key is in flight in *this* process.
    async fn has_in_flight_build(&self, cache_key: &CacheKey) -> bool;

    /// Combined local + distributed in-flight status for this cache key.
    async fn build_in_flight_status(&self, cache_key: &CacheKey) -> BuildInFlightStatus;

    /// Terminal build failure recorded for this cache key, if any.
    async fn build_failure(&self, cache_key: &CacheKey) -> Option<BuildFailure>;

    /// Whether the cache entry was explicitly invalidated.
    async fn is_cache_marked_invalid(&self, cache_key: &CacheKey) -> bool;

    /// Force a rebuild from explicit source metadata, discarding existing
    /// assets for the resolved cache key.
    async fn force_regenerate_dash_segments(&self, request: DashBuildRequest) -> EngineResult<()>;
}
