#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors surfaced by the session / readiness subsystem.
///
/// Every variant maps to a machine-readable code and an HTTP-style status for
/// the consuming layer. Variants carry owned strings only so that a single
/// error produced by a coalesced operation can be observed by every joiner.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The readiness deadline elapsed before the asset became servable.
    /// Transient; callers should retry with backoff.
    #[error("streaming asset not ready after {waited_ms}ms")]
    AssetNotReady { waited_ms: u64 },

    /// The build engine recorded a terminal failure for the asset's cache key.
    #[error("streaming asset build failed: {message}")]
    AssetBuildFailed { message: String },

    /// Structural or signature failure while verifying a session token, or an
    /// expired token with no session continuity to fall back on.
    #[error("session token invalid: {0}")]
    TokenInvalid(String),

    /// The token is valid but scoped to a different session record.
    #[error("session token scoped to another session")]
    TokenScopeMismatch,

    /// No source metadata exists for the requested track.
    #[error("track source not found: {0}")]
    TrackNotFound(String),

    /// A segment filename that does not match the init/chunk naming contract.
    #[error("invalid segment name: {0}")]
    InvalidSegmentName(String),

    /// A collaborator (build engine) failed in a way the core cannot classify.
    #[error("build engine error: {0}")]
    Engine(String),
}

impl StreamError {
    /// Machine-readable error code for the consuming layer.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AssetNotReady { .. } => "STREAMING_ASSET_NOT_READY",
            Self::AssetBuildFailed { .. } => "STREAMING_ASSET_BUILD_FAILED",
            Self::TokenInvalid(_) => "STREAMING_SESSION_TOKEN_INVALID",
            Self::TokenScopeMismatch => "STREAMING_SESSION_TOKEN_SCOPE_MISMATCH",
            Self::TrackNotFound(_) => "STREAMING_TRACK_NOT_FOUND",
            Self::InvalidSegmentName(_) => "STREAMING_INVALID_SEGMENT_NAME",
            Self::Engine(_) => "STREAMING_ENGINE_ERROR",
        }
    }

    /// HTTP-style status for the consuming layer.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AssetNotReady { .. } => 503,
            Self::AssetBuildFailed { .. } => 502,
            Self::TokenInvalid(_) => 401,
            Self::TokenScopeMismatch => 403,
            Self::TrackNotFound(_) => 404,
            Self::InvalidSegmentName(_) => 400,
            Self::Engine(_) => 500,
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
