#![forbid(unsafe_code)]

//! # cadenza-engine
//!
//! Contracts for the collaborators the session/readiness core depends on but
//! does not own:
//!
//! - [`BuildEngine`] — the out-of-process transcode/segmentation engine,
//!   including its local and *distributed* (cross-pod) in-flight signals;
//! - [`TrackStore`] — track source metadata and per-user quality preference;
//! - [`SessionStore`] — TTL'd persistence of [`Session`](cadenza_core::Session)
//!   records;
//! - [`EvictionTracker`] — "this session is using this cache key" reference
//!   bookkeeping;
//! - [`ManifestAssetProvider`] — the thin wrapper that resolves a build
//!   request into cache key, output directory and manifest path by delegating
//!   to the build engine.
//!
//! The core stays ignorant of how cross-pod mutual exclusion is implemented;
//! it only consumes the boolean [`BuildInFlightStatus`] contract.

mod build;
mod provider;
mod stores;

pub use build::{
    BuildEngine, BuildFailure, BuildInFlightStatus, DashBuildRequest, EngineError, EngineResult,
    EnsuredAsset,
};
pub use provider::{EnsureRequest, ManifestAssetProvider};
pub use stores::{EvictionTracker, SessionStore, TrackSource, TrackStore};
