#![forbid(unsafe_code)]

//! # cadenza-readiness
//!
//! Decides, under concurrent and multi-process load, when a session's built
//! assets are actually safe to serve:
//!
//! - [`ReadinessEngine::wait_for_manifest_ready`] polls until the manifest
//!   parses and every required representation has its startup window (init
//!   segment + first three chunks) on disk, bounded by an absolute deadline;
//! - [`ReadinessEngine::wait_for_segment_ready`] does the same for a single
//!   segment file, fronted by a short-TTL microcache;
//! - [`ReadinessEngine::resolve_segment_path`] is the pure path join used to
//!   serve already-known-ready files.
//!
//! Polling defers to builds running on *other* pods (distributed in-flight
//! signal, shared-storage assumption), short-circuits on recorded terminal
//! build failures, and self-heals — re-requests asset creation — when files
//! are missing and nothing is building anywhere.
//!
//! Manifest readiness is intentionally never cached across calls (manifests
//! legitimately grow between calls); only segment checks use the microcache.

mod engine;
mod microcache;
mod options;

pub use engine::ReadinessEngine;
pub use options::ReadinessOptions;
