#![forbid(unsafe_code)]

//! # cadenza-manifest
//!
//! Pure DASH manifest (MPD) handling for readiness checks:
//!
//! - [`parse_manifest_timeline`] extracts per-representation segment-timeline
//!   counts from manifest XML — stateless, no I/O, separately testable from
//!   the polling loop that consumes it;
//! - [`required_rep_indices`] maps a manifest profile to the representations
//!   whose startup window must be ready before playback can begin;
//! - segment file naming ([`init_segment_name`], [`chunk_segment_name`]) and
//!   request-path validation ([`parse_segment_name`], [`validate_segment_name`]).
//!
//! Manifest *generation* is out of scope; only the shape needed to decide
//! readiness is modeled here.

mod error;
mod naming;
mod timeline;

pub use error::{ManifestError, ManifestResult};
pub use naming::{
    chunk_segment_name, init_segment_name, parse_segment_name, startup_chunk_names,
    validate_segment_name, ParsedSegment, SegmentExt, SegmentKind, STARTUP_WINDOW_CHUNKS,
};
pub use timeline::{parse_manifest_timeline, required_rep_indices, ManifestTimeline, RepTimeline};
