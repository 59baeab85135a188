#![forbid(unsafe_code)]

//! # cadenza-core
//!
//! Shared data model for the playback session subsystem:
//!
//! - identifiers ([`SessionId`], [`UserId`], [`TrackId`], [`CacheKey`]) and
//!   rendition types ([`Quality`], [`ManifestProfile`], [`SourceType`]);
//! - the playback-profile derivation rule ([`PlaybackProfile`]) and the
//!   session-creation hints handed back to clients ([`EngineHints`]);
//! - the [`Session`] record itself;
//! - the error taxonomy exposed to the consuming HTTP layer ([`StreamError`]),
//!   where every variant carries a machine-readable code and an HTTP-style
//!   status;
//! - the generic in-flight coalescing primitive ([`InflightMap`]) used by the
//!   readiness and repair paths to merge concurrent identical operations.
//!
//! This crate performs no I/O.

mod coalesce;
mod errors;
mod ids;
mod profile;
mod session;

pub use coalesce::{InflightMap, SharedOp};
pub use errors::{StreamError, StreamResult};
pub use ids::{CacheKey, ManifestProfile, Quality, SessionId, TrackId, UserId};
pub use profile::{classify_source, Codec, EngineHints, PlaybackProfile, Protocol, SourceFormat, SourceType};
pub use session::Session;
