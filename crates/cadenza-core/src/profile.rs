#![forbid(unsafe_code)]

//! Playback-profile derivation.
//!
//! The codec decision is expressed as tagged variants over the source format
//! rather than extension string-matching at call sites; the extension set is
//! classified exactly once, here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Quality;

/// Container extensions that hold lossless audio and can be passed through
/// without transcoding.
const LOSSLESS_EXTENSIONS: [&str; 9] = [
    "flac", "wav", "aiff", "alac", "ape", "wv", "tta", "dff", "dsf",
];

/// Where the source file lives relative to this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Local,
    Remote,
}

/// Coarse classification of a source container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// A lossless container from [`LOSSLESS_EXTENSIONS`].
    Lossless,
    /// Anything else; always transcoded.
    Lossy,
}

/// Classify a source file by its extension (case-insensitive).
#[must_use]
pub fn classify_source(path: &Path) -> SourceFormat {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if LOSSLESS_EXTENSIONS.contains(&ext.as_str()) => SourceFormat::Lossless,
        _ => SourceFormat::Lossy,
    }
}

/// Delivery protocol. This subsystem only serves segmented DASH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Dash,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dash => "dash",
        }
    }
}

/// Output codec decision for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Segment the source as-is, no re-encode.
    LosslessPassthrough,
    /// Transcode to AAC.
    Aac,
}

/// Derived (never stored) playback profile for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackProfile {
    pub protocol: Protocol,
    pub source_type: SourceType,
    pub codec: Codec,
    /// `None` for lossless passthrough.
    pub bitrate_kbps: Option<u32>,
}

impl PlaybackProfile {
    pub const AAC_BITRATE_KBPS: u32 = 320;

    /// Derive the profile for a source file and requested quality.
    ///
    /// Lossless container + `original` quality yields passthrough; every
    /// other combination transcodes to AAC at 320kbps.
    #[must_use]
    pub fn derive(source_path: &Path, quality: &Quality, source_type: SourceType) -> Self {
        let (codec, bitrate_kbps) = match classify_source(source_path) {
            SourceFormat::Lossless if quality.is_original() => (Codec::LosslessPassthrough, None),
            _ => (Codec::Aac, Some(Self::AAC_BITRATE_KBPS)),
        };
        Self {
            protocol: Protocol::Dash,
            source_type,
            codec,
            bitrate_kbps,
        }
    }
}

/// Derived (never stored) hints handed back to the client at session creation.
/// Outbound only, hence serialize-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineHints {
    pub protocol: Protocol,
    pub source_type: SourceType,
    /// Which client-side engine should consume this session.
    pub recommended_engine: &'static str,
    /// True if either the local build tracker or the distributed lock reported
    /// an active build for the session's cache key at creation time.
    pub asset_build_in_flight: bool,
}
