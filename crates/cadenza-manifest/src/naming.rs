#![forbid(unsafe_code)]

//! Segment file naming.
//!
//! On-disk layout contract for a built asset directory:
//! - init segments: `init-{rep}.{ext}`
//! - chunk segments: `chunk-{rep}-{seq:05}.{ext}`, 1-based sequence
//!
//! `ext` is `m4s` for modern builds; `webm` segments from older builds are
//! accepted without a protocol version bump. This module only derives and
//! validates names; it performs no I/O.

use std::fmt;

/// Segment container extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentExt {
    M4s,
    Webm,
}

impl SegmentExt {
    /// Probe order: modern extension first.
    pub const ALL: [Self; 2] = [Self::M4s, Self::Webm];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M4s => "m4s",
            Self::Webm => "webm",
        }
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "m4s" => Some(Self::M4s),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Segments a player needs buffered before playback can begin, in addition to
/// the init segment.
pub const STARTUP_WINDOW_CHUNKS: u32 = 3;

/// What a well-formed segment filename refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Init,
    Chunk {
        /// 1-based sequence number.
        seq: u32,
    },
}

/// A validated segment filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedSegment {
    pub kind: SegmentKind,
    pub rep_index: usize,
    pub ext: SegmentExt,
}

#[must_use]
pub fn init_segment_name(rep_index: usize, ext: SegmentExt) -> String {
    format!("init-{rep_index}.{ext}")
}

#[must_use]
pub fn chunk_segment_name(rep_index: usize, seq: u32, ext: SegmentExt) -> String {
    format!("chunk-{rep_index}-{seq:05}.{ext}")
}

/// Names of the startup-window chunks (sequences 1..=3) for a representation.
#[must_use]
pub fn startup_chunk_names(rep_index: usize, ext: SegmentExt) -> Vec<String> {
    (1..=STARTUP_WINDOW_CHUNKS)
        .map(|seq| chunk_segment_name(rep_index, seq, ext))
        .collect()
}

/// Parse a segment filename against the naming contract.
///
/// Rejects anything with path separators or parent references, unknown
/// extensions, and any stem that is not exactly `init-{rep}` or
/// `chunk-{rep}-{seq:05}`.
#[must_use]
pub fn parse_segment_name(name: &str) -> Option<ParsedSegment> {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return None;
    }
    let (stem, ext) = name.rsplit_once('.')?;
    let ext = SegmentExt::from_extension(ext)?;

    if let Some(rest) = stem.strip_prefix("init-") {
        let rep_index = parse_index(rest)?;
        return Some(ParsedSegment {
            kind: SegmentKind::Init,
            rep_index,
            ext,
        });
    }
    if let Some(rest) = stem.strip_prefix("chunk-") {
        let (rep, seq) = rest.split_once('-')?;
        let rep_index = parse_index(rep)?;
        if seq.len() != 5 || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let seq: u32 = seq.parse().ok()?;
        return Some(ParsedSegment {
            kind: SegmentKind::Chunk { seq },
            rep_index,
            ext,
        });
    }
    None
}

/// Whether `name` is a servable segment filename.
#[must_use]
pub fn validate_segment_name(name: &str) -> bool {
    parse_segment_name(name).is_some()
}

fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("init-0.m4s", SegmentKind::Init, 0, SegmentExt::M4s)]
    #[case("init-2.webm", SegmentKind::Init, 2, SegmentExt::Webm)]
    #[case("chunk-0-00001.m4s", SegmentKind::Chunk { seq: 1 }, 0, SegmentExt::M4s)]
    #[case("chunk-0-00001.webm", SegmentKind::Chunk { seq: 1 }, 0, SegmentExt::Webm)]
    #[case("chunk-1-00042.m4s", SegmentKind::Chunk { seq: 42 }, 1, SegmentExt::M4s)]
    fn accepts_contract_names(
        #[case] name: &str,
        #[case] kind: SegmentKind,
        #[case] rep_index: usize,
        #[case] ext: SegmentExt,
    ) {
        let parsed = parse_segment_name(name).unwrap();
        assert_eq!(parsed.kind, kind);
        assert_eq!(parsed.rep_index, rep_index);
        assert_eq!(parsed.ext, ext);
    }

    #[rstest]
    #[case("../init-0.m4s")]
    #[case("a/chunk-0-00001.m4s")]
    #[case("chunk-0-00001.mp4")]
    #[case("chunk-0-1.m4s")]
    #[case("chunk-0-000001.m4s")]
    #[case("chunk--00001.m4s")]
    #[case("init-x.m4s")]
    #[case("manifest.mpd")]
    #[case("")]
    fn rejects_foreign_names(#[case] name: &str) {
        assert!(parse_segment_name(name).is_none());
        assert!(!validate_segment_name(name));
    }

    #[test]
    fn naming_round_trips() {
        assert_eq!(init_segment_name(1, SegmentExt::M4s), "init-1.m4s");
        assert_eq!(chunk_segment_name(0, 3, SegmentExt::Webm), "chunk-0-00003.webm");
        assert_eq!(
            startup_chunk_names(0, SegmentExt::M4s),
            vec!["chunk-0-00001.m4s", "chunk-0-00002.m4s", "chunk-0-00003.m4s"]
        );
    }
}
