#![forbid(unsafe_code)]

//! Segment-timeline extraction from manifest XML.

use cadenza_core::ManifestProfile;
use quick_xml::{events::Event, Reader};

use crate::error::{ManifestError, ManifestResult};

/// Timeline summary for one `<Representation>`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepTimeline {
    /// The representation's `id` attribute; empty when absent.
    pub id: String,
    /// Zero-based document-order index; segment files embed this index.
    pub index: usize,
    /// Declared timeline entries, with `<S r="…">` repeats expanded.
    pub segment_count: u64,
}

/// Parsed view of a manifest, reduced to what readiness checks need.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestTimeline {
    pub representations: Vec<RepTimeline>,
}

impl ManifestTimeline {
    /// Timeline for a representation by document-order index.
    #[must_use]
    pub fn representation(&self, index: usize) -> Option<&RepTimeline> {
        self.representations.get(index)
    }
}

/// Parse the segment timelines out of manifest XML.
///
/// Walks `<Representation>` / `<SegmentTimeline>` / `<S>` events; everything
/// else in the document is ignored. An `<S>` entry with `r="N"` (N ≥ 0)
/// counts as `N + 1` segments; negative repeat counts ("repeat to end") are
/// counted as a single entry since the open-ended tail cannot gate startup.
pub fn parse_manifest_timeline(xml: &str) -> ManifestResult<ManifestTimeline> {
    let mut reader = Reader::from_str(xml);
    let mut timeline = ManifestTimeline::default();
    let mut current: Option<RepTimeline> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => match tag.local_name().as_ref() {
                b"Representation" => {
                    // Manifests do not nest representations; a dangling one
                    // (self-closing start seen as Start) is flushed first.
                    if let Some(rep) = current.take() {
                        timeline.representations.push(rep);
                    }
                    let id = tag
                        .try_get_attribute("id")
                        .map_err(|e| ManifestError::Attribute(e.to_string()))?
                        .map(|a| {
                            a.unescape_value()
                                .map(|v| v.into_owned())
                                .map_err(|e| ManifestError::Attribute(e.to_string()))
                        })
                        .transpose()?
                        .unwrap_or_default();
                    current = Some(RepTimeline {
                        id,
                        index: timeline.representations.len(),
                        segment_count: 0,
                    });
                }
                b"S" => {
                    if let Some(rep) = current.as_mut() {
                        let repeat = tag
                            .try_get_attribute("r")
                            .map_err(|e| ManifestError::Attribute(e.to_string()))?
                            .and_then(|a| a.unescape_value().ok())
                            .and_then(|v| v.parse::<i64>().ok())
                            .unwrap_or(0);
                        rep.segment_count += 1 + u64::try_from(repeat.max(0)).unwrap_or(0);
                    }
                }
                _ => {}
            },
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"Representation" => {
                if let Some(rep) = current.take() {
                    timeline.representations.push(rep);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ManifestError::Parse(e.to_string())),
        }
    }

    if let Some(rep) = current.take() {
        timeline.representations.push(rep);
    }
    Ok(timeline)
}

/// Representation indices whose startup window gates playback for `profile`.
///
/// The `startup_single` profile (and any unknown profile, which in this
/// subsystem can only ever select one representation) requires exactly the
/// first representation; further representations in the document, even with
/// partial or empty timelines, never block startup.
#[must_use]
pub fn required_rep_indices(_profile: &ManifestProfile, _timeline: &ManifestTimeline) -> Vec<usize> {
    vec![0]
}
