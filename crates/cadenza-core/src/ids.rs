#![forbid(unsafe_code)]

//! Identifier newtypes shared across the subsystem.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new<S: Into<String>>(value: S) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Identifies one playback attempt. Unique per session-creation call; two
    /// calls for the same track produce two distinct sessions.
    SessionId
}

string_id! {
    /// Owner of a session.
    UserId
}

string_id! {
    /// A track in the media library.
    TrackId
}

string_id! {
    /// Identifies the underlying built asset. Multiple sessions may share one
    /// cache key; the build engine resolves it from (track, quality, profile).
    CacheKey
}

/// Requested or resolved rendition tier, stored lowercase.
///
/// Only `"original"` carries special semantics (lossless passthrough when the
/// source container allows it); other tiers are opaque to this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quality(pub String);

impl Quality {
    pub const ORIGINAL: &'static str = "original";

    #[must_use]
    pub fn new<S: Into<String>>(tier: S) -> Self {
        Self(tier.into().to_ascii_lowercase())
    }

    /// The lossless-passthrough tier.
    #[must_use]
    pub fn original() -> Self {
        Self(Self::ORIGINAL.to_string())
    }

    #[must_use]
    pub fn is_original(&self) -> bool {
        self.0 == Self::ORIGINAL
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named manifest-shape policy.
///
/// `startup_single` manifests reference exactly one representation for
/// startup; readiness checks must never block on any other representation the
/// manifest document happens to contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestProfile(pub String);

impl ManifestProfile {
    pub const STARTUP_SINGLE: &'static str = "startup_single";

    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ManifestProfile {
    fn default() -> Self {
        Self(Self::STARTUP_SINGLE.to_string())
    }
}

impl fmt::Display for ManifestProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
