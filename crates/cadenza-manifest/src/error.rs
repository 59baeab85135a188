#![forbid(unsafe_code)]

use thiserror::Error;

/// Manifest parsing errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest XML parse error: {0}")]
    Parse(String),

    #[error("manifest attribute error: {0}")]
    Attribute(String),
}

pub type ManifestResult<T> = Result<T, ManifestError>;
