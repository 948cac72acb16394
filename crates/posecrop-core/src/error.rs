//! Errors returned by the crop pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::camera::GeometryError;
use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::mask::MaskError;

/// Error type for [`make_efficient_example`](crate::make_efficient_example).
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// The source image does not exist. Always fatal.
    #[error("Source image not found: {}", path.display())]
    MissingSourceImage { path: PathBuf },

    /// The source image exists but cannot be decoded.
    #[error("Failed to decode source image {}: {source}", path.display())]
    CorruptSourceImage {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// Camera geometry is degenerate for this example.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// The example's mask could not be reprojected.
    #[error("Mask error: {0}")]
    Mask(#[from] MaskError),

    /// The cropped image could not be written.
    #[error("Failed to write cropped image: {0}")]
    Encode(#[from] EncodeError),
}

impl PreprocessError {
    /// Classify a read failure of the source image at `path`.
    pub(crate) fn from_source(path: impl Into<PathBuf>, source: DecodeError) -> Self {
        let path = path.into();
        if source.is_not_found() {
            PreprocessError::MissingSourceImage { path }
        } else {
            PreprocessError::CorruptSourceImage { path, source }
        }
    }

    /// Whether the `ignore_broken_image` option may turn this error into a skip.
    pub fn is_broken_image(&self) -> bool {
        matches!(self, PreprocessError::CorruptSourceImage { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_broken() {
        let err = PreprocessError::from_source("a.jpg", DecodeError::NotFound("a.jpg".into()));
        assert!(matches!(err, PreprocessError::MissingSourceImage { .. }));
        assert!(!err.is_broken_image());
    }

    #[test]
    fn test_corrupt_file_is_broken() {
        let err = PreprocessError::from_source("a.jpg", DecodeError::InvalidFormat);
        assert!(err.is_broken_image());
        assert!(err.to_string().contains("a.jpg"));
    }
}
