//! Writing images to disk.

use std::fs;
use std::path::Path;

use image::{ImageFormat, RgbImage};

use super::{encode_jpeg, EncodeError};

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent_dir(path: &Path) -> Result<(), EncodeError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| EncodeError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Write `image` to `path`, creating parent directories.
///
/// The format follows the extension. JPEG output uses `quality`; other
/// formats are written losslessly. Unknown extensions fall back to JPEG.
pub fn write_image(path: &Path, image: &RgbImage, quality: u8) -> Result<(), EncodeError> {
    ensure_parent_dir(path)?;

    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg);
    let bytes = if format == ImageFormat::Jpeg {
        encode_jpeg(image, quality)?
    } else {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, format)
            .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;
        buffer.into_inner()
    };

    fs::write(path, bytes).map_err(|source| EncodeError::Io {
        path: path.to_path_buf(),
        source,
    })
}
