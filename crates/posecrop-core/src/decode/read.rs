//! Reading images and their extents from disk.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;

use exif::{In, Reader, Tag};
use image::{ImageReader, RgbImage};

use super::{DecodeError, Orientation};

/// Width and height of an image file, after EXIF orientation.
///
/// Only the header is parsed; pixel data is not decoded.
///
/// # Errors
///
/// Returns `DecodeError::NotFound` if the file does not exist and
/// `DecodeError::CorruptedFile` if the header cannot be parsed.
pub fn image_extents(path: &Path) -> Result<(u32, u32), DecodeError> {
    let reader = ImageReader::open(path)
        .map_err(|e| DecodeError::from_io(path, e))?
        .with_guessed_format()
        .map_err(|e| DecodeError::from_io(path, e))?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let file = File::open(path).map_err(|e| DecodeError::from_io(path, e))?;
    let orientation = extract_orientation(&mut BufReader::new(file));
    Ok(orientation.oriented_dimensions(width, height))
}

/// Decode an image file to 8-bit RGB, applying EXIF orientation.
///
/// # Errors
///
/// Returns `DecodeError::NotFound` if the file does not exist,
/// `DecodeError::Io` for other read failures and
/// `DecodeError::CorruptedFile` / `DecodeError::InvalidFormat` if the bytes
/// are not a decodable image.
pub fn read_image(path: &Path) -> Result<RgbImage, DecodeError> {
    let bytes = std::fs::read(path).map_err(|e| DecodeError::from_io(path, e))?;
    decode_image_bytes(&bytes)
}

/// Decode in-memory image bytes to 8-bit RGB, applying EXIF orientation.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::CorruptedFile("empty file".to_string()));
    }
    let orientation = extract_orientation(&mut Cursor::new(bytes));

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;
    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(orientation.apply(img).into_rgb8())
}

/// Whether the file exists and decodes completely.
pub fn is_image_readable(path: &Path) -> bool {
    read_image(path).is_ok()
}

/// EXIF orientation of the container, `Normal` when absent or unreadable.
fn extract_orientation<R: BufRead + Seek>(reader: &mut R) -> Orientation {
    match Reader::new().read_from_container(reader) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}
