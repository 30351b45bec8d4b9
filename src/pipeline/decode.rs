//! Raster image decoding for the non-PDF attachment types.

use image::DynamicImage;

use crate::error::InputError;

/// Decode an in-memory raster file (PNG, JPEG, TIFF, BMP or GIF).
///
/// The container format is sniffed from the bytes, not the file name, so a
/// JPEG saved with a `.png` extension still decodes.
pub fn decode_raster(name: &str, bytes: &[u8]) -> Result<DynamicImage, InputError> {
    image::load_from_memory(bytes).map_err(|e| InputError::ImageDecode {
        name: name.to_string(),
        detail: e.to_string(),
    })
}
