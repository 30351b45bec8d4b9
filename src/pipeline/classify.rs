//! Input classification: map a filename to a [`FileKind`] exactly once.
//!
//! The upload layer hands us opaque `(filename, bytes)` pairs; routing is
//! by extension, case-insensitive, resolved before any bytes are parsed.
//! Content sniffing still happens downstream (`image` guesses the real
//! format from magic bytes), so a mislabelled `.png` that is actually a
//! JPEG decodes fine — the extension only selects the pipeline branch.

use std::path::Path;

/// The pipeline branch an input is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Multi-page document, rasterised via pdfium.
    Pdf,
    /// Single-page raster image, decoded via the `image` crate.
    Raster,
    /// No recognised extension; routed straight to a decode error.
    Unsupported,
}

/// Raster extensions we accept. Matches the formats the `image` crate is
/// compiled with (see Cargo.toml features).
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif"];

/// Classify an input by its filename extension (case-insensitive).
pub fn classify(file_name: &str) -> FileKind {
    let ext = match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_ascii_lowercase(),
        None => return FileKind::Unsupported,
    };

    if ext == "pdf" {
        FileKind::Pdf
    } else if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        FileKind::Raster
    } else {
        FileKind::Unsupported
    }
}
