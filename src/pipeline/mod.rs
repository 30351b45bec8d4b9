//! Pipeline stages for the document-to-fax-TIFF merge.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ render / decode ──▶ bilevel ──▶ g4 ──▶ tiff
//! (extension)  (pdfium)  (image)   (1-bit)    (T.6)  (container)
//! ```
//!
//! 1. [`classify`] — resolve each input's [`classify::FileKind`] once,
//!    before any bytes are parsed
//! 2. [`render`]   — rasterise every PDF page at the configured DPI;
//!    CPU-bound, so the caller wraps the whole batch in `spawn_blocking`
//! 3. [`decode`]   — decode raster uploads with the `image` crate
//! 4. [`bilevel`]  — reduce grayscale pages to packed 1-bit rasters
//! 5. [`g4`]       — CCITT Group 4 (T.6) bit coding of each page
//! 6. [`tiff`]     — assemble the strips into one multi-page TIFF

pub mod bilevel;
pub mod classify;
pub mod decode;
pub mod g4;
pub mod render;
pub mod tiff;
