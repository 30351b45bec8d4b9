//! Error types for the faxmerge library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FaxMergeError`] — **Fatal**: the merge cannot produce a document at
//!   all (no inputs, every input failed to decode, TIFF encoding or scratch
//!   storage failed). Returned as `Err(FaxMergeError)` from the top-level
//!   `merge*` functions.
//!
//! * [`InputError`] — **Non-fatal**: a single input file failed (corrupt
//!   PDF, undecodable image, empty upload) but other inputs are fine.
//!   Stored inside [`crate::output::InputReport`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad upload.
//!
//! The separation lets the HTTP boundary decide its own mapping: reject the
//! request outright, or store the merged document and report the bad inputs
//! back to the user.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the faxmerge library.
///
/// Per-input failures use [`InputError`] and are stored in
/// [`crate::output::InputReport`] rather than propagated here — except when
/// *every* input failed, in which case they travel inside
/// [`FaxMergeError::EmptyResult`].
#[derive(Debug, Error)]
pub enum FaxMergeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input list was empty.
    #[error("No input files were supplied; at least one PDF or image is required")]
    NoInput,

    /// No pages survived decoding; there is nothing to merge.
    ///
    /// Carries every per-input failure encountered, in input order, so the
    /// caller can report each offending file.
    #[error("No pages could be decoded from {} input(s).\nFirst failure: {}", failures.len(), first_failure(failures))]
    EmptyResult { failures: Vec<InputError> },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Pages decoded fine but TIFF assembly failed mid-write.
    #[error("Failed to encode merged TIFF: {detail}")]
    Encode { detail: String },

    /// Scratch (temporary) storage could not be created or read back.
    #[error("Scratch storage failed: {source}\nCheck free disk space and permissions on the temp directory.")]
    Scratch {
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output file (`merge_to_file` only).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// Could not bind to a pdfium library; PDF inputs cannot be rasterised.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Place libpdfium next to the executable or install it on the system library path."
    )]
    PdfEngineUnavailable(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn first_failure(failures: &[InputError]) -> String {
    failures
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A non-fatal error for a single input file.
///
/// Every variant carries the offending filename so the caller can tell the
/// user exactly which upload to fix. The overall merge continues unless ALL
/// inputs fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum InputError {
    /// The uploaded byte stream was empty.
    #[error("'{name}': file is empty")]
    EmptyFile { name: String },

    /// The filename had no extension, or one that maps to no supported kind.
    #[error("'{name}': unsupported file type (expected .pdf, .png, .jpg, .tiff, .bmp or .gif)")]
    Unsupported { name: String },

    /// pdfium could not parse the bytes as a PDF.
    #[error("'{name}': corrupt or invalid PDF: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// The PDF parsed but contains no pages.
    #[error("'{name}': PDF has no pages")]
    ZeroPages { name: String },

    /// The bytes could not be decoded as a raster image.
    #[error("'{name}': cannot decode image: {detail}")]
    ImageDecode { name: String, detail: String },

    /// pdfium failed while rasterising one page of an otherwise valid PDF.
    #[error("'{name}' page {page}: rasterisation failed: {detail}")]
    PageRender {
        name: String,
        page: usize,
        detail: String,
    },
}

impl InputError {
    /// The filename of the input that produced this error.
    pub fn file_name(&self) -> &str {
        match self {
            InputError::EmptyFile { name }
            | InputError::Unsupported { name }
            | InputError::CorruptPdf { name, .. }
            | InputError::ZeroPages { name }
            | InputError::ImageDecode { name, .. }
            | InputError::PageRender { name, .. } => name,
        }
    }
}
