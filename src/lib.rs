//! # faxmerge
//!
//! Merge claim attachments (PDFs and scanned images) into one multi-page
//! fax-ready TIFF.
//!
//! ## Why this crate?
//!
//! Insurance carriers still ingest claims by fax, and fax gateways want
//! exactly one document: 1-bit monochrome pages, CCITT Group 4 compressed,
//! in a single multi-page TIFF. Claim attachments arrive as an arbitrary
//! mix of PDFs, photos and scans. This crate takes that mix as in-memory
//! byte blobs and produces the one file the gateway accepts, reporting per
//! attachment what happened instead of failing the whole claim over one
//! bad upload.
//!
//! ## Pipeline Overview
//!
//! ```text
//! [(name, bytes), …]
//!  │
//!  ├─ 1. Classify  route by extension: PDF / raster image / unsupported
//!  ├─ 2. Render    PDFs → pages via pdfium at the configured DPI
//!  ├─ 3. Decode    rasters → images via the `image` crate
//!  ├─ 4. Binarize  Floyd–Steinberg dither (or fixed threshold) to 1-bit
//!  ├─ 5. Compress  each page → CCITT Group 4 (ITU-T T.6)
//!  └─ 6. Assemble  one strip per page, one IFD per page, one TIFF out
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use faxmerge::{merge, FaxConfig, InputFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inputs = vec![
//!         InputFile::new("claim_form.pdf", std::fs::read("claim_form.pdf")?),
//!         InputFile::new("damage_photo.jpg", std::fs::read("damage_photo.jpg")?),
//!     ];
//!     let config = FaxConfig::builder().document_id("CLM-2024-0117").build()?;
//!     let output = merge(inputs, &config).await?;
//!     std::fs::write(&output.fax.file_name, &output.fax.bytes)?;
//!     for (name, error) in output.skipped() {
//!         eprintln!("skipped {name}: {error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `faxmerge` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! faxmerge = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod scratch;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Binarization, FaxConfig, FaxConfigBuilder};
pub use convert::{merge, merge_sync, merge_to_file};
pub use error::{FaxMergeError, InputError};
pub use output::{InputFile, InputOutcome, InputReport, MergeOutput, MergeStats, MergedFax};
pub use scratch::{MemoryScratch, ScratchBuffer, ScratchSpace, TempScratch};
