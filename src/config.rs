//! Configuration types for the fax-TIFF merge.
//!
//! All merge behaviour is controlled through [`FaxConfig`], built via its
//! [`FaxConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across request handlers and to diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on documented defaults
//! for the rest; new fields never break existing call sites.

use crate::error::FaxMergeError;
use crate::scratch::{ScratchSpace, TempScratch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a fax-TIFF merge.
///
/// Built via [`FaxConfig::builder()`] or [`FaxConfig::default()`].
///
/// # Example
/// ```rust
/// use faxmerge::{Binarization, FaxConfig};
///
/// let config = FaxConfig::builder()
///     .dpi(204)
///     .binarization(Binarization::Threshold(160))
///     .document_id("claim-4711")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FaxConfig {
    /// Rasterisation DPI for PDF pages. Range: 72–600. Default: 300.
    ///
    /// 300 DPI matches our fax gateway and keeps small print on claim forms
    /// legible after binarisation. Lower it to 204 (standard fax "fine"
    /// resolution) when transmission size matters more than fidelity.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels.
    /// Default: 7200.
    ///
    /// A safety cap independent of DPI: a 300-DPI render of an A0 poster
    /// page would produce a 10 000 × 14 000 px bitmap and exhaust memory.
    /// Either dimension is capped, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// How grayscale pixels become 1-bit. Default: Floyd–Steinberg
    /// dithering, matching what the claim-submission service always
    /// produced.
    pub binarization: Binarization,

    /// Identifier prepended to the output filename. `Some("c42")` yields
    /// `"c42_merged_fax.tiff"`; `None` yields `"merged_fax.tiff"`.
    pub document_id: Option<String>,

    /// Scratch-storage provider used to stage the encoded TIFF.
    /// Default: [`TempScratch`] (anonymous temp files, auto-released).
    pub scratch: Arc<dyn ScratchSpace>,
}

impl Default for FaxConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 7200,
            binarization: Binarization::default(),
            document_id: None,
            scratch: Arc::new(TempScratch::default()),
        }
    }
}

impl fmt::Debug for FaxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaxConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("binarization", &self.binarization)
            .field("document_id", &self.document_id)
            .field("scratch", &self.scratch)
            .finish()
    }
}

impl FaxConfig {
    /// Create a new builder for `FaxConfig`.
    pub fn builder() -> FaxConfigBuilder {
        FaxConfigBuilder {
            config: Self::default(),
        }
    }

    /// Filename of the merged document for this configuration.
    pub fn output_file_name(&self) -> String {
        match &self.document_id {
            Some(id) => format!("{id}_merged_fax.tiff"),
            None => "merged_fax.tiff".to_string(),
        }
    }
}

/// Builder for [`FaxConfig`].
#[derive(Debug)]
pub struct FaxConfigBuilder {
    config: FaxConfig,
}

impl FaxConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn binarization(mut self, mode: Binarization) -> Self {
        self.config.binarization = mode;
        self
    }

    pub fn document_id(mut self, id: impl Into<String>) -> Self {
        self.config.document_id = Some(id.into());
        self
    }

    pub fn scratch(mut self, provider: Arc<dyn ScratchSpace>) -> Self {
        self.config.scratch = provider;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FaxConfig, FaxMergeError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(FaxMergeError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if let Some(ref id) = c.document_id {
            if id.is_empty() || id.contains(['/', '\\']) {
                return Err(FaxMergeError::InvalidConfig(format!(
                    "document_id must be a plain identifier, got '{id}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Strategy for reducing a grayscale page to 1 bit per pixel.
///
/// Group-4 compresses long same-colour runs extremely well, so the choice
/// here trades legibility against output size: dithering preserves the look
/// of photos and stamps but roughly doubles the compressed size of a page;
/// a fixed threshold produces the smallest files and the crispest text but
/// crushes midtones to solid black or white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Binarization {
    /// Floyd–Steinberg error-diffusion dithering. (default)
    #[default]
    Dither,
    /// Fixed luma cutoff: pixels at or above the value become white.
    /// `Threshold(128)` is the usual midpoint.
    Threshold(u8),
}
