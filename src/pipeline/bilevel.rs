//! Binarisation: reduce a rendered or decoded page to 1 bit per pixel.
//!
//! ## Pixel convention
//!
//! Pages are stored with TIFF fax semantics: PhotometricInterpretation 0
//! ("WhiteIsZero"), so a **set bit means black**. Rows are packed MSB-first
//! and padded to a whole byte, which is exactly the layout a raw TIFF strip
//! would use — the Group-4 coder consumes rows without re-shuffling bits.
//!
//! ## Why dithering by default?
//!
//! Claim uploads are frequently phone photos of paper forms. A fixed
//! threshold turns their uneven lighting into large solid-black patches;
//! Floyd–Steinberg error diffusion keeps stamps, signatures and photo areas
//! recognisable at the cost of a somewhat larger Group-4 stream.

use crate::config::Binarization;
use image::imageops::{dither, BiLevel};
use image::DynamicImage;

/// An in-memory 1-bit raster page, packed rows, MSB-first, set bit = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilevelPage {
    width: u32,
    height: u32,
    row_stride: usize,
    bits: Vec<u8>,
}

impl BilevelPage {
    /// Build a page from packed rows. `bits.len()` must equal
    /// `ceil(width / 8) * height`.
    pub fn from_packed(width: u32, height: u32, bits: Vec<u8>) -> Self {
        let row_stride = ((width as usize) + 7) / 8;
        debug_assert_eq!(bits.len(), row_stride * height as usize);
        Self {
            width,
            height,
            row_stride,
            bits,
        }
    }

    /// Build an all-white page.
    pub fn blank(width: u32, height: u32) -> Self {
        let row_stride = ((width as usize) + 7) / 8;
        Self {
            width,
            height,
            row_stride,
            bits: vec![0; row_stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed bytes of one row.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_stride;
        &self.bits[start..start + self.row_stride]
    }

    /// Whether the pixel at (x, y) is black.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        let byte = self.bits[y as usize * self.row_stride + (x / 8) as usize];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Set the pixel at (x, y) to black.
    pub fn set_black(&mut self, x: u32, y: u32) {
        self.bits[y as usize * self.row_stride + (x / 8) as usize] |= 0x80 >> (x % 8);
    }

    /// Total black pixels; handy for tests and sanity logging.
    pub fn black_pixel_count(&self) -> usize {
        // Row padding bits are always 0, so summing all bytes is exact.
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

/// Reduce a decoded page to 1-bit using the configured strategy.
pub fn binarize(image: &DynamicImage, mode: Binarization) -> BilevelPage {
    let mut gray = image.to_luma8();
    let (width, height) = gray.dimensions();

    let cutoff = match mode {
        Binarization::Dither => {
            dither(&mut gray, &BiLevel);
            // After dithering every pixel is exactly 0 or 255.
            128
        }
        Binarization::Threshold(t) => t,
    };

    let mut page = BilevelPage::blank(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < cutoff {
            page.set_black(x, y);
        }
    }
    page
}
