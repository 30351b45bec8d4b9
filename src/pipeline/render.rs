//! PDF rasterisation: render every page of a PDF to `DynamicImage` via
//! pdfium.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would produce a
//! 12,000 × 17,000 px image. The requested DPI sets the target width from
//! the page's physical size, and `max_rendered_pixels` caps the longest
//! edge so one oversized page cannot exhaust memory.
//!
//! All functions here are blocking; the caller runs the whole batch inside
//! `tokio::task::spawn_blocking` because pdfium is a CPU-bound C++ library
//! that must not run on async worker threads.

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::config::FaxConfig;
use crate::error::{FaxMergeError, InputError};

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// Bind the pdfium engine, preferring a library next to the executable and
/// falling back to the system-wide install.
pub fn bind_engine() -> Result<Pdfium, FaxMergeError> {
    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| FaxMergeError::PdfEngineUnavailable(format!("{:?}", e)))
}

/// Rasterise every page of one PDF, in page order.
///
/// Failures are per-input: a PDF that does not load, has no pages, or has
/// a page pdfium cannot render reports an [`InputError`] and leaves the
/// rest of the batch untouched.
pub fn rasterize_pdf(
    pdfium: &Pdfium,
    name: &str,
    bytes: &[u8],
    config: &FaxConfig,
) -> Result<Vec<DynamicImage>, InputError> {
    let document =
        pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| InputError::CorruptPdf {
                name: name.to_string(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(InputError::ZeroPages {
            name: name.to_string(),
        });
    }

    let mut images = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let target_width = target_width_px(page.width().value, config);
        let render_config = PdfRenderConfig::new()
            .set_target_width(target_width as i32)
            .set_maximum_height(config.max_rendered_pixels as i32);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| InputError::PageRender {
                    name: name.to_string(),
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

        let image = bitmap.as_image();
        debug!(
            input = name,
            page = idx + 1,
            width = image.width(),
            height = image.height(),
            "rendered PDF page"
        );
        images.push(image);
    }

    Ok(images)
}

/// Pixel width for a page of `width_points` at the configured DPI, capped
/// by `max_rendered_pixels` and floored at 1.
fn target_width_px(width_points: f32, config: &FaxConfig) -> u32 {
    let px = (width_points / POINTS_PER_INCH * config.dpi as f32).round() as i64;
    px.clamp(1, config.max_rendered_pixels as i64) as u32
}
