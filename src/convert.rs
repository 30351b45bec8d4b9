//! The merge pipeline: ordered inputs in, one Group-4 fax TIFF out.
//!
//! ## Failure policy
//!
//! A bad attachment must not sink the whole claim. Each input that cannot
//! be decoded is skipped with a per-input [`InputError`] recorded in its
//! [`InputReport`]; the merge only fails outright when *no* input yields a
//! page, in which case [`FaxMergeError::EmptyResult`] carries every
//! failure in submission order.
//!
//! ## Blocking work
//!
//! Rasterisation, dithering and Group-4 coding are CPU-bound, so [`merge`]
//! runs the whole batch inside `tokio::task::spawn_blocking`. Callers
//! without a runtime use [`merge_sync`].

use std::path::Path;
use std::time::Instant;

use pdfium_render::prelude::Pdfium;
use tracing::{debug, info, warn};

use crate::config::FaxConfig;
use crate::error::{FaxMergeError, InputError};
use crate::output::{InputFile, InputOutcome, InputReport, MergeOutput, MergeStats, MergedFax};
use crate::pipeline::bilevel::{binarize, BilevelPage};
use crate::pipeline::classify::{classify, FileKind};
use crate::pipeline::tiff::TiffPage;
use crate::pipeline::{decode, g4, render, tiff};

/// Merge `inputs` into one multi-page fax TIFF.
///
/// Inputs are processed in submission order and every page of every input
/// lands in the output in that order. See the module docs for the failure
/// policy.
///
/// # Errors
///
/// [`FaxMergeError::NoInput`] when `inputs` is empty, and
/// [`FaxMergeError::EmptyResult`] when every input was skipped. Engine,
/// scratch and internal failures are fatal as well; per-input problems are
/// not.
pub async fn merge(inputs: Vec<InputFile>, config: &FaxConfig) -> Result<MergeOutput, FaxMergeError> {
    if inputs.is_empty() {
        return Err(FaxMergeError::NoInput);
    }
    let config = config.clone();
    tokio::task::spawn_blocking(move || merge_blocking(inputs, &config))
        .await
        .map_err(|e| FaxMergeError::Internal(format!("merge task panicked: {}", e)))?
}

/// Blocking variant of [`merge`] for callers without a Tokio runtime.
pub fn merge_sync(inputs: Vec<InputFile>, config: &FaxConfig) -> Result<MergeOutput, FaxMergeError> {
    if inputs.is_empty() {
        return Err(FaxMergeError::NoInput);
    }
    merge_blocking(inputs, config)
}

/// Like [`merge`], but also writes the TIFF to `path`.
///
/// The file appears atomically: bytes go to a `.partial` sibling first and
/// the final name only exists once the write is complete.
pub async fn merge_to_file(
    inputs: Vec<InputFile>,
    config: &FaxConfig,
    path: &Path,
) -> Result<MergeOutput, FaxMergeError> {
    let output = merge(inputs, config).await?;

    let partial = path.with_extension("tiff.partial");
    tokio::fs::write(&partial, &output.fax.bytes)
        .await
        .map_err(|e| FaxMergeError::OutputWriteFailed {
            path: partial.clone(),
            source: e,
        })?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| FaxMergeError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!(path = %path.display(), bytes = output.fax.bytes.len(), "fax TIFF written");
    Ok(output)
}

fn merge_blocking(inputs: Vec<InputFile>, config: &FaxConfig) -> Result<MergeOutput, FaxMergeError> {
    let started = Instant::now();
    info!(inputs = inputs.len(), dpi = config.dpi, "merging inputs into fax TIFF");

    let mut pages: Vec<BilevelPage> = Vec::new();
    let mut reports: Vec<InputReport> = Vec::with_capacity(inputs.len());

    // Bind the engine once, and only when the batch actually contains a
    // PDF, so raster-only batches never touch pdfium.
    let needs_pdfium = inputs
        .iter()
        .any(|i| !i.bytes.is_empty() && classify(&i.name) == FileKind::Pdf);
    let pdfium = if needs_pdfium {
        Some(render::bind_engine()?)
    } else {
        None
    };

    for input in &inputs {
        match process_input(input, config, pdfium.as_ref())? {
            Ok(new_pages) => {
                debug!(input = %input.name, pages = new_pages.len(), "input merged");
                reports.push(InputReport {
                    file_name: input.name.clone(),
                    outcome: InputOutcome::Merged {
                        pages: new_pages.len(),
                    },
                });
                pages.extend(new_pages);
            }
            Err(error) => {
                warn!(input = %input.name, %error, "skipping input");
                reports.push(InputReport {
                    file_name: input.name.clone(),
                    outcome: InputOutcome::Skipped { error },
                });
            }
        }
    }

    if pages.is_empty() {
        let failures: Vec<InputError> = reports
            .iter()
            .filter_map(|r| match &r.outcome {
                InputOutcome::Skipped { error } => Some(error.clone()),
                InputOutcome::Merged { .. } => None,
            })
            .collect();
        return Err(FaxMergeError::EmptyResult { failures });
    }

    let tiff_pages: Vec<TiffPage> = pages
        .iter()
        .map(|page| TiffPage {
            width: page.width(),
            height: page.height(),
            g4: g4::encode(page),
        })
        .collect();

    let mut buffer = config
        .scratch
        .create()
        .map_err(|e| FaxMergeError::Scratch { source: e })?;
    tiff::write_multipage(&mut buffer, &tiff_pages, config.dpi)
        .map_err(|e| FaxMergeError::Encode {
            detail: e.to_string(),
        })?;
    let bytes = buffer
        .into_bytes()
        .map_err(|e| FaxMergeError::Scratch { source: e })?;

    let stats = MergeStats {
        input_count: reports.len(),
        skipped_count: reports.iter().filter(|r| r.is_skipped()).count(),
        page_count: pages.len(),
        output_bytes: bytes.len(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        pages = stats.page_count,
        skipped = stats.skipped_count,
        bytes = stats.output_bytes,
        elapsed_ms = stats.elapsed_ms,
        "fax TIFF assembled"
    );

    Ok(MergeOutput {
        fax: MergedFax {
            file_name: config.output_file_name(),
            bytes,
            page_count: pages.len(),
        },
        reports,
        stats,
    })
}

/// Turn one input into its bi-level pages.
///
/// The outer `Result` is fatal (engine binding); the inner one is the
/// per-input outcome.
fn process_input(
    input: &InputFile,
    config: &FaxConfig,
    pdfium: Option<&Pdfium>,
) -> Result<Result<Vec<BilevelPage>, InputError>, FaxMergeError> {
    if input.bytes.is_empty() {
        return Ok(Err(InputError::EmptyFile {
            name: input.name.clone(),
        }));
    }

    match classify(&input.name) {
        FileKind::Pdf => {
            let engine = pdfium.ok_or_else(|| {
                FaxMergeError::Internal("pdfium engine not bound for a PDF input".into())
            })?;
            Ok(
                render::rasterize_pdf(engine, &input.name, &input.bytes, config).map(|images| {
                    images
                        .iter()
                        .map(|image| binarize(image, config.binarization))
                        .collect()
                }),
            )
        }
        FileKind::Raster => Ok(decode::decode_raster(&input.name, &input.bytes)
            .map(|image| vec![binarize(&image, config.binarization)])),
        FileKind::Unsupported => Ok(Err(InputError::Unsupported {
            name: input.name.clone(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_input(name: &str, luma: u8) -> InputFile {
        let img = RgbImage::from_pixel(40, 20, Rgb([luma; 3]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        InputFile::new(name, buf.into_inner())
    }

    #[test]
    fn empty_batch_is_rejected() {
        let config = FaxConfig::default();
        let err = merge_sync(Vec::new(), &config).unwrap_err();
        assert!(matches!(err, FaxMergeError::NoInput));
    }

    #[test]
    fn unsupported_extension_is_skipped_not_fatal() {
        let config = FaxConfig::default();
        let inputs = vec![
            png_input("scan.png", 0),
            InputFile::new("notes.docx", b"PK\x03\x04".to_vec()),
        ];
        let output = merge_sync(inputs, &config).unwrap();
        assert_eq!(output.fax.page_count, 1);
        assert_eq!(output.stats.skipped_count, 1);
        assert!(matches!(
            output.reports[1].outcome,
            InputOutcome::Skipped {
                error: InputError::Unsupported { .. }
            }
        ));
    }

    #[test]
    fn all_inputs_failing_collects_every_cause() {
        let config = FaxConfig::default();
        let inputs = vec![
            InputFile::new("empty.png", Vec::new()),
            InputFile::new("bad.jpg", b"not a jpeg".to_vec()),
            InputFile::new("notes.txt", b"hello".to_vec()),
        ];
        let err = merge_sync(inputs, &config).unwrap_err();
        match err {
            FaxMergeError::EmptyResult { failures } => {
                assert_eq!(failures.len(), 3);
                assert!(matches!(failures[0], InputError::EmptyFile { .. }));
                assert!(matches!(failures[1], InputError::ImageDecode { .. }));
                assert!(matches!(failures[2], InputError::Unsupported { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_bytes_short_circuit_before_routing() {
        // An empty PDF is rejected before it can ask for the engine.
        let config = FaxConfig::default();
        let result =
            process_input(&InputFile::new("claim.pdf", Vec::new()), &config, None).unwrap();
        assert!(matches!(result, Err(InputError::EmptyFile { .. })));
    }
}
