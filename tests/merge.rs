//! End-to-end tests for the merge pipeline.
//!
//! Raster-only batches run everywhere. Tests that rasterise PDFs need the
//! pdfium shared library and are gated behind `FAXMERGE_PDF_TESTS=1`.

use std::io::Cursor;
use std::sync::Arc;

use image::{GrayImage, ImageFormat, Luma};

use faxmerge::pipeline::{g4, tiff};
use faxmerge::{
    merge, merge_sync, merge_to_file, Binarization, FaxConfig, FaxMergeError, InputError,
    InputFile, TempScratch,
};

macro_rules! require_pdf_support {
    () => {
        if std::env::var("FAXMERGE_PDF_TESTS").is_err() {
            eprintln!("skipping: set FAXMERGE_PDF_TESTS=1 (needs the pdfium library) to run");
            return;
        }
    };
}

/// Grayscale PNG where the left half is black and the right half white.
fn half_black_png(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, _| {
        Luma([if x < width / 2 { 0u8 } else { 255u8 }])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn white_png(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_pixel(width, height, Luma([255u8]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// A minimal well-formed PDF with the given page sizes in points and no
/// content streams; pdfium renders such pages blank white.
fn tiny_pdf(page_sizes: &[(u32, u32)]) -> Vec<u8> {
    let kid_count = page_sizes.len();
    let kids: Vec<String> = (0..kid_count).map(|i| format!("{} 0 R", i + 3)).collect();

    let mut objects = vec![
        "<</Type /Catalog /Pages 2 0 R>>".to_string(),
        format!(
            "<</Type /Pages /Kids [{}] /Count {}>>",
            kids.join(" "),
            kid_count
        ),
    ];
    for &(w, h) in page_sizes {
        objects.push(format!(
            "<</Type /Page /Parent 2 0 R /MediaBox [0 0 {w} {h}]>>"
        ));
    }

    let mut out = Vec::from(&b"%PDF-1.4\n"[..]);
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<</Size {} /Root 1 0 R>>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

#[test]
fn raster_batch_keeps_order_and_dimensions() {
    let config = FaxConfig::default();
    let inputs = vec![
        InputFile::new("first.png", half_black_png(64, 40)),
        InputFile::new("second.png", half_black_png(100, 80)),
        InputFile::new("third.png", half_black_png(33, 21)),
    ];
    let output = merge_sync(inputs, &config).unwrap();
    assert_eq!(output.fax.page_count, 3);
    assert_eq!(output.fax.file_name, "merged_fax.tiff");

    let pages = tiff::read_multipage(&output.fax.bytes).unwrap();
    let dims: Vec<(u32, u32)> = pages.iter().map(|p| (p.width, p.height)).collect();
    assert_eq!(dims, vec![(64, 40), (100, 80), (33, 21)]);
}

#[test]
fn output_is_group4_bilevel_at_the_configured_dpi() {
    let config = FaxConfig::builder().dpi(204).build().unwrap();
    let inputs = vec![InputFile::new("scan.png", half_black_png(80, 50))];
    let output = merge_sync(inputs, &config).unwrap();

    let pages = tiff::read_multipage(&output.fax.bytes).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].compression, tiff::COMPRESSION_G4);
    assert_eq!(pages[0].photometric, tiff::PHOTOMETRIC_MIN_IS_WHITE);
    assert_eq!(pages[0].bits_per_sample, 1);
    assert_eq!(pages[0].x_resolution, (204, 1));
}

#[test]
fn threshold_binarization_preserves_page_content() {
    let config = FaxConfig::builder()
        .binarization(Binarization::Threshold(128))
        .build()
        .unwrap();
    let inputs = vec![InputFile::new("scan.png", half_black_png(60, 30))];
    let output = merge_sync(inputs, &config).unwrap();

    let pages = tiff::read_multipage(&output.fax.bytes).unwrap();
    let page = g4::decode(&pages[0].strip, pages[0].width, pages[0].height).unwrap();
    for y in 0..30 {
        for x in 0..60 {
            assert_eq!(page.is_black(x, y), x < 30, "pixel ({x},{y})");
        }
    }
}

#[test]
fn unreadable_input_is_reported_not_fatal() {
    let config = FaxConfig::default();
    let inputs = vec![
        InputFile::new("good.png", half_black_png(40, 40)),
        InputFile::new("corrupt.jpg", vec![0xDE, 0xAD, 0xBE, 0xEF]),
        InputFile::new("also_good.png", white_png(20, 20)),
    ];
    let output = merge_sync(inputs, &config).unwrap();

    assert_eq!(output.fax.page_count, 2);
    assert_eq!(output.stats.input_count, 3);
    assert_eq!(output.stats.skipped_count, 1);
    let skipped: Vec<_> = output.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "corrupt.jpg");
    assert!(matches!(skipped[0].1, InputError::ImageDecode { .. }));
}

#[test]
fn failures_are_collected_in_submission_order() {
    let config = FaxConfig::default();
    let inputs = vec![
        InputFile::new("z_unsupported.docx", vec![1, 2, 3]),
        InputFile::new("a_empty.png", Vec::new()),
        InputFile::new("m_corrupt.jpg", vec![9, 9, 9]),
    ];
    let err = merge_sync(inputs, &config).unwrap_err();
    match err {
        FaxMergeError::EmptyResult { failures } => {
            let names: Vec<_> = failures.iter().map(|f| f.file_name()).collect();
            assert_eq!(names, ["z_unsupported.docx", "a_empty.png", "m_corrupt.jpg"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn merge_is_deterministic() {
    let config = FaxConfig::builder()
        .binarization(Binarization::Threshold(100))
        .build()
        .unwrap();
    let inputs = || {
        vec![
            InputFile::new("a.png", half_black_png(50, 50)),
            InputFile::new("b.png", white_png(30, 30)),
        ]
    };
    let first = merge_sync(inputs(), &config).unwrap();
    let second = merge_sync(inputs(), &config).unwrap();
    assert_eq!(first.fax.bytes, second.fax.bytes);
}

#[test]
fn repeated_merges_are_semantically_equivalent() {
    let config = FaxConfig::default();
    let inputs = || {
        vec![
            InputFile::new("a.png", half_black_png(48, 36)),
            InputFile::new("b.png", half_black_png(70, 20)),
        ]
    };
    let first = merge_sync(inputs(), &config).unwrap();
    let second = merge_sync(inputs(), &config).unwrap();

    let first_pages = tiff::read_multipage(&first.fax.bytes).unwrap();
    let second_pages = tiff::read_multipage(&second.fax.bytes).unwrap();
    assert_eq!(first_pages.len(), second_pages.len());
    for (a, b) in first_pages.iter().zip(&second_pages) {
        assert_eq!((a.width, a.height), (b.width, b.height));
        let pa = g4::decode(&a.strip, a.width, a.height).unwrap();
        let pb = g4::decode(&b.strip, b.width, b.height).unwrap();
        assert_eq!(pa, pb);
    }
}

#[test]
fn document_id_names_the_output() {
    let config = FaxConfig::builder()
        .document_id("CLM-2024-0087")
        .build()
        .unwrap();
    let inputs = vec![InputFile::new("scan.png", white_png(10, 10))];
    let output = merge_sync(inputs, &config).unwrap();
    assert_eq!(output.fax.file_name, "CLM-2024-0087_merged_fax.tiff");
}

#[test]
fn scratch_directory_is_clean_after_merge() {
    let scratch_dir = tempfile::tempdir().unwrap();
    let config = FaxConfig::builder()
        .scratch(Arc::new(TempScratch::in_dir(scratch_dir.path())))
        .build()
        .unwrap();
    let inputs = vec![InputFile::new("scan.png", half_black_png(200, 120))];
    merge_sync(inputs, &config).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(scratch_dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "scratch files leaked: {leftovers:?}");
}

#[tokio::test]
async fn merge_to_file_writes_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("outbound.tiff");
    let config = FaxConfig::default();
    let inputs = vec![InputFile::new("scan.png", half_black_png(40, 40))];

    let output = merge_to_file(inputs, &config, &target).await.unwrap();

    let on_disk = std::fs::read(&target).unwrap();
    assert_eq!(on_disk, output.fax.bytes);
    // No partial file left behind.
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["outbound.tiff"]);
}

#[tokio::test]
async fn async_merge_matches_sync() {
    let config = FaxConfig::builder()
        .binarization(Binarization::Threshold(128))
        .build()
        .unwrap();
    let inputs = vec![InputFile::new("scan.png", half_black_png(25, 25))];
    let from_async = merge(inputs.clone(), &config).await.unwrap();
    let from_sync = merge_sync(inputs, &config).unwrap();
    assert_eq!(from_async.fax.bytes, from_sync.fax.bytes);
}

// ── PDF tests (need pdfium) ──────────────────────────────────────────────

#[test]
fn pdf_pages_are_rendered_in_order() {
    require_pdf_support!();

    let config = FaxConfig::default();
    let inputs = vec![InputFile::new("claim.pdf", tiny_pdf(&[(200, 100), (100, 200)]))];
    let output = merge_sync(inputs, &config).unwrap();
    assert_eq!(output.fax.page_count, 2);

    let pages = tiff::read_multipage(&output.fax.bytes).unwrap();
    // 200 pt at 300 dpi is 833 px; allow pdfium a pixel of rounding.
    assert!((pages[0].width as i64 - 833).abs() <= 2, "got {}", pages[0].width);
    assert!((pages[1].width as i64 - 417).abs() <= 2, "got {}", pages[1].width);
    // Landscape first, portrait second.
    assert!(pages[0].width > pages[0].height);
    assert!(pages[1].height > pages[1].width);
}

#[test]
fn mixed_pdf_and_raster_batch_interleaves_pages() {
    require_pdf_support!();

    let config = FaxConfig::default();
    let inputs = vec![
        InputFile::new("photo.png", half_black_png(64, 64)),
        InputFile::new("form.pdf", tiny_pdf(&[(100, 100)])),
        InputFile::new("receipt.jpg", {
            let img = GrayImage::from_pixel(32, 32, Luma([200u8]));
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
            buf.into_inner()
        }),
    ];
    let output = merge_sync(inputs, &config).unwrap();
    assert_eq!(output.fax.page_count, 3);
    let pages: Vec<usize> = output.reports.iter().map(|r| r.pages()).collect();
    assert_eq!(pages, [1, 1, 1]);

    let records = tiff::read_multipage(&output.fax.bytes).unwrap();
    assert_eq!(records[0].width, 64);
    assert_eq!(records[2].width, 32);
}

#[test]
fn corrupt_pdf_is_skipped() {
    require_pdf_support!();

    let config = FaxConfig::default();
    let inputs = vec![
        InputFile::new("broken.pdf", b"%PDF-1.4 this is not really a pdf".to_vec()),
        InputFile::new("scan.png", half_black_png(30, 30)),
    ];
    let output = merge_sync(inputs, &config).unwrap();
    assert_eq!(output.fax.page_count, 1);
    let skipped: Vec<_> = output.skipped().collect();
    assert_eq!(skipped.len(), 1);
    assert!(matches!(skipped[0].1, InputError::CorruptPdf { .. }));
}
