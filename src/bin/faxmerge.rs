//! CLI binary for faxmerge.
//!
//! A thin shim over the library crate that reads the named attachment
//! files, maps CLI flags to `FaxConfig` and writes the merged TIFF.

use anyhow::{Context, Result};
use clap::Parser;
use faxmerge::{
    merge_to_file, Binarization, FaxConfig, InputFile, MergeOutput, TempScratch,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge a claim form and two photos into CLM-0117_merged_fax.tiff
  faxmerge --id CLM-0117 claim_form.pdf photo1.jpg photo2.png

  # Explicit output path
  faxmerge claim.pdf scan.tiff -o outbound/fax.tiff

  # Standard fax resolution instead of fine (300 is the default)
  faxmerge --dpi 204 claim.pdf

  # Fixed-threshold binarization (crisp line art, no dithering)
  faxmerge --threshold 160 form.pdf

  # Machine-readable per-input report on stdout
  faxmerge --json claim.pdf blurry.jpg > report.json

SUPPORTED INPUT TYPES:
  .pdf                      rendered page by page via pdfium
  .png .jpg .jpeg .tif
  .tiff .bmp .gif           decoded with the `image` crate

  Anything else is skipped and reported; the merge only fails when no
  input contributes a page.

ENVIRONMENT VARIABLES:
  FAXMERGE_DPI         Output resolution (default 300)
  FAXMERGE_OUTPUT      Output path, same as -o
  FAXMERGE_SCRATCH     Directory for scratch files (default: system temp)
  RUST_LOG             Tracing filter, e.g. RUST_LOG=faxmerge=debug

SETUP:
  faxmerge needs the pdfium shared library for PDF inputs: either place
  libpdfium next to the executable or install it system-wide. Batches
  without PDFs never load it.
"#;

/// Merge claim attachments into one fax-ready multi-page TIFF.
#[derive(Parser, Debug)]
#[command(
    name = "faxmerge",
    version,
    about = "Merge PDFs and scanned images into one Group-4 fax TIFF",
    long_about = "Merge claim attachments (PDFs and raster images) into a single multi-page \
TIFF with CCITT Group 4 compression, the format fax gateways expect. Inputs keep their \
submission order; unreadable attachments are skipped and reported.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Attachment files to merge, in fax order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the TIFF here instead of the derived name in the current directory.
    #[arg(short, long, env = "FAXMERGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Output resolution in DPI (72-600). Fax fine mode is 204.
    #[arg(long, env = "FAXMERGE_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Binarize with a fixed luma cutoff (0-255) instead of dithering.
    #[arg(long, env = "FAXMERGE_THRESHOLD")]
    threshold: Option<u8>,

    /// Document id, used as the output file name prefix.
    #[arg(long, env = "FAXMERGE_ID")]
    id: Option<String>,

    /// Directory for scratch files during TIFF assembly.
    #[arg(long, env = "FAXMERGE_SCRATCH")]
    scratch_dir: Option<PathBuf>,

    /// Print the per-input report and stats as JSON on stdout.
    #[arg(long, env = "FAXMERGE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "FAXMERGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FAXMERGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FAXMERGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner owns the terminal while it runs, so library INFO logs
    // stay off unless explicitly asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read attachments ─────────────────────────────────────────────────
    let mut inputs = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        inputs.push(InputFile::new(name, bytes));
    }

    let config = build_config(&cli)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(config.output_file_name()));

    // ── Merge ────────────────────────────────────────────────────────────
    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Merging");
        bar.set_message(format!("{} attachments", inputs.len()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = merge_to_file(inputs, &config, &output_path).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Merge failed")?;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json_report(&output))?);
    } else if !cli.quiet {
        for report in &output.reports {
            match report.pages() {
                0 => eprintln!(
                    "  {} {}  {}",
                    red("✗"),
                    report.file_name,
                    red("skipped")
                ),
                pages => eprintln!(
                    "  {} {}  {}",
                    green("✓"),
                    report.file_name,
                    dim(&format!("{pages} page{}", if pages == 1 { "" } else { "s" }))
                ),
            }
        }
        let badge = if output.stats.skipped_count == 0 {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{}  {} pages  {}  {}ms  →  {}",
            badge,
            output.stats.page_count,
            dim(&format!("{} bytes", output.stats.output_bytes)),
            output.stats.elapsed_ms,
            bold(&output_path.display().to_string()),
        );
        for (name, error) in output.skipped() {
            eprintln!("   {} {}: {}", red("✗"), name, error);
        }
    }

    Ok(())
}

/// Map CLI args to `FaxConfig`.
fn build_config(cli: &Cli) -> Result<FaxConfig> {
    let mut builder = FaxConfig::builder().dpi(cli.dpi);
    if let Some(cutoff) = cli.threshold {
        builder = builder.binarization(Binarization::Threshold(cutoff));
    }
    if let Some(ref id) = cli.id {
        builder = builder.document_id(id.clone());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch(Arc::new(TempScratch::in_dir(dir)));
    }
    builder.build().context("Invalid configuration")
}

/// Reports and stats only; the TIFF bytes go to the output file.
fn json_report(output: &MergeOutput) -> serde_json::Value {
    serde_json::json!({
        "file_name": &output.fax.file_name,
        "reports": &output.reports,
        "stats": &output.stats,
    })
}
