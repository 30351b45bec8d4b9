//! Input and output types for the merge pipeline.

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// One attachment handed to the merge: the client-supplied file name plus
/// the raw bytes. The name only matters for format routing and reporting;
/// nothing is read from disk.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// The finished fax document: a multi-page Group-4 TIFF.
#[derive(Debug, Clone)]
pub struct MergedFax {
    /// Suggested file name, derived from the configured document id.
    pub file_name: String,
    /// The complete TIFF file.
    pub bytes: Vec<u8>,
    /// Pages in the TIFF.
    pub page_count: usize,
}

/// What happened to a single input, in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InputOutcome {
    /// The input contributed `pages` pages to the fax.
    Merged { pages: usize },
    /// The input was skipped; the rest of the batch was still merged.
    Skipped { error: InputError },
}

/// Per-input report, one entry per submitted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputReport {
    pub file_name: String,
    #[serde(flatten)]
    pub outcome: InputOutcome,
}

impl InputReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, InputOutcome::Skipped { .. })
    }

    /// Pages this input contributed, zero if it was skipped.
    pub fn pages(&self) -> usize {
        match self.outcome {
            InputOutcome::Merged { pages } => pages,
            InputOutcome::Skipped { .. } => 0,
        }
    }
}

/// Batch-level statistics for logging and the CLI's JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStats {
    pub input_count: usize,
    pub skipped_count: usize,
    pub page_count: usize,
    /// Size of the finished TIFF in bytes.
    pub output_bytes: usize,
    pub elapsed_ms: u64,
}

/// Everything [`merge`](crate::merge) produces on success.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub fax: MergedFax,
    pub reports: Vec<InputReport>,
    pub stats: MergeStats,
}

impl MergeOutput {
    /// The errors of every skipped input, in submission order.
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &InputError)> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            InputOutcome::Skipped { error } => Some((r.file_name.as_str(), error)),
            InputOutcome::Merged { .. } => None,
        })
    }
}
