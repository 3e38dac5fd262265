use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::matching::engine::MatchingConfig;
use crate::matching::overlap::MatchOutcome;
use crate::matching::summary::MatchStatistics;
use crate::output::{checked_label, write_atomic, OutputError};

/// Counts describing the loaded inputs
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputCounts {
    pub score_variants: usize,
    pub target_variants: usize,
    /// Target rows dropped as exact repeats
    pub target_duplicates_removed: usize,
    pub target_multiallelic_rows: usize,
    pub target_multiallelic_removed: usize,
}

/// Settings of one run: the engine configuration plus the options applied
/// around it
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings<'a> {
    #[serde(flatten)]
    pub matching: &'a MatchingConfig,
    pub remove_multiallelic: bool,
    pub min_overlap: Option<f64>,
    pub exclude_failing: bool,
    pub split: bool,
}

/// Everything recorded about one run
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub created_at: String,
    pub dataset: &'a str,
    pub config: RunSettings<'a>,
    pub inputs: InputCounts,
    pub accessions: &'a [MatchOutcome],
    pub statistics: &'a MatchStatistics,
    /// Scoring files written by the run
    pub files: Vec<String>,
}

impl<'a> RunSummary<'a> {
    #[must_use]
    pub fn new(
        dataset: &'a str,
        config: RunSettings<'a>,
        inputs: InputCounts,
        accessions: &'a [MatchOutcome],
        statistics: &'a MatchStatistics,
    ) -> Self {
        Self {
            created_at: chrono::Utc::now().to_rfc3339(),
            dataset,
            config,
            inputs,
            accessions,
            statistics,
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_files(mut self, files: &[PathBuf]) -> Self {
        self.files = files.iter().map(|p| p.display().to_string()).collect();
        self
    }
}

/// Path of a dataset's JSON summary
#[must_use]
pub fn summary_path(outdir: &Path, dataset: &str) -> PathBuf {
    outdir.join(format!("{dataset}_summary.json"))
}

/// Write the run summary as pretty-printed JSON
///
/// # Errors
///
/// Returns an `OutputError` if the dataset label is not a valid file name or
/// the file cannot be written.
pub fn write_summary(outdir: &Path, summary: &RunSummary<'_>) -> Result<PathBuf, OutputError> {
    let path = summary_path(outdir, checked_label(summary.dataset)?);
    write_atomic(&path, |w| {
        serde_json::to_writer_pretty(&mut *w, summary)?;
        writeln!(w)?;
        Ok(())
    })?;
    Ok(path)
}
