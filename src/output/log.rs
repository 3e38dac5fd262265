use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::info;

use crate::matching::engine::VariantOutcome;
use crate::matching::overlap::OverlapReport;
use crate::output::{checked_label, write_atomic, OutputError};

/// Columns of the match log
pub const LOG_COLUMNS: [&str; 21] = [
    "row_nr",
    "accession",
    "chr_name",
    "chr_position",
    "effect_allele",
    "other_allele",
    "effect_weight",
    "effect_type",
    "ID",
    "REF",
    "ALT",
    "matched_effect_allele",
    "matched_other_allele",
    "match_type",
    "ambiguous",
    "is_multiallelic",
    "match_status",
    "dataset",
    "score_pass",
    "match_rate",
    "variants_total",
];

#[derive(Serialize)]
struct LogRow<'a> {
    row_nr: u64,
    accession: &'a str,
    chr_name: &'a str,
    chr_position: u64,
    effect_allele: &'a str,
    other_allele: Option<&'a str>,
    effect_weight: f64,
    effect_type: &'static str,
    id: Option<&'a str>,
    ref_allele: Option<&'a str>,
    alt_allele: Option<&'a str>,
    matched_effect_allele: Option<&'a str>,
    matched_other_allele: Option<&'a str>,
    match_type: Option<&'static str>,
    ambiguous: Option<bool>,
    is_multiallelic: Option<bool>,
    match_status: String,
    dataset: &'a str,
    score_pass: bool,
    match_rate: Option<f64>,
    variants_total: usize,
}

/// Path of a dataset's match log
#[must_use]
pub fn log_path(outdir: &Path, dataset: &str) -> PathBuf {
    outdir.join(format!("{dataset}_log.csv.gz"))
}

/// Write the gzipped CSV match log: one line per scoring-file row, including
/// unmatched, excluded and duplicate rows.
///
/// # Errors
///
/// Returns an `OutputError` if the dataset label is not a valid file name or
/// the file cannot be written.
pub fn write_match_log<'a>(
    outdir: &Path,
    dataset: &str,
    outcomes: impl IntoIterator<Item = &'a VariantOutcome>,
    report: &OverlapReport,
) -> Result<PathBuf, OutputError> {
    let path = log_path(outdir, checked_label(dataset)?);
    let mut written = 0usize;

    write_atomic(&path, |w| {
        let mut encoder = GzEncoder::new(w, Compression::default());
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut encoder);
            wtr.write_record(LOG_COLUMNS)?;

            for outcome in outcomes {
                let score = &outcome.score;
                let accession = report.get(&score.accession);
                let m = outcome.target_match.as_ref();

                wtr.serialize(LogRow {
                    row_nr: score.row_nr,
                    accession: &score.accession,
                    chr_name: &score.chrom,
                    chr_position: score.pos,
                    effect_allele: &score.effect_allele,
                    other_allele: score.other_allele.as_deref(),
                    effect_weight: score.effect_weight,
                    effect_type: score.effect_type.as_str(),
                    id: m.map(|m| m.target.id.as_str()),
                    ref_allele: m.and_then(|m| m.target.ref_allele.as_deref()),
                    alt_allele: m.and_then(|m| m.target.alt_allele.as_deref()),
                    matched_effect_allele: m.map(|m| m.effect_allele.as_str()),
                    matched_other_allele: m.and_then(|m| m.other_allele.as_deref()),
                    match_type: m.map(|m| m.match_type.as_str()),
                    ambiguous: m.map(|m| m.ambiguous),
                    is_multiallelic: m.map(|m| m.multiallelic),
                    match_status: outcome.status.to_string(),
                    dataset,
                    score_pass: accession.is_some_and(|a| a.pass),
                    match_rate: accession.and_then(|a| a.match_rate),
                    variants_total: accession.map_or(0, |a| a.variants_total),
                })?;
                written += 1;
            }
            wtr.flush()?;
        }
        encoder.finish()?;
        Ok(())
    })?;

    info!("Wrote match log for {} scoring-file rows to {}", written, path.display());
    Ok(path)
}
