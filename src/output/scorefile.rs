use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::chromosome::compare_chromosomes;
use crate::matching::engine::{TargetMatch, VariantOutcome};
use crate::output::{checked_label, write_atomic, OutputError};

/// Columns of a matched scoring file
pub const SCOREFILE_COLUMNS: [&str; 8] = [
    "ID",
    "chr_name",
    "chr_position",
    "effect_allele",
    "other_allele",
    "effect_weight",
    "accession",
    "effect_type",
];

/// Written in place of an absent other allele
const MISSING: &str = "NA";

#[derive(Serialize)]
struct ScorefileRow<'a> {
    id: &'a str,
    chr_name: &'a str,
    chr_position: u64,
    effect_allele: &'a str,
    other_allele: &'a str,
    effect_weight: f64,
    accession: &'a str,
    effect_type: &'static str,
}

impl<'a> ScorefileRow<'a> {
    fn new(outcome: &'a VariantOutcome, m: &'a TargetMatch) -> Self {
        Self {
            id: &m.target.id,
            chr_name: &m.target.chrom,
            chr_position: m.target.pos,
            effect_allele: &m.effect_allele,
            other_allele: m.other_allele.as_deref().unwrap_or(MISSING),
            effect_weight: outcome.score.effect_weight,
            accession: &outcome.score.accession,
            effect_type: outcome.score.effect_type.as_str(),
        }
    }
}

/// Chromosome order, then position, accession and row_nr
fn output_order(a: &VariantOutcome, b: &VariantOutcome) -> Ordering {
    compare_chromosomes(&a.score.chrom, &b.score.chrom)
        .then(a.score.pos.cmp(&b.score.pos))
        .then_with(|| a.score.accession.cmp(&b.score.accession))
        .then(a.score.row_nr.cmp(&b.score.row_nr))
}

/// Writes the matched scoring file(s) of one target dataset
#[derive(Debug, Clone)]
pub struct ScorefileWriter {
    outdir: PathBuf,
    dataset: String,
    split: bool,
}

impl ScorefileWriter {
    /// # Errors
    ///
    /// Returns `OutputError::InvalidLabel` if the dataset label cannot be
    /// used in a file name.
    pub fn new(outdir: &Path, dataset: &str, split: bool) -> Result<Self, OutputError> {
        Ok(Self {
            outdir: outdir.to_path_buf(),
            dataset: checked_label(dataset)?.to_string(),
            split,
        })
    }

    /// Path of the combined scoring file
    #[must_use]
    pub fn combined_path(&self) -> PathBuf {
        self.outdir.join(format!("{}_ALL.scorefile", self.dataset))
    }

    /// Path of one accession's scoring file
    #[must_use]
    pub fn accession_path(&self, accession: &str) -> PathBuf {
        self.outdir
            .join(format!("{}_{}.scorefile", self.dataset, accession))
    }

    /// Delete every `<dataset>_*.scorefile` in the output directory and
    /// return the paths removed.
    ///
    /// Any accession label can follow the dataset prefix, so another dataset
    /// whose label starts with `<dataset>_` must not share the directory.
    ///
    /// # Errors
    ///
    /// Returns `OutputError::Io` if the directory cannot be listed or a file
    /// cannot be removed.
    pub fn remove_previous(&self) -> Result<Vec<PathBuf>, OutputError> {
        let entries = match std::fs::read_dir(&self.outdir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_", self.dataset);
        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry?;
            let owned = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".scorefile"));
            if owned && entry.file_type()?.is_file() {
                std::fs::remove_file(entry.path())?;
                removed.push(entry.path());
            }
        }
        removed.sort();

        if !removed.is_empty() {
            debug!("Removed {} scoring file(s) from an earlier run", removed.len());
        }
        Ok(removed)
    }

    /// Write the matched rows and return the paths written.
    ///
    /// Scoring files of this dataset from an earlier run are removed first,
    /// so the directory holds exactly the files returned. Rows that are not
    /// matched are ignored. Without splitting, the combined file is written
    /// even when no row matched. With splitting, one file is written per
    /// accession that has matched rows.
    ///
    /// # Errors
    ///
    /// Returns an `OutputError` if an accession cannot be used in a file name
    /// or a file cannot be written.
    pub fn write<'a>(
        &self,
        outcomes: impl IntoIterator<Item = &'a VariantOutcome>,
    ) -> Result<Vec<PathBuf>, OutputError> {
        let mut rows: Vec<&VariantOutcome> = outcomes
            .into_iter()
            .filter(|o| o.is_matched() && o.target_match.is_some())
            .collect();
        rows.sort_by(|a, b| output_order(a, b));

        self.remove_previous()?;

        if !self.split {
            let path = self.combined_path();
            write_rows(&path, &rows)?;
            info!("Wrote {} variants to {}", rows.len(), path.display());
            return Ok(vec![path]);
        }

        let mut by_accession: BTreeMap<&str, Vec<&VariantOutcome>> = BTreeMap::new();
        for row in rows {
            by_accession
                .entry(row.score.accession.as_str())
                .or_default()
                .push(row);
        }
        if by_accession.is_empty() {
            warn!("No matched variants, no scoring files written");
        }

        let mut paths = Vec::with_capacity(by_accession.len());
        for (accession, rows) in by_accession {
            let path = self.accession_path(checked_label(accession)?);
            write_rows(&path, &rows)?;
            info!("Wrote {} variants to {}", rows.len(), path.display());
            paths.push(path);
        }
        Ok(paths)
    }
}

fn write_rows(path: &Path, rows: &[&VariantOutcome]) -> Result<(), OutputError> {
    write_atomic(path, |w| {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(w);
        wtr.write_record(SCOREFILE_COLUMNS)?;
        for outcome in rows {
            if let Some(m) = &outcome.target_match {
                wtr.serialize(ScorefileRow::new(outcome, m))?;
            }
        }
        wtr.flush()?;
        Ok(())
    })
}
