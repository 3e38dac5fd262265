//! Writers for everything a run leaves on disk.
//!
//! - [`scorefile`]: matched scoring file(s), combined or one per accession
//! - [`log`]: gzipped CSV with one line per scoring-file row
//! - [`summary`]: JSON summary of the run
//!
//! Every file is written to a temporary file in the output directory and
//! renamed into place once complete, so a failed or interrupted run never
//! leaves a truncated file behind.

use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::utils::validation::ValidationError;

pub mod log;
pub mod scorefile;
pub mod summary;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot use '{label}' in an output file name: {source}")]
    InvalidLabel {
        label: String,
        source: ValidationError,
    },
}

/// Write `path` through a temporary sibling file that replaces it on success.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), OutputError>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| OutputError::Io(e.error))?;
    Ok(())
}

/// Validate a label before it becomes part of a file name
pub(crate) fn checked_label(label: &str) -> Result<&str, OutputError> {
    crate::utils::validation::validate_label(label).map_err(|source| OutputError::InvalidLabel {
        label: label.to_string(),
        source,
    })
}
