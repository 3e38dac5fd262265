//! Loaders for the two inputs of the matcher.
//!
//! - **Target variants**: plink `.bim` and plink2 `.pvar` (or VCF-style) files,
//!   plain or gzip-compressed, see [`target`]
//! - **Combined scoring file**: tab-separated, one row per accession and
//!   variant, plain or gzip-compressed, see [`scorefile`]
//!
//! Loading is structural only. Rows are normalized (see [`crate::core`]) and
//! partitioned by chromosome; no matching decisions happen here.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgs_match::parsing::scorefile::{load_scorefile, ScoreFilter};
//! use pgs_match::parsing::target::{TargetLoader, TargetOptions};
//! use std::path::Path;
//!
//! let scores = load_scorefile(Path::new("combined.txt.gz"), &ScoreFilter::default()).unwrap();
//!
//! let mut loader = TargetLoader::new(TargetOptions::default());
//! loader.load_file(Path::new("cohort_chr1.pvar")).unwrap();
//! let targets = loader.finish();
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use thiserror::Error;

use crate::core::FormatError;

pub mod scorefile;
pub mod target;

/// gzip magic number
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}:{}{}: {}", .path.display(), .line, accession_suffix(.accession), .source)]
    Format {
        path: PathBuf,
        line: usize,
        accession: Option<String>,
        source: FormatError,
    },

    #[error("{}: missing required column '{}'", .path.display(), .column)]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}: no data rows found", .0.display())]
    Empty(PathBuf),
}

fn accession_suffix(accession: &Option<String>) -> String {
    accession
        .as_ref()
        .map(|a| format!(" ({a})"))
        .unwrap_or_default()
}

/// Open a text file, transparently decompressing gzip input.
///
/// Compression is detected from the file's magic bytes rather than its
/// extension.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened or read.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let mut reader = BufReader::new(File::open(path)?);
    let is_gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    if is_gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_open_text_plain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\trs1\t0\t100\tA\tG\n").unwrap();

        let mut content = String::new();
        open_text(file.path())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "1\trs1\t0\t100\tA\tG\n");
    }

    #[test]
    fn test_open_text_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let file = tempfile::NamedTempFile::new().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(b"chr_name\tchr_position\n").unwrap();
        encoder.finish().unwrap();

        let mut content = String::new();
        open_text(file.path())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "chr_name\tchr_position\n");
    }

    #[test]
    fn test_format_error_message() {
        let err = ParseError::Format {
            path: PathBuf::from("scores.txt"),
            line: 7,
            accession: Some("PGS000001".to_string()),
            source: FormatError::InvalidPosition("abc".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "scores.txt:7 (PGS000001): invalid position 'abc': must be a positive integer"
        );
    }
}
