//! Loader for the combined scoring file.
//!
//! The combined scoring file is tab-separated with a header row, one row per
//! (accession, variant, effect):
//!
//! ```text
//! chr_name  chr_position  effect_allele  other_allele  effect_weight  effect_type  accession  row_nr
//! 1         1000          A              G             0.5           additive     PGS000001  0
//! ```
//!
//! `other_allele`, `effect_type`, `is_dominant`, `is_recessive` and `row_nr` are
//! optional. Without `row_nr`, rows are numbered by their order in the file.

use std::collections::{BTreeMap, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::chromosome::{compare_chromosomes, normalize_chromosome};
use crate::core::{EffectType, FormatError, ScoreVariant};
use crate::parsing::{open_text, ParseError};

/// Restricts which scoring-file rows are loaded
#[derive(Debug, Clone, Default)]
pub struct ScoreFilter {
    /// Only keep rows on these (normalized) chromosomes
    pub chromosomes: Option<HashSet<String>>,
    /// Only keep rows of these accessions
    pub accessions: Option<Vec<String>>,
}

impl ScoreFilter {
    /// Build a filter from raw chromosome labels and accession names
    ///
    /// # Errors
    ///
    /// Returns `FormatError::MissingField` if a chromosome label is empty.
    pub fn new(chromosomes: &[String], accessions: &[String]) -> Result<Self, FormatError> {
        let chromosomes = if chromosomes.is_empty() {
            None
        } else {
            Some(
                chromosomes
                    .iter()
                    .map(|c| normalize_chromosome(c))
                    .collect::<Result<HashSet<_>, _>>()?,
            )
        };
        let accessions = if accessions.is_empty() {
            None
        } else {
            Some(accessions.to_vec())
        };
        Ok(Self {
            chromosomes,
            accessions,
        })
    }

    fn keeps_chromosome(&self, chrom: &str) -> bool {
        self.chromosomes.as_ref().map_or(true, |c| c.contains(chrom))
    }

    fn keeps_accession(&self, accession: &str) -> bool {
        self.accessions
            .as_ref()
            .map_or(true, |a| a.iter().any(|x| x == accession))
    }
}

/// Scoring-file variants partitioned by chromosome, with per-accession counts
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    partitions: BTreeMap<String, Vec<ScoreVariant>>,
    /// Loaded rows per accession. Accessions that were requested or seen in
    /// the file but lost every row to filtering are present with a count of 0.
    accession_rows: BTreeMap<String, usize>,
}

impl ScoreTable {
    /// Build a table from already-normalized variants
    #[must_use]
    pub fn from_variants(variants: Vec<ScoreVariant>) -> Self {
        let mut table = Self::default();
        for variant in variants {
            table.push(variant);
        }
        table
    }

    fn push(&mut self, variant: ScoreVariant) {
        *self
            .accession_rows
            .entry(variant.accession.clone())
            .or_insert(0) += 1;
        self.partitions
            .entry(variant.chrom.clone())
            .or_default()
            .push(variant);
    }

    fn register_accession(&mut self, accession: &str) {
        self.accession_rows
            .entry(accession.to_string())
            .or_insert(0);
    }

    /// Variants of one chromosome, in file order
    #[must_use]
    pub fn partition(&self, chrom: &str) -> &[ScoreVariant] {
        self.partitions.get(chrom).map_or(&[], Vec::as_slice)
    }

    /// Chromosomes present, in karyotype order
    #[must_use]
    pub fn chromosomes(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self.partitions.keys().map(String::as_str).collect();
        chroms.sort_by(|a, b| compare_chromosomes(a, b));
        chroms
    }

    /// Loaded rows per accession, including accessions with no rows
    #[must_use]
    pub fn accession_rows(&self) -> &BTreeMap<String, usize> {
        &self.accession_rows
    }

    #[must_use]
    pub fn accessions(&self) -> Vec<&str> {
        self.accession_rows.keys().map(String::as_str).collect()
    }

    /// Every loaded variant, partition by partition
    pub fn iter(&self) -> impl Iterator<Item = &ScoreVariant> {
        self.partitions.values().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column positions resolved from the scoring-file header
#[derive(Debug, Clone)]
struct ScoreColumns {
    chrom: usize,
    pos: usize,
    effect_allele: usize,
    other_allele: Option<usize>,
    effect_weight: usize,
    effect_type: Option<usize>,
    is_dominant: Option<usize>,
    is_recessive: Option<usize>,
    accession: usize,
    row_nr: Option<usize>,
    count: usize,
}

impl ScoreColumns {
    fn from_header(line: &str, path: &Path) -> Result<Self, ParseError> {
        let names: Vec<String> = line.split('\t').map(|s| s.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |column: &'static str, aliases: &[&str]| {
            find(aliases).ok_or_else(|| ParseError::MissingColumn {
                path: path.to_path_buf(),
                column,
            })
        };

        Ok(Self {
            chrom: require("chr_name", &["chr_name", "chrom", "chromosome", "hm_chr"])?,
            pos: require("chr_position", &["chr_position", "pos", "position", "hm_pos"])?,
            effect_allele: require("effect_allele", &["effect_allele"])?,
            other_allele: find(&["other_allele"]),
            effect_weight: require("effect_weight", &["effect_weight"])?,
            effect_type: find(&["effect_type"]),
            is_dominant: find(&["is_dominant"]),
            is_recessive: find(&["is_recessive"]),
            accession: require("accession", &["accession"])?,
            row_nr: find(&["row_nr"]),
            count: names.len(),
        })
    }
}

/// Load a combined scoring file, plain or gzip-compressed
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::MissingColumn`
/// if the header lacks a required column, `ParseError::Format` for a malformed
/// row, or `ParseError::Empty` if the file has no data rows.
pub fn load_scorefile(path: &Path, filter: &ScoreFilter) -> Result<ScoreTable, ParseError> {
    let reader = open_text(path)?;
    parse_scorefile_reader(reader, path, filter)
}

/// Parse scoring-file rows from any buffered reader; `source` labels errors
///
/// # Errors
///
/// See [`load_scorefile`].
pub fn parse_scorefile_reader<R: BufRead>(
    reader: R,
    source: &Path,
    filter: &ScoreFilter,
) -> Result<ScoreTable, ParseError> {
    let mut table = ScoreTable::default();
    let mut columns: Option<ScoreColumns> = None;
    let mut data_rows = 0u64;
    let mut filtered = 0usize;

    if let Some(requested) = &filter.accessions {
        for accession in requested {
            table.register_accession(accession);
        }
    }

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = i + 1;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let Some(cols) = &columns else {
            if line.starts_with('#') {
                continue;
            }
            columns = Some(ScoreColumns::from_header(line, source)?);
            continue;
        };

        let fields: Vec<&str> = line.split('\t').collect();
        let accession = fields.get(cols.accession).map(|s| s.trim().to_string());
        let format_err = |err: FormatError| ParseError::Format {
            path: PathBuf::from(source),
            line: line_num,
            accession: accession.clone(),
            source: err,
        };

        if fields.len() != cols.count {
            return Err(format_err(FormatError::ColumnCount {
                expected: cols.count,
                found: fields.len(),
            }));
        }

        let variant = parse_row(&fields, cols, data_rows).map_err(format_err)?;
        data_rows += 1;

        if filter.keeps_accession(&variant.accession) {
            table.register_accession(&variant.accession);
        } else {
            filtered += 1;
            continue;
        }
        if !filter.keeps_chromosome(&variant.chrom) {
            filtered += 1;
            continue;
        }
        table.push(variant);
    }

    if data_rows == 0 {
        return Err(ParseError::Empty(PathBuf::from(source)));
    }

    if filtered > 0 {
        debug!("Filtered out {} scoring-file rows", filtered);
    }
    info!(
        "Loaded {} scoring-file variants from {} accessions",
        table.len(),
        table.accession_rows().len()
    );

    Ok(table)
}

fn parse_row(fields: &[&str], cols: &ScoreColumns, data_row: u64) -> Result<ScoreVariant, FormatError> {
    let accession = fields[cols.accession].trim();
    if accession.is_empty() {
        return Err(FormatError::MissingField("accession"));
    }

    let weight_raw = fields[cols.effect_weight].trim();
    let effect_weight: f64 = weight_raw.parse().map_err(|_| FormatError::InvalidNumber {
        field: "effect_weight",
        value: weight_raw.to_string(),
    })?;
    if !effect_weight.is_finite() {
        return Err(FormatError::InvalidNumber {
            field: "effect_weight",
            value: weight_raw.to_string(),
        });
    }

    let row_nr = match cols.row_nr {
        Some(idx) => {
            let raw = fields[idx].trim();
            raw.parse::<u64>().map_err(|_| FormatError::InvalidNumber {
                field: "row_nr",
                value: raw.to_string(),
            })?
        }
        None => data_row,
    };

    let variant = ScoreVariant::from_raw(
        fields[cols.chrom],
        fields[cols.pos],
        fields[cols.effect_allele],
        cols.other_allele.map(|idx| fields[idx]),
        effect_weight,
        accession,
        row_nr,
    )?;

    Ok(variant.with_effect_type(parse_effect_type(fields, cols)?))
}

fn parse_effect_type(fields: &[&str], cols: &ScoreColumns) -> Result<EffectType, FormatError> {
    if let Some(idx) = cols.effect_type {
        let raw = fields[idx].trim();
        if !raw.is_empty() {
            return EffectType::parse(raw).ok_or_else(|| FormatError::InvalidEffectType(raw.to_string()));
        }
    }

    let flag = |idx: Option<usize>| idx.is_some_and(|i| parse_flag(fields[i]));
    match (flag(cols.is_dominant), flag(cols.is_recessive)) {
        (true, true) => Err(FormatError::ConflictingEffectType),
        (true, false) => Ok(EffectType::Dominant),
        (false, true) => Ok(EffectType::Recessive),
        (false, false) => Ok(EffectType::Additive),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "t" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ScoreTable, ParseError> {
        parse_scorefile_reader(text.as_bytes(), Path::new("scores.txt"), &ScoreFilter::default())
    }

    #[test]
    fn test_parse_scorefile() {
        let text = r"chr_name	chr_position	effect_allele	other_allele	effect_weight	effect_type	accession	row_nr
1	1000	A	G	0.5	additive	PGS1	0
chr1	2000	c		-0.25	additive	PGS1	1
2	300	T	C	1.5	recessive	PGS2	2
";
        let table = parse(text).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.chromosomes(), vec!["1", "2"]);
        assert_eq!(table.accessions(), vec!["PGS1", "PGS2"]);
        assert_eq!(table.accession_rows()["PGS1"], 2);

        let chr1 = table.partition("1");
        assert_eq!(chr1[0].effect_allele, "A");
        assert_eq!(chr1[0].other_allele.as_deref(), Some("G"));
        assert_eq!(chr1[1].effect_allele, "C");
        assert!(chr1[1].other_allele.is_none());
        assert!((chr1[1].effect_weight + 0.25).abs() < f64::EPSILON);
        assert_eq!(table.partition("2")[0].effect_type, EffectType::Recessive);
        assert!(table.partition("3").is_empty());
    }

    #[test]
    fn test_row_nr_defaults_to_file_order() {
        let text = "# comment\nchr_name\tchr_position\teffect_allele\teffect_weight\taccession\n1\t10\tA\t1\tPGS1\n1\t20\tG\t2\tPGS1\n";
        let table = parse(text).unwrap();
        let rows: Vec<u64> = table.partition("1").iter().map(|v| v.row_nr).collect();
        assert_eq!(rows, vec![0, 1]);
        assert!(table.partition("1")[0].other_allele.is_none());
    }

    #[test]
    fn test_effect_type_from_flags() {
        let text = "chr_name\tchr_position\teffect_allele\teffect_weight\tis_dominant\tis_recessive\taccession\n\
                    1\t10\tA\t1\tTrue\tFalse\tPGS1\n\
                    1\t20\tG\t1\tFalse\tFalse\tPGS1\n";
        let table = parse(text).unwrap();
        assert_eq!(table.partition("1")[0].effect_type, EffectType::Dominant);
        assert_eq!(table.partition("1")[1].effect_type, EffectType::Additive);

        let both = "chr_name\tchr_position\teffect_allele\teffect_weight\tis_dominant\tis_recessive\taccession\n\
                    1\t10\tA\t1\tTrue\tTrue\tPGS1\n";
        assert!(matches!(
            parse(both).unwrap_err(),
            ParseError::Format {
                source: FormatError::ConflictingEffectType,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let text = "chr_name\tchr_position\teffect_allele\taccession\n1\t10\tA\tPGS1\n";
        assert!(matches!(
            parse(text).unwrap_err(),
            ParseError::MissingColumn {
                column: "effect_weight",
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_rows_are_identified() {
        let header = "chr_name\tchr_position\teffect_allele\teffect_weight\taccession\n";

        let bad_pos = format!("{header}1\tabc\tA\t1\tPGS7\n");
        let err = parse(&bad_pos).unwrap_err();
        assert!(matches!(
            &err,
            ParseError::Format { line: 2, accession: Some(a), source: FormatError::InvalidPosition(_), .. } if a == "PGS7"
        ));
        assert!(err.to_string().contains("PGS7"));

        let bad_count = format!("{header}1\t10\tA\tPGS7\n");
        assert!(matches!(
            parse(&bad_count).unwrap_err(),
            ParseError::Format {
                source: FormatError::ColumnCount { expected: 5, found: 4 },
                ..
            }
        ));

        let bad_weight = format!("{header}1\t10\tA\tNA\tPGS7\n");
        assert!(matches!(
            parse(&bad_weight).unwrap_err(),
            ParseError::Format {
                source: FormatError::InvalidNumber { field: "effect_weight", .. },
                ..
            }
        ));

        let no_allele = format!("{header}1\t10\t\t1\tPGS7\n");
        assert!(matches!(
            parse(&no_allele).unwrap_err(),
            ParseError::Format {
                source: FormatError::MissingField("effect_allele"),
                ..
            }
        ));
    }

    #[test]
    fn test_header_only_is_empty() {
        let text = "chr_name\tchr_position\teffect_allele\teffect_weight\taccession\n";
        assert!(matches!(parse(text).unwrap_err(), ParseError::Empty(_)));
    }

    #[test]
    fn test_filters_keep_zero_count_accessions() {
        let text = "chr_name\tchr_position\teffect_allele\teffect_weight\taccession\n\
                    1\t10\tA\t1\tPGS1\n\
                    2\t10\tA\t1\tPGS2\n\
                    3\t10\tA\t1\tPGS3\n";
        let filter = ScoreFilter::new(
            &["chr1".to_string()],
            &["PGS1".to_string(), "PGS2".to_string(), "PGS9".to_string()],
        )
        .unwrap();
        let table = parse_scorefile_reader(text.as_bytes(), Path::new("s"), &filter).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.accession_rows()["PGS1"], 1);
        // PGS2 lost its only row to the chromosome filter; PGS9 was requested but absent
        assert_eq!(table.accession_rows()["PGS2"], 0);
        assert_eq!(table.accession_rows()["PGS9"], 0);
        assert!(!table.accession_rows().contains_key("PGS3"));
    }
}
