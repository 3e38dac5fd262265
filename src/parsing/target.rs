//! Loader for target variant tables (plink `.bim` / plink2 `.pvar`).
//!
//! `.bim` files have six whitespace-separated columns and no header:
//! `chrom id cM pos allele1 allele2`. Allele 1 is loaded as REF and allele 2
//! as ALT; matching tries both orientations, so only the reported match type
//! depends on this.
//!
//! `.pvar` files (and VCF files) start with `#`: `##` meta lines are skipped and
//! the `#CHROM` header names the columns. Comma-separated ALT fields are split
//! into one row per alternate allele.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::chromosome::compare_chromosomes;
use crate::core::{FormatError, TargetVariant};
use crate::parsing::{open_text, ParseError};

/// Number of columns in a plink1 `.bim` file
const BIM_COLUMNS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Bim,
    Pvar,
}

impl TargetFormat {
    /// Detect the format from the first non-empty line
    #[must_use]
    pub fn detect(first_line: &str) -> Self {
        if first_line.starts_with('#') {
            Self::Pvar
        } else {
            Self::Bim
        }
    }
}

/// Options applied while loading target variants
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetOptions {
    /// Drop every row at a position with more than one REF/ALT pair
    pub remove_multiallelic: bool,
}

/// Target variants of one chromosome, in first-seen order
#[derive(Debug, Clone)]
pub struct TargetTable {
    pub chrom: String,
    variants: Vec<TargetVariant>,
    /// position -> indices into `variants`, in first-seen order
    by_position: HashMap<u64, Vec<usize>>,
    seen: HashSet<(u64, Option<String>, Option<String>)>,
}

impl TargetTable {
    #[must_use]
    pub fn new(chrom: impl Into<String>) -> Self {
        Self {
            chrom: chrom.into(),
            variants: Vec::new(),
            by_position: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// Add a variant unless an identical (position, REF, ALT) row exists.
    ///
    /// Returns `false` when the row was a duplicate and was dropped.
    pub fn push(&mut self, variant: TargetVariant) -> bool {
        if !self.seen.insert(variant.site_key()) {
            return false;
        }
        let idx = self.variants.len();
        self.by_position.entry(variant.pos).or_default().push(idx);
        self.variants.push(variant);
        true
    }

    /// All rows at a position, in first-seen order
    #[must_use]
    pub fn at(&self, pos: u64) -> Vec<&TargetVariant> {
        self.by_position
            .get(&pos)
            .map(|indices| indices.iter().map(|&i| &self.variants[i]).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn variants(&self) -> &[TargetVariant] {
        &self.variants
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Flag positions that carry more than one row
    fn annotate_multiallelic(&mut self) -> usize {
        let mut flagged = 0;
        for indices in self.by_position.values() {
            if indices.len() > 1 {
                for &i in indices {
                    self.variants[i].is_multiallelic = true;
                    flagged += 1;
                }
            }
        }
        flagged
    }

    /// Rebuild the table without multiallelic rows
    fn without_multiallelic(self) -> (Self, usize) {
        let mut table = Self::new(self.chrom);
        let mut removed = 0;
        for variant in self.variants {
            if variant.is_multiallelic {
                removed += 1;
            } else {
                table.push(variant);
            }
        }
        (table, removed)
    }
}

/// Target variants of a dataset, partitioned by chromosome
#[derive(Debug, Clone, Default)]
pub struct TargetPartitions {
    tables: BTreeMap<String, TargetTable>,
    /// Raw rows dropped because an identical row was already loaded
    pub duplicates_removed: usize,
    /// Rows at multiallelic positions
    pub multiallelic_rows: usize,
    /// Rows dropped because of `remove_multiallelic`
    pub multiallelic_removed: usize,
}

impl TargetPartitions {
    #[must_use]
    pub fn get(&self, chrom: &str) -> Option<&TargetTable> {
        self.tables.get(chrom)
    }

    /// Chromosomes present, in karyotype order
    #[must_use]
    pub fn chromosomes(&self) -> Vec<&str> {
        let mut chroms: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        chroms.sort_by(|a, b| compare_chromosomes(a, b));
        chroms
    }

    /// Total variants across all partitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.values().map(TargetTable::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accumulates target files into [`TargetPartitions`]
pub struct TargetLoader {
    options: TargetOptions,
    partitions: TargetPartitions,
}

impl TargetLoader {
    #[must_use]
    pub fn new(options: TargetOptions) -> Self {
        Self {
            options,
            partitions: TargetPartitions::default(),
        }
    }

    /// Load one target file, plain or gzip-compressed, and return how many
    /// variants it added. Rows repeating an already loaded variant are not
    /// counted.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be read, `ParseError::Format`
    /// for a malformed row, or `ParseError::Empty` if it contains no variants.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ParseError> {
        let reader = open_text(path)?;
        self.load_reader(reader, path)
    }

    /// Load target rows from any buffered reader; `source` labels errors
    ///
    /// # Errors
    ///
    /// See [`TargetLoader::load_file`].
    pub fn load_reader<R: BufRead>(&mut self, reader: R, source: &Path) -> Result<usize, ParseError> {
        let mut detected: Option<TargetFormat> = None;
        let mut pvar_columns: Option<PvarColumns> = None;
        let mut parsed = 0usize;
        let mut loaded = 0usize;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = i + 1;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            let format = *detected.get_or_insert_with(|| {
                let detected = TargetFormat::detect(line);
                debug!("{}: detected {:?} target format", source.display(), detected);
                detected
            });

            let format_err = |source_err: FormatError| ParseError::Format {
                path: source.to_path_buf(),
                line: line_num,
                accession: None,
                source: source_err,
            };

            let variants = match format {
                TargetFormat::Bim => parse_bim_line(line).map_err(format_err)?,
                TargetFormat::Pvar => {
                    if line.starts_with("##") {
                        continue;
                    }
                    if line.starts_with('#') {
                        pvar_columns = Some(PvarColumns::from_header(line).map_err(format_err)?);
                        continue;
                    }
                    let columns = pvar_columns.get_or_insert_with(PvarColumns::default);
                    parse_pvar_line(line, columns).map_err(format_err)?
                }
            };

            for variant in variants {
                parsed += 1;
                if self.insert(variant) {
                    loaded += 1;
                }
            }
        }

        if parsed == 0 {
            return Err(ParseError::Empty(PathBuf::from(source)));
        }

        debug!("{}: loaded {} target variants", source.display(), loaded);
        Ok(loaded)
    }

    /// Returns false when the variant repeats one already loaded
    fn insert(&mut self, variant: TargetVariant) -> bool {
        let table = self
            .partitions
            .tables
            .entry(variant.chrom.clone())
            .or_insert_with(|| TargetTable::new(variant.chrom.clone()));
        let kept = table.push(variant);
        if !kept {
            self.partitions.duplicates_removed += 1;
        }
        kept
    }

    /// Annotate multiallelic sites and return the finished partitions
    #[must_use]
    pub fn finish(self) -> TargetPartitions {
        let mut partitions = self.partitions;

        if partitions.duplicates_removed > 0 {
            warn!(
                "Removed {} duplicated target variants (same position, REF and ALT)",
                partitions.duplicates_removed
            );
        }

        let tables = std::mem::take(&mut partitions.tables);
        for (chrom, mut table) in tables {
            partitions.multiallelic_rows += table.annotate_multiallelic();
            if self.options.remove_multiallelic {
                let (kept, removed) = table.without_multiallelic();
                partitions.multiallelic_removed += removed;
                table = kept;
            }
            if !table.is_empty() {
                partitions.tables.insert(chrom, table);
            }
        }

        if partitions.multiallelic_rows > 0 {
            if self.options.remove_multiallelic {
                debug!(
                    "Dropped {} target rows at multiallelic positions",
                    partitions.multiallelic_removed
                );
            } else {
                debug!(
                    "{} target rows sit at multiallelic positions",
                    partitions.multiallelic_rows
                );
            }
        }

        partitions
    }
}

/// Column positions of a `.pvar` / VCF body
#[derive(Debug, Clone)]
struct PvarColumns {
    chrom: usize,
    pos: usize,
    id: usize,
    ref_allele: usize,
    alt_allele: usize,
    count: Option<usize>,
}

impl Default for PvarColumns {
    /// plink2 column order when the header line is absent
    fn default() -> Self {
        Self {
            chrom: 0,
            pos: 1,
            id: 2,
            ref_allele: 3,
            alt_allele: 4,
            count: None,
        }
    }
}

impl PvarColumns {
    fn from_header(line: &str) -> Result<Self, FormatError> {
        let names: Vec<String> = line
            .trim_start_matches('#')
            .split('\t')
            .map(|s| s.trim().to_uppercase())
            .collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| n == name)
                .ok_or(FormatError::MissingField(name))
        };

        Ok(Self {
            chrom: find("CHROM")?,
            pos: find("POS")?,
            id: find("ID")?,
            ref_allele: find("REF")?,
            alt_allele: find("ALT")?,
            count: Some(names.len()),
        })
    }

    fn required(&self) -> usize {
        [self.chrom, self.pos, self.id, self.ref_allele, self.alt_allele]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

fn parse_bim_line(line: &str) -> Result<Vec<TargetVariant>, FormatError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != BIM_COLUMNS {
        return Err(FormatError::ColumnCount {
            expected: BIM_COLUMNS,
            found: fields.len(),
        });
    }
    let variant = TargetVariant::from_raw(fields[0], fields[3], fields[1], fields[4], fields[5])?;
    Ok(vec![variant])
}

fn parse_pvar_line(line: &str, columns: &PvarColumns) -> Result<Vec<TargetVariant>, FormatError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let expected = columns.count.unwrap_or_else(|| columns.required());
    let column_count_ok = match columns.count {
        Some(count) => fields.len() == count,
        None => fields.len() >= expected,
    };
    if !column_count_ok {
        return Err(FormatError::ColumnCount {
            expected,
            found: fields.len(),
        });
    }

    let alts = fields[columns.alt_allele];
    alts.split(',')
        .map(|alt| {
            TargetVariant::from_raw(
                fields[columns.chrom],
                fields[columns.pos],
                fields[columns.id],
                fields[columns.ref_allele],
                alt,
            )
        })
        .collect()
}
