use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::allele::{complement, is_strand_ambiguous, normalize_allele};
use crate::core::chromosome::normalize_chromosome;
use crate::core::types::EffectType;

/// A field-level problem found while normalizing a raw record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid position '{0}': must be a positive integer")]
    InvalidPosition(String),

    #[error("invalid {field} '{value}': expected a number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid effect type '{0}'")]
    InvalidEffectType(String),

    #[error("variant is flagged as both dominant and recessive")]
    ConflictingEffectType,

    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
}

/// Parse a 1-based genomic position
///
/// # Errors
///
/// Returns `FormatError::MissingField` for an empty value and
/// `FormatError::InvalidPosition` for anything that is not an integer > 0.
pub fn parse_position(raw: &str) -> Result<u64, FormatError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FormatError::MissingField("position"));
    }
    match raw.parse::<u64>() {
        Ok(pos) if pos > 0 => Ok(pos),
        _ => Err(FormatError::InvalidPosition(raw.to_string())),
    }
}

/// One weighted variant contributed by one accession
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVariant {
    pub chrom: String,
    pub pos: u64,
    pub effect_allele: String,
    /// Absent when the scoring file only reports the effect allele
    pub other_allele: Option<String>,
    pub effect_weight: f64,
    pub effect_type: EffectType,
    pub accession: String,
    /// Position of the row in the original scoring file
    pub row_nr: u64,
}

impl ScoreVariant {
    /// Build a variant from raw text fields, applying allele and chromosome
    /// normalization.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` when the chromosome, position or effect allele
    /// is missing or the position is not a positive integer.
    pub fn from_raw(
        chrom: &str,
        pos: &str,
        effect_allele: &str,
        other_allele: Option<&str>,
        effect_weight: f64,
        accession: impl Into<String>,
        row_nr: u64,
    ) -> Result<Self, FormatError> {
        let chrom = normalize_chromosome(chrom)?;
        let pos = parse_position(pos)?;
        let effect_allele =
            normalize_allele(effect_allele).ok_or(FormatError::MissingField("effect_allele"))?;
        let other_allele = other_allele.and_then(normalize_allele);

        Ok(Self {
            chrom,
            pos,
            effect_allele,
            other_allele,
            effect_weight,
            effect_type: EffectType::Additive,
            accession: accession.into(),
            row_nr,
        })
    }

    #[must_use]
    pub fn with_effect_type(mut self, effect_type: EffectType) -> Self {
        self.effect_type = effect_type;
        self
    }

    /// True when the effect/other pair is a palindrome such as A/T
    #[must_use]
    pub fn is_strand_ambiguous(&self) -> bool {
        self.other_allele
            .as_deref()
            .is_some_and(|oa| is_strand_ambiguous(&self.effect_allele, oa))
    }

    /// Identity used to detect repeated rows within one accession
    #[must_use]
    pub fn key(&self) -> VariantKey {
        VariantKey {
            accession: self.accession.clone(),
            chrom: self.chrom.clone(),
            pos: self.pos,
            effect_allele: self.effect_allele.clone(),
            other_allele: self.other_allele.clone(),
        }
    }
}

/// Identifies a scoring-file variant in diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub accession: String,
    pub chrom: String,
    pub pos: u64,
    pub effect_allele: String,
    pub other_allele: Option<String>,
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chrom,
            self.pos,
            self.effect_allele,
            self.other_allele.as_deref().unwrap_or("NA")
        )
    }
}

/// The effect and other allele of a score variant on both strands,
/// computed once before trying the match strategies
#[derive(Debug, Clone)]
pub struct QueryAlleles<'a> {
    pub effect: &'a str,
    pub other: Option<&'a str>,
    pub effect_flip: String,
    pub other_flip: Option<String>,
}

impl<'a> QueryAlleles<'a> {
    #[must_use]
    pub fn new(variant: &'a ScoreVariant) -> Self {
        Self {
            effect: &variant.effect_allele,
            other: variant.other_allele.as_deref(),
            effect_flip: complement(&variant.effect_allele),
            other_flip: variant.other_allele.as_deref().map(complement),
        }
    }
}

/// One genotyped variant of the target dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetVariant {
    pub chrom: String,
    pub pos: u64,
    /// Identifier used by the genotype files (plink variant ID)
    pub id: String,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    /// Same chromosome and position occurs more than once in the target set
    pub is_multiallelic: bool,
}

impl TargetVariant {
    /// Build a target variant from raw text fields.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` when the chromosome or position is invalid or
    /// both alleles are missing.
    pub fn from_raw(
        chrom: &str,
        pos: &str,
        id: &str,
        ref_allele: &str,
        alt_allele: &str,
    ) -> Result<Self, FormatError> {
        let chrom = normalize_chromosome(chrom)?;
        let pos = parse_position(pos)?;
        let ref_allele = normalize_allele(ref_allele);
        let alt_allele = normalize_allele(alt_allele);
        if ref_allele.is_none() && alt_allele.is_none() {
            return Err(FormatError::MissingField("allele"));
        }

        let id = id.trim();
        let id = if id.is_empty() || id == "." {
            // plink allows unnamed variants; synthesize the conventional ID
            format!(
                "{chrom}:{pos}:{}:{}",
                ref_allele.as_deref().unwrap_or("."),
                alt_allele.as_deref().unwrap_or(".")
            )
        } else {
            id.to_string()
        };

        Ok(Self {
            chrom,
            pos,
            id,
            ref_allele,
            alt_allele,
            is_multiallelic: false,
        })
    }

    /// True when REF/ALT is a palindromic pair such as A/T or C/G
    #[must_use]
    pub fn is_strand_ambiguous(&self) -> bool {
        match (self.ref_allele.as_deref(), self.alt_allele.as_deref()) {
            (Some(r), Some(a)) => is_strand_ambiguous(r, a),
            _ => false,
        }
    }

    /// The deduplication key within one chromosome partition
    #[must_use]
    pub fn site_key(&self) -> (u64, Option<String>, Option<String>) {
        (self.pos, self.ref_allele.clone(), self.alt_allele.clone())
    }
}
