//! Per-accession overlap between the scoring file and the target variants.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::core::{ExclusionReason, MatchStatus, VariantKey};
use crate::matching::summary::MatchResults;

/// Convert a count to f64 for rate calculations.
#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlapError {
    /// Reported before threshold failures; any threshold failures found in
    /// the same run ride along in `below_threshold`
    #[error(
        "No variants loaded for accession(s): {}{}",
        .accessions.join(", "),
        format_also_below(.below_threshold)
    )]
    ZeroVariants {
        accessions: Vec<String>,
        below_threshold: Vec<(String, f64)>,
    },

    #[error(
        "Match rate below minimum overlap {:.2}% for: {}",
        .threshold * 100.0,
        format_failures(.failures)
    )]
    BelowThreshold {
        threshold: f64,
        failures: Vec<(String, f64)>,
    },
}

fn format_failures(failures: &[(String, f64)]) -> String {
    failures
        .iter()
        .map(|(accession, rate)| format!("{accession} ({:.2}%)", rate * 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_also_below(failures: &[(String, f64)]) -> String {
    if failures.is_empty() {
        String::new()
    } else {
        format!("; also below minimum overlap: {}", format_failures(failures))
    }
}

/// Match summary of one accession
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub accession: String,
    /// Distinct score variants; repeated rows are counted in `duplicates`
    pub variants_total: usize,
    pub variants_matched: usize,
    /// `matched / total`; `None` when the accession has no variants
    pub match_rate: Option<f64>,
    pub duplicates: usize,
    pub excluded: usize,
    /// Matched or excluded variants flagged strand-ambiguous
    pub ambiguous: Vec<VariantKey>,
    pub unmatched: Vec<VariantKey>,
    /// Passes the minimum overlap (and has variants)
    pub pass: bool,
}

impl MatchOutcome {
    fn new(accession: &str) -> Self {
        Self {
            accession: accession.to_string(),
            variants_total: 0,
            variants_matched: 0,
            match_rate: None,
            duplicates: 0,
            excluded: 0,
            ambiguous: Vec::new(),
            unmatched: Vec::new(),
            pass: false,
        }
    }
}

/// Overlap of every accession against an optional minimum
#[derive(Debug, Clone, Serialize)]
pub struct OverlapReport {
    pub min_overlap: Option<f64>,
    pub outcomes: Vec<MatchOutcome>,
}

impl OverlapReport {
    /// Group outcomes by accession and compare each match rate to the minimum.
    ///
    /// `accessions` lists every accession known to the loader, so accessions
    /// whose rows were all filtered out appear with zero variants.
    #[must_use]
    pub fn evaluate<'a>(
        results: &MatchResults,
        accessions: impl IntoIterator<Item = &'a str>,
        min_overlap: Option<f64>,
    ) -> Self {
        let mut by_accession: BTreeMap<&str, MatchOutcome> = accessions
            .into_iter()
            .map(|a| (a, MatchOutcome::new(a)))
            .collect();

        for outcome in results.outcomes() {
            let accession = outcome.score.accession.as_str();
            let entry = by_accession
                .entry(accession)
                .or_insert_with(|| MatchOutcome::new(accession));

            match outcome.status {
                MatchStatus::Duplicate => {
                    entry.duplicates += 1;
                    continue;
                }
                MatchStatus::Matched => entry.variants_matched += 1,
                MatchStatus::Unmatched => entry.unmatched.push(outcome.score.key()),
                MatchStatus::Excluded(_) => entry.excluded += 1,
            }
            entry.variants_total += 1;

            let ambiguous = matches!(
                outcome.status,
                MatchStatus::Excluded(ExclusionReason::Ambiguous)
            ) || outcome.target_match.as_ref().is_some_and(|m| m.ambiguous);
            if ambiguous {
                entry.ambiguous.push(outcome.score.key());
            }
        }

        let outcomes = by_accession
            .into_values()
            .map(|mut outcome| {
                if outcome.variants_total > 0 {
                    let rate =
                        count_to_f64(outcome.variants_matched) / count_to_f64(outcome.variants_total);
                    outcome.match_rate = Some(rate);
                    outcome.pass = min_overlap.map_or(true, |threshold| rate >= threshold);
                }
                outcome
            })
            .collect();

        Self {
            min_overlap,
            outcomes,
        }
    }

    #[must_use]
    pub fn get(&self, accession: &str) -> Option<&MatchOutcome> {
        self.outcomes.iter().find(|o| o.accession == accession)
    }

    /// Accessions with no variants at all
    #[must_use]
    pub fn empty_accessions(&self) -> Vec<&MatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.variants_total == 0)
            .collect()
    }

    /// Accessions with variants whose match rate is below the minimum
    #[must_use]
    pub fn below_threshold(&self) -> Vec<&MatchOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.variants_total > 0 && !o.pass)
            .collect()
    }

    #[must_use]
    pub fn passing_accessions(&self) -> BTreeSet<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.pass)
            .map(|o| o.accession.as_str())
            .collect()
    }

    /// Fail on any accession without variants, then on any accession below
    /// the minimum overlap. A zero-variant error also lists the accessions
    /// below the minimum.
    ///
    /// # Errors
    ///
    /// Returns `OverlapError::ZeroVariants` or `OverlapError::BelowThreshold`.
    pub fn check(&self) -> Result<(), OverlapError> {
        let failures: Vec<(String, f64)> = match self.min_overlap {
            Some(_) => self
                .below_threshold()
                .iter()
                .map(|o| (o.accession.clone(), o.match_rate.unwrap_or(0.0)))
                .collect(),
            None => Vec::new(),
        };

        let empty = self.empty_accessions();
        if !empty.is_empty() {
            return Err(OverlapError::ZeroVariants {
                accessions: empty.iter().map(|o| o.accession.clone()).collect(),
                below_threshold: failures,
            });
        }

        match self.min_overlap {
            Some(threshold) if !failures.is_empty() => {
                Err(OverlapError::BelowThreshold { threshold, failures })
            }
            _ => Ok(()),
        }
    }

    /// Log one line per accession: passing at info, failing at error
    pub fn log(&self) {
        for outcome in &self.outcomes {
            match (outcome.match_rate, outcome.pass) {
                (None, _) => warn!("{}: no variants loaded", outcome.accession),
                (Some(rate), true) => info!(
                    "{}: {}/{} variants matched ({:.2}%)",
                    outcome.accession,
                    outcome.variants_matched,
                    outcome.variants_total,
                    rate * 100.0
                ),
                (Some(rate), false) => error!(
                    "{}: {}/{} variants matched ({:.2}%), below minimum overlap",
                    outcome.accession,
                    outcome.variants_matched,
                    outcome.variants_total,
                    rate * 100.0
                ),
            }
        }
    }
}
