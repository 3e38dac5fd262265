use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::chromosome::compare_chromosomes;
use crate::core::{ExclusionReason, MatchStatus, MatchType, ScoreVariant, TargetVariant};
use crate::matching::strategy::{best_candidate, MatchCandidate, StrategyOptions};
use crate::matching::summary::MatchResults;
use crate::parsing::scorefile::ScoreTable;
use crate::parsing::target::{TargetPartitions, TargetTable};

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for the matching engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Worker threads; `None` uses every available core
    pub threads: Option<usize>,
    /// Exclude strand-ambiguous matches instead of flagging them
    pub remove_ambiguous: bool,
    /// Never match on the complemented strand
    pub skip_flip: bool,
    /// When several score rows resolve to one target ID, keep the first
    /// instead of excluding all of them
    pub keep_first_match: bool,
}

/// A score variant's match on the target side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetMatch {
    pub target: TargetVariant,
    pub match_type: MatchType,
    /// Effect allele on the target strand
    pub effect_allele: String,
    /// Other allele on the target strand
    pub other_allele: Option<String>,
    pub ambiguous: bool,
    pub multiallelic: bool,
}

impl From<MatchCandidate<'_>> for TargetMatch {
    fn from(candidate: MatchCandidate<'_>) -> Self {
        Self {
            target: candidate.target.clone(),
            match_type: candidate.match_type,
            effect_allele: candidate.effect_allele,
            other_allele: candidate.other_allele,
            ambiguous: candidate.ambiguous,
            multiallelic: candidate.multiallelic,
        }
    }
}

/// Final state of one scoring-file row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantOutcome {
    pub score: ScoreVariant,
    pub status: MatchStatus,
    /// Present for matched and excluded rows
    pub target_match: Option<TargetMatch>,
}

impl VariantOutcome {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.status.is_matched()
    }
}

/// Outcomes of one chromosome partition, in row_nr order
#[derive(Debug, Clone)]
pub struct PartitionResult {
    pub chrom: String,
    pub outcomes: Vec<VariantOutcome>,
}

impl PartitionResult {
    /// Rows that made it into the output
    pub fn matched(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.outcomes.iter().filter(|o| o.is_matched())
    }

    /// Unmatched, excluded and duplicate rows
    pub fn not_matched(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.outcomes.iter().filter(|o| !o.is_matched())
    }
}

/// Matches scoring-file variants to target variants
pub struct MatchingEngine {
    config: MatchingConfig,
}

impl MatchingEngine {
    #[must_use]
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Match every chromosome partition on a dedicated worker pool.
    ///
    /// Score partitions without any target variants still run, so their
    /// rows are reported as unmatched.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::ThreadPool` if the worker pool cannot be created.
    pub fn run(
        &self,
        scores: &ScoreTable,
        targets: &TargetPartitions,
    ) -> Result<MatchResults, MatchError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        let chromosomes = scores.chromosomes();
        info!(
            "Matching {} chromosomes on {} threads",
            chromosomes.len(),
            pool.current_num_threads()
        );

        let mut partitions: Vec<PartitionResult> = pool.install(|| {
            chromosomes
                .par_iter()
                .map(|chrom| self.match_partition(chrom, scores.partition(chrom), targets.get(chrom)))
                .collect()
        });
        partitions.sort_by(|a, b| compare_chromosomes(&a.chrom, &b.chrom));

        Ok(MatchResults::new(partitions))
    }

    /// Match the score variants of one chromosome.
    ///
    /// Steps, in order: drop repeated score rows, resolve each remaining row
    /// through the strategy cascade, exclude ambiguous matches when
    /// configured, then resolve score rows sharing a target ID.
    #[must_use]
    pub fn match_partition(
        &self,
        chrom: &str,
        scores: &[ScoreVariant],
        targets: Option<&TargetTable>,
    ) -> PartitionResult {
        let mut ordered: Vec<&ScoreVariant> = scores.iter().collect();
        ordered.sort_by_key(|v| v.row_nr);

        let options = StrategyOptions {
            skip_flip: self.config.skip_flip,
        };

        let mut seen = HashSet::new();
        let mut duplicates = 0usize;
        let mut outcomes: Vec<VariantOutcome> = Vec::with_capacity(ordered.len());

        for variant in ordered {
            if !seen.insert(variant.key()) {
                duplicates += 1;
                outcomes.push(VariantOutcome {
                    score: variant.clone(),
                    status: MatchStatus::Duplicate,
                    target_match: None,
                });
                continue;
            }

            let candidate = targets.and_then(|table| {
                let rows = table.at(variant.pos);
                best_candidate(variant, &rows, options).map(TargetMatch::from)
            });

            let status = match &candidate {
                None => MatchStatus::Unmatched,
                Some(m) if m.ambiguous && self.config.remove_ambiguous => {
                    MatchStatus::Excluded(ExclusionReason::Ambiguous)
                }
                Some(_) => MatchStatus::Matched,
            };

            outcomes.push(VariantOutcome {
                score: variant.clone(),
                status,
                target_match: candidate,
            });
        }

        let duplicate_ids = self.resolve_duplicate_ids(&mut outcomes);

        if duplicates > 0 {
            debug!("chr{}: {} repeated score rows ignored", chrom, duplicates);
        }
        if duplicate_ids > 0 {
            debug!(
                "chr{}: {} score rows excluded for sharing a target ID",
                chrom, duplicate_ids
            );
        }

        PartitionResult {
            chrom: chrom.to_string(),
            outcomes,
        }
    }

    /// Within one accession, several score rows may resolve to the same
    /// target ID. Keep the first by row_nr or exclude all of them.
    ///
    /// Returns the number of rows excluded.
    fn resolve_duplicate_ids(&self, outcomes: &mut [VariantOutcome]) -> usize {
        let mut groups: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
        for (idx, outcome) in outcomes.iter().enumerate() {
            if let (MatchStatus::Matched, Some(m)) = (outcome.status, &outcome.target_match) {
                groups
                    .entry((outcome.score.accession.as_str(), m.target.id.as_str()))
                    .or_default()
                    .push(idx);
            }
        }

        let mut to_exclude: Vec<usize> = groups
            .into_values()
            .filter(|indices| indices.len() > 1)
            .flat_map(|indices| {
                // outcomes are in row_nr order, so indices[0] is the first row
                let skip = usize::from(self.config.keep_first_match);
                indices.into_iter().skip(skip)
            })
            .collect();
        to_exclude.sort_unstable();

        for &idx in &to_exclude {
            outcomes[idx].status = MatchStatus::Excluded(ExclusionReason::DuplicateId);
        }
        to_exclude.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::target::{TargetLoader, TargetOptions};
    use std::path::Path;

    fn score(pos: &str, ea: &str, oa: Option<&str>, accession: &str, row_nr: u64) -> ScoreVariant {
        ScoreVariant::from_raw("1", pos, ea, oa, 0.5, accession, row_nr).unwrap()
    }

    fn targets(bim: &str) -> TargetPartitions {
        let mut loader = TargetLoader::new(TargetOptions::default());
        loader.load_reader(bim.as_bytes(), Path::new("t.bim")).unwrap();
        loader.finish()
    }

    fn statuses(result: &PartitionResult) -> Vec<MatchStatus> {
        result.outcomes.iter().map(|o| o.status).collect()
    }

    #[test]
    fn test_end_to_end_partition() {
        let t = targets("1\trs123\t0\t1000\tG\tA\n");
        let engine = MatchingEngine::new(MatchingConfig::default());
        let result = engine.match_partition("1", &[score("1000", "A", Some("G"), "PGS1", 0)], t.get("1"));

        let matched: Vec<&VariantOutcome> = result.matched().collect();
        assert_eq!(matched.len(), 1);
        let m = matched[0].target_match.as_ref().unwrap();
        assert_eq!(m.target.id, "rs123");
        assert_eq!(m.match_type, MatchType::Altref);
        assert_eq!(m.effect_allele, "A");
        assert_eq!(m.other_allele.as_deref(), Some("G"));
        assert!((matched[0].score.effect_weight - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unmatched_and_missing_partition() {
        let t = targets("1\trs1\t0\t1000\tG\tA\n");
        let engine = MatchingEngine::new(MatchingConfig::default());
        let rows = [score("2000", "A", Some("G"), "PGS1", 0)];

        let result = engine.match_partition("1", &rows, t.get("1"));
        assert_eq!(statuses(&result), vec![MatchStatus::Unmatched]);

        let no_targets = engine.match_partition("1", &rows, None);
        assert_eq!(statuses(&no_targets), vec![MatchStatus::Unmatched]);
        assert!(no_targets.outcomes[0].target_match.is_none());
    }

    #[test]
    fn test_duplicate_score_rows_keep_first_by_row_nr() {
        let t = targets("1\trs1\t0\t1000\tG\tA\n");
        let engine = MatchingEngine::new(MatchingConfig::default());
        // Deliberately out of row order
        let rows = [
            score("1000", "A", Some("G"), "PGS1", 5),
            score("1000", "A", Some("G"), "PGS1", 2),
            score("1000", "A", Some("G"), "PGS2", 3),
        ];
        let result = engine.match_partition("1", &rows, t.get("1"));

        let row_nrs: Vec<u64> = result.matched().map(|o| o.score.row_nr).collect();
        assert_eq!(row_nrs, vec![2, 3]);
        let duplicate: Vec<u64> = result
            .not_matched()
            .filter(|o| o.status == MatchStatus::Duplicate)
            .map(|o| o.score.row_nr)
            .collect();
        assert_eq!(duplicate, vec![5]);
    }

    #[test]
    fn test_duplicate_target_id_excludes_all_by_default() {
        // Two score rows for the same site with different allele spellings
        let t = targets("1\trs1\t0\t1000\tG\tA\n");
        let rows = [
            score("1000", "A", Some("G"), "PGS1", 0),
            score("1000", "A", None, "PGS1", 1),
            score("1000", "A", None, "PGS2", 2),
        ];

        let engine = MatchingEngine::new(MatchingConfig::default());
        let result = engine.match_partition("1", &rows, t.get("1"));
        assert_eq!(
            statuses(&result),
            vec![
                MatchStatus::Excluded(ExclusionReason::DuplicateId),
                MatchStatus::Excluded(ExclusionReason::DuplicateId),
                MatchStatus::Matched,
            ]
        );

        let keep_first = MatchingEngine::new(MatchingConfig {
            keep_first_match: true,
            ..MatchingConfig::default()
        });
        let result = keep_first.match_partition("1", &rows, t.get("1"));
        assert_eq!(
            statuses(&result),
            vec![
                MatchStatus::Matched,
                MatchStatus::Excluded(ExclusionReason::DuplicateId),
                MatchStatus::Matched,
            ]
        );
    }

    #[test]
    fn test_ambiguous_flagged_or_removed() {
        let t = targets("1\trs1\t0\t1000\tA\tT\n");
        let rows = [score("1000", "T", Some("A"), "PGS1", 0)];

        let engine = MatchingEngine::new(MatchingConfig::default());
        let result = engine.match_partition("1", &rows, t.get("1"));
        assert_eq!(statuses(&result), vec![MatchStatus::Matched]);
        assert!(result.outcomes[0].target_match.as_ref().unwrap().ambiguous);

        let strict = MatchingEngine::new(MatchingConfig {
            remove_ambiguous: true,
            ..MatchingConfig::default()
        });
        let result = strict.match_partition("1", &rows, t.get("1"));
        assert_eq!(
            statuses(&result),
            vec![MatchStatus::Excluded(ExclusionReason::Ambiguous)]
        );
    }

    #[test]
    fn test_run_merges_in_chromosome_order() {
        let mut loader = TargetLoader::new(TargetOptions::default());
        loader
            .load_reader(
                "10\trs10\t0\t100\tC\tT\n2\trs2\t0\t100\tC\tT\nX\trsX\t0\t100\tC\tT\n".as_bytes(),
                Path::new("t.bim"),
            )
            .unwrap();
        let t = loader.finish();

        let scores = ScoreTable::from_variants(vec![
            ScoreVariant::from_raw("X", "100", "T", Some("C"), 1.0, "PGS1", 0).unwrap(),
            ScoreVariant::from_raw("10", "100", "T", Some("C"), 1.0, "PGS1", 1).unwrap(),
            ScoreVariant::from_raw("2", "100", "T", Some("C"), 1.0, "PGS1", 2).unwrap(),
            ScoreVariant::from_raw("5", "100", "T", Some("C"), 1.0, "PGS1", 3).unwrap(),
        ]);

        let engine = MatchingEngine::new(MatchingConfig {
            threads: Some(2),
            ..MatchingConfig::default()
        });
        let results = engine.run(&scores, &t).unwrap();

        let chroms: Vec<&str> = results.partitions().iter().map(|p| p.chrom.as_str()).collect();
        assert_eq!(chroms, vec!["2", "5", "10", "X"]);
        assert_eq!(results.matched().count(), 3);
    }

    #[test]
    fn test_run_is_deterministic() {
        let t = targets("1\trs1\t0\t100\tA\tG\n1\trs2\t0\t200\tC\tT\n1\trs3\t0\t200\tC\tG\n");
        let scores = ScoreTable::from_variants(vec![
            score("100", "G", None, "PGS1", 0),
            score("200", "C", None, "PGS1", 1),
            score("200", "T", Some("C"), "PGS2", 2),
        ]);
        let engine = MatchingEngine::new(MatchingConfig::default());

        let first = engine.run(&scores, &t).unwrap();
        let second = engine.run(&scores, &t).unwrap();
        let outcomes = |r: &MatchResults| r.outcomes().cloned().collect::<Vec<_>>();
        assert_eq!(outcomes(&first), outcomes(&second));
    }
}
