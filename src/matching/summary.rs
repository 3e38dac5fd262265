//! Cross-chromosome merge of partition results and match statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::{ExclusionReason, MatchStatus, MatchType};
use crate::matching::engine::{PartitionResult, VariantOutcome};

/// Partition results of a whole run, in chromosome order
#[derive(Debug, Clone, Default)]
pub struct MatchResults {
    partitions: Vec<PartitionResult>,
}

impl MatchResults {
    /// Wrap partition results that are already in chromosome order
    #[must_use]
    pub fn new(partitions: Vec<PartitionResult>) -> Self {
        Self { partitions }
    }

    #[must_use]
    pub fn partitions(&self) -> &[PartitionResult] {
        &self.partitions
    }

    /// Every scoring-file row, chromosome by chromosome, in row_nr order
    pub fn outcomes(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.partitions.iter().flat_map(|p| p.outcomes.iter())
    }

    /// Rows that made it into the output
    pub fn matched(&self) -> impl Iterator<Item = &VariantOutcome> {
        self.partitions.iter().flat_map(|p| p.matched())
    }

    #[must_use]
    pub fn statistics(&self) -> MatchStatistics {
        MatchStatistics::from_outcomes(self.outcomes())
    }
}

/// Counts over every scoring-file row of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStatistics {
    pub total_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicates: usize,
    /// Matched or excluded rows flagged strand-ambiguous
    pub ambiguous: usize,
    /// Matched or excluded rows at multiallelic target sites
    pub multiallelic: usize,
    pub excluded: BTreeMap<ExclusionReason, usize>,
    /// Match type of the rows that made it into the output
    pub match_types: BTreeMap<MatchType, usize>,
}

impl MatchStatistics {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a VariantOutcome>) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            stats.total_rows += 1;
            match outcome.status {
                MatchStatus::Matched => stats.matched += 1,
                MatchStatus::Unmatched => stats.unmatched += 1,
                MatchStatus::Duplicate => stats.duplicates += 1,
                MatchStatus::Excluded(reason) => *stats.excluded.entry(reason).or_insert(0) += 1,
            }

            if let Some(m) = &outcome.target_match {
                if m.ambiguous {
                    stats.ambiguous += 1;
                }
                if m.multiallelic {
                    stats.multiallelic += 1;
                }
                if outcome.is_matched() {
                    *stats.match_types.entry(m.match_type).or_insert(0) += 1;
                }
            }
        }
        stats
    }

    #[must_use]
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }
}
