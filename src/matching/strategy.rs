//! Match strategies.
//!
//! Each [`MatchType`] is a pure function of the score alleles and one target
//! row. [`best_candidate`] walks the strategies in priority order over every
//! target row at the position and keeps the first hit.

use crate::core::variant::QueryAlleles;
use crate::core::{MatchType, ScoreVariant, TargetVariant};

/// Options that disable parts of the strategy cascade
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyOptions {
    /// Never try the complemented strand
    pub skip_flip: bool,
}

/// The surviving match of one score variant
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate<'t> {
    pub target: &'t TargetVariant,
    pub match_type: MatchType,
    /// Effect allele as written on the target strand
    pub effect_allele: String,
    /// Other allele as written on the target strand
    pub other_allele: Option<String>,
    pub ambiguous: bool,
    pub multiallelic: bool,
}

/// Apply one strategy to one target row.
///
/// Returns the effect and other allele re-expressed on the target strand, or
/// `None` when the strategy does not match.
#[must_use]
pub fn apply(
    match_type: MatchType,
    query: &QueryAlleles<'_>,
    target: &TargetVariant,
) -> Option<(String, Option<String>)> {
    let target_ref = target.ref_allele.as_deref();
    let target_alt = target.alt_allele.as_deref();

    // (effect on target strand, other on target strand)
    let (effect, other) = match match_type {
        MatchType::Refalt | MatchType::Altref => (query.effect, Some(query.other?)),
        MatchType::RefaltFlip | MatchType::AltrefFlip => {
            (query.effect_flip.as_str(), Some(query.other_flip.as_deref()?))
        }
        MatchType::NoOaRef | MatchType::NoOaAlt => {
            if query.other.is_some() {
                return None;
            }
            (query.effect, None)
        }
        MatchType::NoOaRefFlip | MatchType::NoOaAltFlip => {
            if query.other.is_some() {
                return None;
            }
            (query.effect_flip.as_str(), None)
        }
    };

    let (effect_slot, other_slot) = if match_type.effect_is_ref() {
        (target_ref, target_alt)
    } else {
        (target_alt, target_ref)
    };

    if effect_slot != Some(effect) {
        return None;
    }

    match other {
        Some(other) if other_slot == Some(other) => {
            Some((effect.to_string(), Some(other.to_string())))
        }
        Some(_) => None,
        // The remaining target allele becomes the other allele
        None => Some((effect.to_string(), other_slot.map(str::to_string))),
    }
}

/// Strategies worth trying for a score variant, best first
fn applicable_strategies(
    variant: &ScoreVariant,
    options: StrategyOptions,
) -> impl Iterator<Item = MatchType> {
    let has_other = variant.other_allele.is_some();
    // A palindromic score pair reads the same on both strands, so a flip
    // match would be indistinguishable from a same-strand one.
    let allow_flip = !options.skip_flip && !variant.is_strand_ambiguous();

    MatchType::ALL.into_iter().filter(move |match_type| {
        match_type.requires_other_allele() == has_other && (allow_flip || !match_type.is_flip())
    })
}

/// Resolve a score variant against the target rows at its position.
///
/// The best match type wins; among rows matching with the same type the
/// first-seen target row wins.
#[must_use]
pub fn best_candidate<'t>(
    variant: &ScoreVariant,
    targets: &[&'t TargetVariant],
    options: StrategyOptions,
) -> Option<MatchCandidate<'t>> {
    if targets.is_empty() {
        return None;
    }

    let query = QueryAlleles::new(variant);
    for match_type in applicable_strategies(variant, options) {
        for &target in targets {
            if let Some((effect_allele, other_allele)) = apply(match_type, &query, target) {
                let ambiguous = target.is_strand_ambiguous()
                    || (!match_type.requires_other_allele() && targets.len() > 1);
                return Some(MatchCandidate {
                    target,
                    match_type,
                    effect_allele,
                    other_allele,
                    ambiguous,
                    multiallelic: target.is_multiallelic,
                });
            }
        }
    }

    None
}
