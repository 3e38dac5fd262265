use serde::{Deserialize, Serialize};

/// How a scoring-file variant was matched to a target variant.
///
/// Variants are declared in priority order, so the derived `Ord` ranks a
/// better match as smaller. The name reads from the scoring file's side:
/// `Refalt` means the effect allele is the target REF and the other allele
/// is the target ALT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// effect == REF, other == ALT
    Refalt,
    /// effect == ALT, other == REF
    Altref,
    /// complemented effect == REF, complemented other == ALT
    RefaltFlip,
    /// complemented effect == ALT, complemented other == REF
    AltrefFlip,
    /// No other allele, effect == REF
    NoOaRef,
    /// No other allele, effect == ALT
    NoOaAlt,
    /// No other allele, complemented effect == REF
    NoOaRefFlip,
    /// No other allele, complemented effect == ALT
    NoOaAltFlip,
}

impl MatchType {
    /// Every match type, best first.
    pub const ALL: [MatchType; 8] = [
        Self::Refalt,
        Self::Altref,
        Self::RefaltFlip,
        Self::AltrefFlip,
        Self::NoOaRef,
        Self::NoOaAlt,
        Self::NoOaRefFlip,
        Self::NoOaAltFlip,
    ];

    /// True when the match was found on the complemented strand
    #[must_use]
    pub fn is_flip(self) -> bool {
        matches!(
            self,
            Self::RefaltFlip | Self::AltrefFlip | Self::NoOaRefFlip | Self::NoOaAltFlip
        )
    }

    /// True for strategies that require the scoring file to carry an other allele
    #[must_use]
    pub fn requires_other_allele(self) -> bool {
        matches!(
            self,
            Self::Refalt | Self::Altref | Self::RefaltFlip | Self::AltrefFlip
        )
    }

    /// True when the effect allele lines up with the target REF allele
    #[must_use]
    pub fn effect_is_ref(self) -> bool {
        matches!(
            self,
            Self::Refalt | Self::RefaltFlip | Self::NoOaRef | Self::NoOaRefFlip
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refalt => "refalt",
            Self::Altref => "altref",
            Self::RefaltFlip => "refalt_flip",
            Self::AltrefFlip => "altref_flip",
            Self::NoOaRef => "no_oa_ref",
            Self::NoOaAlt => "no_oa_alt",
            Self::NoOaRefFlip => "no_oa_ref_flip",
            Self::NoOaAltFlip => "no_oa_alt_flip",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Genetic model a weight applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    #[default]
    Additive,
    Dominant,
    Recessive,
}

impl EffectType {
    /// Parse an `effect_type` column value
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "additive" => Some(Self::Additive),
            "dominant" | "is_dominant" => Some(Self::Dominant),
            "recessive" | "is_recessive" => Some(Self::Recessive),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Additive => "additive",
            Self::Dominant => "dominant",
            Self::Recessive => "recessive",
        }
    }
}

impl std::fmt::Display for EffectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a matched variant was dropped from the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Strand-ambiguous match and ambiguous matches were asked to be removed
    Ambiguous,
    /// Another row of the same accession resolved to the same target variant
    DuplicateId,
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::DuplicateId => write!(f, "duplicate_id"),
        }
    }
}

/// Final state of one scoring-file row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    Unmatched,
    Excluded(ExclusionReason),
    /// Same accession, position and alleles as an earlier row
    Duplicate,
}

impl MatchStatus {
    #[must_use]
    pub fn is_matched(self) -> bool {
        matches!(self, Self::Matched)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Unmatched => write!(f, "unmatched"),
            Self::Excluded(reason) => write!(f, "excluded_{reason}"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}
