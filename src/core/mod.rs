//! Canonical variant records shared by the loaders, the matching engine and
//! the writers.
//!
//! - [`ScoreVariant`]: one weighted variant contributed by one score accession
//! - [`TargetVariant`]: one variant genotyped in the target dataset
//! - [`MatchType`], [`MatchStatus`]: how (and whether) a score variant matched
//! - [`EffectType`]: the genetic model a weight applies to
//!
//! ## Normalization
//!
//! Raw text is normalized on the way in so that matching can compare strings
//! directly:
//!
//! | Field | Raw | Canonical |
//! |-------|-----|-----------|
//! | chromosome | `chr1`, `CHR1`, `1` | `1` |
//! | chromosome | `chrM`, `M`, `MT` | `MT` |
//! | allele | `a`, ` A ` | `A` |
//! | allele | `""`, `.`, `NA`, `0` | absent (`None`) |
//!
//! An absent other allele selects the no-other-allele match strategies, so it
//! is always `None` and never an empty string.

pub mod allele;
pub mod chromosome;
pub mod types;
pub mod variant;

pub use types::{EffectType, ExclusionReason, MatchStatus, MatchType};
pub use variant::{FormatError, ScoreVariant, TargetVariant, VariantKey};
