//! Scoring-file to target variant matching.
//!
//! - [`MatchingEngine`]: runs the strategy cascade per chromosome partition
//! - [`strategy`]: the individual match strategies and candidate selection
//! - [`OverlapReport`]: per-accession match rates and the minimum-overlap check
//! - [`MatchResults`], [`MatchStatistics`]: merged results of a run
//!
//! ## Matching Algorithm
//!
//! For each score variant the target rows at the same chromosome and position
//! are tried with these strategies, best first:
//!
//! | Match type | Effect allele | Other allele |
//! |------------|---------------|--------------|
//! | `refalt` | REF | ALT |
//! | `altref` | ALT | REF |
//! | `refalt_flip` | complement is REF | complement is ALT |
//! | `altref_flip` | complement is ALT | complement is REF |
//! | `no_oa_ref` | REF | absent |
//! | `no_oa_alt` | ALT | absent |
//! | `no_oa_ref_flip` | complement is REF | absent |
//! | `no_oa_alt_flip` | complement is ALT | absent |
//!
//! Flip strategies are skipped when the score pair is palindromic. A match
//! against a palindromic target pair, or a no-other-allele match at a position
//! with several target rows, is flagged ambiguous.
//!
//! Effect weights are never changed: the output re-expresses the effect
//! allele on the target strand, so the weight still belongs to it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgs_match::matching::{MatchingConfig, MatchingEngine, OverlapReport};
//! use pgs_match::parsing::scorefile::{load_scorefile, ScoreFilter};
//! use pgs_match::parsing::target::{TargetLoader, TargetOptions};
//! use std::path::Path;
//!
//! let scores = load_scorefile(Path::new("combined.txt"), &ScoreFilter::default()).unwrap();
//! let mut loader = TargetLoader::new(TargetOptions::default());
//! loader.load_file(Path::new("cohort.pvar")).unwrap();
//! let targets = loader.finish();
//!
//! let engine = MatchingEngine::new(MatchingConfig::default());
//! let results = engine.run(&scores, &targets).unwrap();
//! let report = OverlapReport::evaluate(&results, scores.accessions(), Some(0.75));
//!
//! for outcome in &report.outcomes {
//!     println!("{}: {:?}", outcome.accession, outcome.match_rate);
//! }
//! ```

pub mod engine;
pub mod overlap;
pub mod strategy;
pub mod summary;

pub use engine::{MatchError, MatchingConfig, MatchingEngine, VariantOutcome};
pub use overlap::{MatchOutcome, OverlapError, OverlapReport};
pub use summary::{MatchResults, MatchStatistics};
