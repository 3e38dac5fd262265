//! # pgs-match
//!
//! A library for matching polygenic scoring file variants to the variants
//! genotyped in a target dataset.
//!
//! A polygenic score is a list of variants with effect weights. Before a
//! cohort can be scored, every scoring-file variant has to be found among the
//! cohort's genotyped variants. The same variant can be written on the other
//! strand, with its alleles swapped, split over several rows at a
//! multiallelic site, or with its other allele missing.
//!
//! `pgs-match` resolves these cases with an ordered cascade of match
//! strategies and reports, per score, how much of it could be matched.
//!
//! ## Features
//!
//! - **Strand and allele-order matching**: exact, swapped and complemented
//!   allele pairs, best first
//! - **Missing other alleles**: effect-allele-only matching with ambiguity flags
//! - **Multiallelic sites**: the best match among all target rows at a position
//! - **Duplicate handling**: repeated score rows and rows sharing a target
//!   variant are reported, never summed
//! - **Overlap check**: per-score match rates against a minimum
//! - **Parallel**: chromosomes are matched independently on a worker pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgs_match::{MatchingConfig, MatchingEngine, OverlapReport};
//! use pgs_match::parsing::scorefile::{load_scorefile, ScoreFilter};
//! use pgs_match::parsing::target::{TargetLoader, TargetOptions};
//! use std::path::Path;
//!
//! let scores = load_scorefile(Path::new("combined.txt.gz"), &ScoreFilter::default()).unwrap();
//!
//! let mut loader = TargetLoader::new(TargetOptions::default());
//! loader.load_file(Path::new("cohort.bim")).unwrap();
//! let targets = loader.finish();
//!
//! let engine = MatchingEngine::new(MatchingConfig::default());
//! let results = engine.run(&scores, &targets).unwrap();
//!
//! let report = OverlapReport::evaluate(&results, scores.accessions(), Some(0.75));
//! report.check().unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Variant records, allele and chromosome normalization
//! - [`parsing`]: Loaders for scoring files and target variant files
//! - [`matching`]: Matching engine, overlap check and statistics
//! - [`output`]: Writers for matched scoring files, the match log and the summary
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod matching;
pub mod output;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::{EffectType, MatchStatus, MatchType, ScoreVariant, TargetVariant};
pub use crate::matching::{MatchResults, MatchingConfig, MatchingEngine, OverlapError, OverlapReport};
