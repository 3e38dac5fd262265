//! Command-line interface for pgs-match.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **match**: Match a combined scoring file against a target dataset's variants
//!
//! ## Usage
//!
//! ```text
//! # Match against per-chromosome plink2 variant files
//! pgs-match match --scorefile combined.txt.gz --target chr1.pvar --target chr2.pvar \
//!     --dataset cohort --outdir results/
//!
//! # Require 75% of each score's variants to match, dropping scores that don't
//! pgs-match match --scorefile combined.txt --target cohort.bim --dataset cohort \
//!     --min-overlap 0.75 --exclude-failing
//!
//! # JSON summary for scripting
//! pgs-match --format json match --scorefile combined.txt --target cohort.bim --dataset cohort
//! ```

use clap::{Parser, Subcommand};

pub mod match_cmd;

#[derive(Parser)]
#[command(name = "pgs-match")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Match polygenic scoring file variants to target genotype variants")]
#[command(
    long_about = "pgs-match reconciles a combined polygenic scoring file with the variants genotyped in a target dataset.\n\nEach scoring-file variant is matched to a target variant despite differences in strand, allele order, multiallelic splitting and missing other alleles. It writes:\n- Matched scoring files ready for scoring, combined or one per score\n- A gzipped log explaining the fate of every scoring-file row\n- A JSON summary with per-score match rates"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match scoring-file variants to a target dataset
    Match(match_cmd::MatchArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
