use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::cli::OutputFormat;
use crate::matching::{
    MatchResults, MatchStatistics, MatchingConfig, MatchingEngine, OverlapError, OverlapReport,
};
use crate::output::log::write_match_log;
use crate::output::scorefile::ScorefileWriter;
use crate::output::summary::{write_summary, InputCounts, RunSettings, RunSummary};
use crate::parsing::scorefile::{load_scorefile, ScoreFilter};
use crate::parsing::target::{TargetLoader, TargetOptions};
use crate::utils::validation::{parse_fraction, validate_label};

#[derive(Args)]
pub struct MatchArgs {
    /// Combined scoring file (tab-separated, optionally gzipped)
    #[arg(long, required = true)]
    pub scorefile: PathBuf,

    /// Target variant file (.bim or .pvar, optionally gzipped); repeat for
    /// per-chromosome files
    #[arg(long, required = true)]
    pub target: Vec<PathBuf>,

    /// Label of the target dataset, used in output file names
    #[arg(long, required = true, value_parser = parse_dataset)]
    pub dataset: String,

    /// Directory for output files
    #[arg(short, long, default_value = ".")]
    pub outdir: PathBuf,

    /// Minimum fraction of each score's variants that must match (0-1)
    #[arg(long, value_parser = parse_fraction)]
    pub min_overlap: Option<f64>,

    /// Write one combined scoring file instead of one per accession
    #[arg(long)]
    pub no_split: bool,

    /// Worker threads (defaults to all available cores)
    #[arg(short = 't', long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub threads: Option<usize>,

    /// Exclude strand-ambiguous matches instead of flagging them
    #[arg(long)]
    pub remove_ambiguous: bool,

    /// Never match on the complemented strand
    #[arg(long)]
    pub skip_flip: bool,

    /// Keep the first score row when several resolve to one target variant
    #[arg(long)]
    pub keep_first_match: bool,

    /// Drop target positions with more than one REF/ALT pair
    #[arg(long)]
    pub remove_multiallelic: bool,

    /// Only match variants on this chromosome; repeatable
    #[arg(long = "chrom")]
    pub chromosomes: Vec<String>,

    /// Only match this score accession; repeatable
    #[arg(long = "accession")]
    pub accessions: Vec<String>,

    /// Drop scores below the minimum overlap instead of aborting
    #[arg(long)]
    pub exclude_failing: bool,

    /// Do not write the gzipped match log
    #[arg(long)]
    pub no_log: bool,
}

fn parse_dataset(raw: &str) -> Result<String, String> {
    validate_label(raw)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

impl MatchArgs {
    fn config(&self) -> MatchingConfig {
        MatchingConfig {
            threads: self.threads,
            remove_ambiguous: self.remove_ambiguous,
            skip_flip: self.skip_flip,
            keep_first_match: self.keep_first_match,
        }
    }
}

/// Execute match subcommand
///
/// # Errors
///
/// Returns an error if an input cannot be parsed or an output cannot be
/// written. An accession without variants always fails the run; one below
/// the minimum overlap fails it unless `--exclude-failing` is set.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let filter = ScoreFilter::new(&args.chromosomes, &args.accessions)?;
    let scores = load_scorefile(&args.scorefile, &filter)
        .with_context(|| format!("Failed to load scoring file {}", args.scorefile.display()))?;

    let mut loader = TargetLoader::new(TargetOptions {
        remove_multiallelic: args.remove_multiallelic,
    });
    for path in &args.target {
        let loaded = loader
            .load_file(path)
            .with_context(|| format!("Failed to load target variants {}", path.display()))?;
        if verbose {
            eprintln!("Loaded {loaded} target variants from {}", path.display());
        }
    }
    let targets = loader.finish();
    if targets.is_empty() {
        anyhow::bail!("No target variants left after loading");
    }

    let engine = MatchingEngine::new(args.config());
    let results = engine.run(&scores, &targets)?;
    let statistics = results.statistics();
    let report = OverlapReport::evaluate(&results, scores.accessions(), args.min_overlap);
    report.log();

    std::fs::create_dir_all(&args.outdir)
        .with_context(|| format!("Failed to create output directory {}", args.outdir.display()))?;

    // Only a threshold failure may be narrowed to the passing accessions;
    // any other failure leaves no scoring file behind
    let writer = ScorefileWriter::new(&args.outdir, &args.dataset, !args.no_split)?;
    let (files, failure): (Vec<PathBuf>, Option<anyhow::Error>) = match report.check() {
        Ok(()) => (write_scorefiles(&writer, &results, None)?, None),
        Err(e @ OverlapError::BelowThreshold { .. }) if args.exclude_failing => {
            let passing = report.passing_accessions();
            if passing.is_empty() {
                writer.remove_previous()?;
                (Vec::new(), Some(anyhow::anyhow!("{e}; no accession left to write")))
            } else {
                warn!("{e}; excluding failing accessions from the scoring files");
                (write_scorefiles(&writer, &results, Some(&passing))?, None)
            }
        }
        Err(e) => {
            writer.remove_previous()?;
            (Vec::new(), Some(e.into()))
        }
    };

    if !args.no_log {
        write_match_log(&args.outdir, &args.dataset, results.outcomes(), &report)?;
    }

    let inputs = InputCounts {
        score_variants: scores.len(),
        target_variants: targets.len(),
        target_duplicates_removed: targets.duplicates_removed,
        target_multiallelic_rows: targets.multiallelic_rows,
        target_multiallelic_removed: targets.multiallelic_removed,
    };
    let settings = RunSettings {
        matching: engine.config(),
        remove_multiallelic: args.remove_multiallelic,
        min_overlap: args.min_overlap,
        exclude_failing: args.exclude_failing,
        split: !args.no_split,
    };
    let summary = RunSummary::new(
        &args.dataset,
        settings,
        inputs,
        &report.outcomes,
        &statistics,
    )
    .with_files(&files);
    write_summary(&args.outdir, &summary)?;

    match format {
        OutputFormat::Text => print_text_summary(&args.dataset, &report, &statistics, verbose),
        OutputFormat::Json => print_json_summary(&summary)?,
        OutputFormat::Tsv => print_tsv_summary(&report),
    }

    failure.map_or(Ok(()), Err)
}

fn write_scorefiles(
    writer: &ScorefileWriter,
    results: &MatchResults,
    only: Option<&BTreeSet<&str>>,
) -> anyhow::Result<Vec<PathBuf>> {
    let outcomes = results
        .matched()
        .filter(|o| only.map_or(true, |keep| keep.contains(o.score.accession.as_str())));
    let files = writer.write(outcomes)?;
    info!("Wrote {} scoring file(s)", files.len());
    Ok(files)
}

fn print_text_summary(
    dataset: &str,
    report: &OverlapReport,
    statistics: &MatchStatistics,
    verbose: bool,
) {
    println!("Dataset: {dataset}");
    println!(
        "Scoring-file rows: {} ({} matched, {} unmatched, {} excluded, {} duplicate)",
        statistics.total_rows,
        statistics.matched,
        statistics.unmatched,
        statistics.excluded_total(),
        statistics.duplicates
    );
    println!();
    println!(
        "{:<20} {:>10} {:>10} {:>9}  Status",
        "Accession", "Matched", "Total", "Rate"
    );
    for outcome in &report.outcomes {
        let rate = outcome
            .match_rate
            .map_or_else(|| "NA".to_string(), |r| format!("{:.2}%", r * 100.0));
        let status = if outcome.pass { "PASS" } else { "FAIL" };
        println!(
            "{:<20} {:>10} {:>10} {:>9}  {}",
            outcome.accession, outcome.variants_matched, outcome.variants_total, rate, status
        );
    }

    if verbose {
        println!();
        println!("Match types:");
        for (match_type, count) in &statistics.match_types {
            println!("  {match_type:<16} {count}");
        }
        println!("  ambiguous        {}", statistics.ambiguous);
        println!("  multiallelic     {}", statistics.multiallelic);
    }
}

fn print_json_summary(summary: &RunSummary<'_>) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn print_tsv_summary(report: &OverlapReport) {
    println!("accession\tvariants_matched\tvariants_total\tmatch_rate\tduplicates\texcluded\tambiguous\tpass");
    for o in &report.outcomes {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            o.accession,
            o.variants_matched,
            o.variants_total,
            o.match_rate.map_or_else(|| "NA".to_string(), |r| format!("{r:.4}")),
            o.duplicates,
            o.excluded,
            o.ambiguous.len(),
            o.pass
        );
    }
}
