use clap::Parser;
use tracing_subscriber::EnvFilter;

use pgs_match::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("pgs_match=debug,info")
    } else {
        EnvFilter::new("pgs_match=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Match(args) => {
            cli::match_cmd::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
