//! VCF slice worker main executable

pub mod common;
pub mod normalize;
pub mod slice;
pub mod variant;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "VCF normalization and slice compression",
    long_about = "This tool normalizes VCF sequence variants and converts them to and from compact binary slices"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Variant normalization.
    Normalize(normalize::Args),
    /// Slice related commands.
    Slice(Slice),
}

/// Parsing of "slice *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Slice {
    /// The sub command to run
    #[command(subcommand)]
    command: SliceCommands,
}

/// Enum supporting the parsing of "slice *" sub commands.
#[derive(Debug, Subcommand)]
enum SliceCommands {
    Encode(slice::encode::Args),
    Decode(slice::decode::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        tracing::info!("vcfslice {}", common::VERSION);
        match &cli.command {
            Commands::Normalize(args) => {
                normalize::run(&cli.common, args)?;
            }
            Commands::Slice(slice) => match &slice.command {
                SliceCommands::Encode(args) => {
                    slice::encode::run(&cli.common, args)?;
                }
                SliceCommands::Decode(args) => {
                    slice::decode::run(&cli.common, args)?;
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
