//! Implementation of `slice decode` subcommand.

use std::io::Write;

use prost::Message;
use thousands::Separable;

use super::{codec, pbs};
use crate::common::{self, open_write_maybe_gz};

/// Command line arguments for `slice decode` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "decode binary slices to JSONL", long_about = None)]
pub struct Args {
    /// Path to input slice file.
    #[clap(long)]
    pub path_in: String,
    /// Path to output JSONL file.
    #[clap(long)]
    pub path_out: String,
}

/// Main entry point for `slice decode` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("reading input file...");
    let bytes = std::fs::read(&args.path_in)
        .map_err(|e| anyhow::anyhow!("could not read input file {}: {}", &args.path_in, e))?;

    tracing::info!("opening output file...");
    let mut writer = open_write_maybe_gz(&args.path_out)
        .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?;

    common::trace_rss_now();

    let start = std::time::Instant::now();
    let mut total_slices = 0usize;
    let mut total_written = 0usize;
    let mut rest: &[u8] = &bytes;
    while !rest.is_empty() {
        let slice = pbs::VcfSlice::decode_length_delimited(&mut rest)
            .map_err(|e| anyhow::anyhow!("problem decoding slice: {}", e))?;
        total_slices += 1;

        // The dictionary must be restored before any record of the slice
        // can be decoded.
        let variants = codec::decode_slice(&slice).map_err(|e| {
            anyhow::anyhow!(
                "problem decoding slice at {}:{}: {}",
                &slice.chromosome,
                slice.base_position,
                e
            )
        })?;
        for variant in &variants {
            let json = serde_json::to_string(variant)
                .map_err(|e| anyhow::anyhow!("problem serializing variant: {}", e))?;
            writeln!(writer, "{}", json)
                .map_err(|e| anyhow::anyhow!("problem writing output: {}", e))?;
            total_written += 1;
        }
    }
    writer
        .flush()
        .map_err(|e| anyhow::anyhow!("problem flushing output: {}", e))?;
    tracing::info!(
        "... decoded {} variants from {} slices in {:?}",
        total_written.separate_with_commas(),
        total_slices.separate_with_commas(),
        start.elapsed()
    );

    tracing::info!(
        "All of `slice decode` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
