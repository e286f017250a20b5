//! Implementation of `slice encode` subcommand.

use std::io::Write;

use noodles_vcf as vcf;
use prost::Message;
use rayon::prelude::*;
use thousands::Separable;

use super::{codec, dictionary};
use crate::common::{self, open_read_maybe_gz};
use crate::normalize;
use crate::variant::{VcfRecord, Variant};

/// Command line arguments for `slice encode` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "encode a VCF file as binary slices", long_about = None)]
pub struct Args {
    /// Number of bases covered by one chunk.
    #[clap(long, default_value_t = 1000)]
    pub chunk_size: i64,
    /// FILTER value to use as the chunk default instead of the most
    /// frequent one; optional.
    #[clap(long)]
    pub default_filter: Option<String>,
    /// Number of threads to use for parallel processing; optional.
    #[clap(long)]
    pub num_threads: Option<usize>,
    /// Path to input VCF file.
    #[clap(long)]
    pub path_in: String,
    /// Path to output slice file.
    #[clap(long)]
    pub path_out: String,
}

/// A contiguous run of variants sharing one chunk.
struct Chunk {
    /// Chromosome name.
    chromosome: String,
    /// Base genomic position.
    base_position: i64,
    /// The chunk's variants.
    variants: Vec<Variant>,
}

/// Group normalized variants into chunks of `chunk_size` bases.
///
/// Grouping is by runs, so variant order is kept; a chunk boundary always
/// forces a new dictionary.
fn chunk_variants(variants: Vec<Variant>, chunk_size: i64) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    for variant in variants {
        let base_position = variant.start / chunk_size * chunk_size;
        match chunks.last_mut() {
            Some(chunk)
                if chunk.chromosome == variant.chromosome
                    && chunk.base_position == base_position =>
            {
                chunk.variants.push(variant)
            }
            _ => chunks.push(Chunk {
                chromosome: variant.chromosome.clone(),
                base_position,
                variants: vec![variant],
            }),
        }
    }
    chunks
}

/// Read all records from `reader` into memory.
fn read_records(
    reader: &mut vcf::Reader<Box<dyn std::io::BufRead>>,
    header: &vcf::Header,
) -> Result<Vec<VcfRecord>, anyhow::Error> {
    let mut prev = std::time::Instant::now();
    let mut result = Vec::new();
    for record in reader.records(header) {
        let record = record.map_err(|e| anyhow::anyhow!("problem reading VCF record: {}", e))?;
        let record = VcfRecord::from_vcf(&record, header)?;

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {}:{}", &record.chromosome, record.position);
            prev = std::time::Instant::now();
        }

        result.push(record);
    }
    Ok(result)
}

/// Main entry point for `slice encode` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    if args.chunk_size < 1 {
        anyhow::bail!("chunk size must be positive: {}", args.chunk_size);
    }
    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    tracing::info!("opening input file...");
    let reader = open_read_maybe_gz(&args.path_in)
        .map_err(|e| anyhow::anyhow!("could not open input file {}: {}", &args.path_in, e))?;
    let mut reader = vcf::Reader::new(reader);
    let header = reader
        .read_header()
        .map_err(|e| anyhow::anyhow!("problem reading VCF header: {}", e))?;

    let before_reading = std::time::Instant::now();
    let records = read_records(&mut reader, &header)?;
    tracing::info!(
        "... read {} records in {:?}",
        records.len().separate_with_commas(),
        before_reading.elapsed()
    );
    common::trace_rss_now();

    tracing::info!("normalizing...");
    let before_normalizing = std::time::Instant::now();
    let variants: Vec<Variant> = records
        .par_iter()
        .flat_map(normalize::normalize)
        .collect();
    tracing::info!(
        "... normalized into {} variants in {:?}",
        variants.len().separate_with_commas(),
        before_normalizing.elapsed()
    );

    tracing::info!("encoding slices...");
    let before_encoding = std::time::Instant::now();
    let options = dictionary::Options {
        default_filter: args.default_filter.clone(),
    };
    let chunks = chunk_variants(variants, args.chunk_size);
    let buffers = chunks
        .par_iter()
        .map(|chunk| {
            let slice = codec::encode_slice(
                &chunk.chromosome,
                chunk.base_position,
                args.chunk_size,
                &chunk.variants,
                &options,
            )
            .map_err(|e| {
                anyhow::anyhow!(
                    "problem encoding chunk at {}:{}: {}",
                    &chunk.chromosome,
                    chunk.base_position,
                    e
                )
            })?;
            Ok(slice.encode_length_delimited_to_vec())
        })
        .collect::<Result<Vec<_>, anyhow::Error>>()?;
    tracing::info!(
        "... encoded {} slices in {:?}",
        buffers.len().separate_with_commas(),
        before_encoding.elapsed()
    );

    tracing::info!("writing output...");
    let mut writer = std::fs::File::create(&args.path_out)
        .map(std::io::BufWriter::new)
        .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?;
    for buffer in &buffers {
        writer
            .write_all(buffer)
            .map_err(|e| anyhow::anyhow!("problem writing output: {}", e))?;
    }
    writer
        .flush()
        .map_err(|e| anyhow::anyhow!("problem flushing output: {}", e))?;

    tracing::info!(
        "All of `slice encode` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::variant::Variant;

    fn variant(chromosome: &str, start: i64) -> Variant {
        Variant {
            chromosome: chromosome.to_string(),
            start,
            end: start,
            reference: String::from("A"),
            alternate: String::from("C"),
            filter: String::from("PASS"),
            ..Default::default()
        }
    }

    #[test]
    fn chunking_by_position_and_chromosome() {
        let variants = vec![
            variant("1", 100),
            variant("1", 999),
            variant("1", 1000),
            variant("2", 1001),
        ];

        let chunks = super::chunk_variants(variants, 1000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chromosome, "1");
        assert_eq!(chunks[0].base_position, 0);
        assert_eq!(chunks[0].variants.len(), 2);
        assert_eq!(chunks[1].base_position, 1000);
        assert_eq!(chunks[2].chromosome, "2");
        assert_eq!(chunks[2].base_position, 1000);
    }

    #[test]
    fn smoke_test_run() -> Result<(), anyhow::Error> {
        let tmpdir = temp_testdir::TempDir::default();
        let path_out: String = tmpdir
            .join("out.bin")
            .to_str()
            .expect("invalid path")
            .into();

        let args_common = Default::default();
        let args = super::Args {
            chunk_size: 1000,
            default_filter: None,
            num_threads: None,
            path_in: "tests/data/example.vcf".into(),
            path_out: path_out.clone(),
        };
        super::run(&args_common, &args)?;

        assert!(std::path::Path::new(&path_out).exists());

        Ok(())
    }
}
