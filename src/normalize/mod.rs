//! Normalization of VCF records into single-allele variants.
//!
//! Also implements the `normalize` subcommand.

use std::io::Write;

use noodles_vcf as vcf;
use thousands::Separable;

use crate::common::{self, open_read_maybe_gz, open_write_maybe_gz};
use crate::variant::{SampleCall, VcfRecord, Variant};

pub mod keyfields;

/// Errors that can occur during normalization.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The reference and alternate allele are indistinguishable.
    #[error("invalid allele at {position}: {reference:?} vs. {alternate:?}")]
    InvalidAllele {
        /// 1-based position of the record.
        position: i64,
        /// Reference allele.
        reference: String,
        /// Alternate allele.
        alternate: String,
    },
    /// A GT token that is not integers/missing separated by `/` or `|`.
    #[error("non-standard genotype token: {token:?}")]
    NonStandardGenotype {
        /// The offending token.
        token: String,
    },
}

/// A parsed GT token.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GenotypeToken {
    /// Allele entries; `None` encodes missing (`.`).
    alleles: Vec<Option<usize>>,
    /// Separators between entries, `/` or `|`.
    separators: Vec<char>,
}

/// Parse one allele entry of a GT token.
fn parse_gt_allele(entry: &str, token: &str) -> Result<Option<usize>, Error> {
    if entry == "." {
        Ok(None)
    } else {
        entry
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::NonStandardGenotype {
                token: token.to_string(),
            })
    }
}

/// Parse a GT token into allele entries and separators.
fn parse_genotype(token: &str) -> Result<GenotypeToken, Error> {
    let mut alleles = Vec::new();
    let mut separators = Vec::new();
    let mut current = String::new();

    for c in token.chars() {
        if c == '/' || c == '|' {
            alleles.push(parse_gt_allele(&current, token)?);
            separators.push(c);
            current.clear();
        } else {
            current.push(c);
        }
    }
    alleles.push(parse_gt_allele(&current, token)?);

    Ok(GenotypeToken {
        alleles,
        separators,
    })
}

/// Whether a sample with this genotype is retained for the given 1-based
/// alternate allele index.
///
/// Retained iff the genotype references the allele, or consists entirely of
/// reference and missing entries.
fn applies_to_allele(gt: &GenotypeToken, allele: usize) -> bool {
    gt.alleles.contains(&Some(allele))
        || gt.alleles.iter().all(|a| matches!(a, None | Some(0)))
}

/// Rewrite a genotype for the derived single-allele variant.
///
/// The given allele becomes `1`; any other non-reference allele also maps to
/// `1` while its original index is reported so the caller can attach the
/// corresponding alternate as context.  Separators are kept.
fn remap_genotype(gt: &GenotypeToken, allele: usize) -> (String, Vec<usize>) {
    let mut others = Vec::new();
    let mut token = String::new();

    for (i, entry) in gt.alleles.iter().enumerate() {
        if i > 0 {
            token.push(gt.separators[i - 1]);
        }
        match entry {
            None => token.push('.'),
            Some(0) => token.push('0'),
            Some(j) if *j == allele => token.push('1'),
            Some(j) => {
                token.push('1');
                if !others.contains(j) {
                    others.push(*j);
                }
            }
        }
    }

    (token, others)
}

/// Derive the normalized variant for one alternate allele of `record`.
fn derive_variant(record: &VcfRecord, allele: usize) -> Result<Variant, Error> {
    let key_fields = keyfields::resolve(
        record.position,
        &record.reference,
        &record.alternates[allele - 1],
    )?;

    let has_gt = record.format.iter().any(|key| key == "GT");
    let mut samples = Vec::new();
    let mut secondary_indices: Vec<usize> = Vec::new();

    for sample in &record.samples {
        if !has_gt {
            // No genotype evidence to split on; keep the sample.
            samples.push(sample.clone());
            continue;
        }

        let token = sample.genotype().unwrap_or(".");
        let gt = match parse_genotype(token) {
            Ok(gt) => gt,
            Err(e) => {
                tracing::warn!(
                    "skipping sample {} at {}:{}: {}",
                    &sample.sample,
                    &record.chromosome,
                    record.position,
                    e
                );
                continue;
            }
        };
        if gt
            .alleles
            .iter()
            .flatten()
            .any(|&j| j > record.alternates.len())
        {
            tracing::warn!(
                "skipping sample {} at {}:{}: genotype {:?} references unknown allele",
                &sample.sample,
                &record.chromosome,
                record.position,
                token
            );
            continue;
        }

        if !applies_to_allele(&gt, allele) {
            continue;
        }

        let (token, others) = remap_genotype(&gt, allele);
        for j in others {
            if !secondary_indices.contains(&j) {
                secondary_indices.push(j);
            }
        }

        let mut values = sample.values.clone();
        values.insert(String::from("GT"), token);
        samples.push(SampleCall {
            sample: sample.sample.clone(),
            values,
        });
    }

    secondary_indices.sort_unstable();
    let secondary_alternates = secondary_indices
        .iter()
        .map(|&j| record.alternates[j - 1].clone())
        .collect();

    Ok(Variant {
        chromosome: record.chromosome.clone(),
        start: key_fields.start,
        end: key_fields.end,
        ids: record.ids.clone(),
        reference: key_fields.reference,
        alternate: key_fields.alternate,
        secondary_alternates,
        quality: record.quality,
        filter: record.filter.clone(),
        info: record.info.clone(),
        format: record.format.clone(),
        samples,
    })
}

/// Explode one possibly multi-allelic record into normalized single-allele
/// variants.
///
/// Failures are per-allele and per-sample: an invalid allele or a
/// non-standard genotype is logged and skipped, the rest of the record is
/// still processed.
pub fn normalize(record: &VcfRecord) -> Vec<Variant> {
    if record.chromosome.is_empty() || record.position < 1 {
        tracing::warn!(
            "skipping record without usable locus: {:?}:{}",
            &record.chromosome,
            record.position
        );
        return Vec::new();
    }

    let mut result = Vec::new();
    for allele in 1..=record.alternates.len() {
        match derive_variant(record, allele) {
            Ok(variant) => result.push(variant),
            Err(e) => {
                tracing::warn!(
                    "skipping allele {} of record at {}:{}: {}",
                    allele,
                    &record.chromosome,
                    record.position,
                    e
                );
            }
        }
    }

    result
}

/// Command line arguments for `normalize` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "normalize a VCF file to JSONL", long_about = None)]
pub struct Args {
    /// Maximal number of variants to write out; optional.
    #[clap(long)]
    pub max_var_count: Option<usize>,
    /// Path to input VCF file.
    #[clap(long)]
    pub path_in: String,
    /// Path to output JSONL file.
    #[clap(long)]
    pub path_out: String,
}

/// Main entry point for `normalize` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    tracing::info!("opening input file...");
    let reader = open_read_maybe_gz(&args.path_in)
        .map_err(|e| anyhow::anyhow!("could not open input file {}: {}", &args.path_in, e))?;
    let mut reader = vcf::Reader::new(reader);
    let header = reader
        .read_header()
        .map_err(|e| anyhow::anyhow!("problem reading VCF header: {}", e))?;

    tracing::info!("opening output file...");
    let mut writer = open_write_maybe_gz(&args.path_out)
        .map_err(|e| anyhow::anyhow!("could not open output file {}: {}", &args.path_out, e))?;

    common::trace_rss_now();

    let start = std::time::Instant::now();
    let mut prev = std::time::Instant::now();
    let mut total_written = 0usize;
    'outer: for record in reader.records(&header) {
        let record = record.map_err(|e| anyhow::anyhow!("problem reading VCF record: {}", e))?;
        let record = VcfRecord::from_vcf(&record, &header)?;

        if prev.elapsed().as_secs() >= 60 {
            tracing::info!("at {}:{}", &record.chromosome, record.position);
            prev = std::time::Instant::now();
        }

        for variant in normalize(&record) {
            let json = serde_json::to_string(&variant)
                .map_err(|e| anyhow::anyhow!("problem serializing variant: {}", e))?;
            writeln!(writer, "{}", json)
                .map_err(|e| anyhow::anyhow!("problem writing output: {}", e))?;

            total_written += 1;
            if let Some(max_var_count) = args.max_var_count {
                if total_written >= max_var_count {
                    tracing::warn!(
                        "stopping after {} variants as requested by --max-var-count",
                        total_written
                    );
                    break 'outer;
                }
            }
        }
    }
    writer
        .flush()
        .map_err(|e| anyhow::anyhow!("problem flushing output: {}", e))?;
    tracing::info!(
        "... wrote {} variants in {:?}",
        total_written.separate_with_commas(),
        start.elapsed()
    );

    tracing::info!(
        "All of `normalize` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
