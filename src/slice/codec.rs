//! Delta encoding and decoding of variants against a chunk dictionary.

use indexmap::IndexMap;

use super::dictionary::{build_dictionary, ChunkDictionary, Options};
use super::{pbs, Error};
use crate::variant::{SampleCall, Variant};

/// Resolve a dictionary entry by index.
fn lookup<'a>(
    set: &'a indexmap::IndexSet<String>,
    index: usize,
    what: &str,
) -> Result<&'a String, Error> {
    set.get_index(index).ok_or_else(|| {
        Error::DictionaryMismatch(format!(
            "{} index {} out of range for {} entries",
            what,
            index,
            set.len()
        ))
    })
}

/// Resolve a dictionary index by entry.
fn lookup_index(
    set: &indexmap::IndexSet<String>,
    value: &str,
    what: &str,
) -> Result<usize, Error> {
    set.get_index_of(value).ok_or_else(|| {
        Error::DictionaryMismatch(format!("{} value {:?} not in dictionary", what, value))
    })
}

/// Ascending dictionary indices of the variant's present INFO keys.
fn info_key_indices(variant: &Variant, dictionary: &ChunkDictionary) -> Result<Vec<usize>, Error> {
    let mut indices = variant
        .info
        .keys()
        .map(|key| lookup_index(&dictionary.info_keys, key, "INFO key"))
        .collect::<Result<Vec<_>, _>>()?;
    indices.sort_unstable();
    Ok(indices)
}

/// Encode one variant as a delta record against its chunk.
///
/// Fields equal to the chunk defaults are left unset; deviations are encoded
/// as explicit dictionary indices.  Fails with [`Error::OutOfChunkRange`]
/// when the variant does not fit the chunk and with
/// [`Error::DictionaryMismatch`] when a value is missing from the
/// dictionary.
pub fn encode(
    variant: &Variant,
    dictionary: &ChunkDictionary,
    base_position: i64,
    chunk_size: i64,
) -> Result<pbs::SliceRecord, Error> {
    let relative_start = variant.start - base_position;
    let relative_end = variant.end - base_position;
    // An insertion anchored at the last chunk position may end one base
    // past the chunk, hence the asymmetric bounds.
    if relative_start < 0
        || relative_start >= chunk_size
        || relative_end < 0
        || relative_end > chunk_size
    {
        return Err(Error::OutOfChunkRange {
            start: variant.start,
            end: variant.end,
            base_position,
            chunk_size,
        });
    }

    let filter_index = lookup_index(&dictionary.filters, &variant.filter, "FILTER")?;
    let filter_index = (filter_index != dictionary.default_filter).then_some(filter_index as u32);

    let format_joined = variant.format.join(":");
    let format_index = lookup_index(&dictionary.formats, &format_joined, "FORMAT")?;
    let format_index = (format_index != dictionary.default_format).then_some(format_index as u32);

    let present_info_keys = info_key_indices(variant, dictionary)?;
    let info_keys_explicit = present_info_keys != dictionary.default_info_keys;
    let info_values = present_info_keys
        .iter()
        .map(|&index| {
            let key = lookup(&dictionary.info_keys, index, "INFO key")?;
            Ok(variant.info.get(key).cloned().unwrap_or_default())
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let has_gt = variant.format.iter().any(|key| key == "GT");
    let non_gt_keys: Vec<&String> = variant.format.iter().filter(|key| *key != "GT").collect();
    let samples = variant
        .samples
        .iter()
        .map(|sample| {
            let sample_index = lookup_index(&dictionary.samples, &sample.sample, "sample")?;
            let gt_index = if has_gt {
                let token = sample.genotype().unwrap_or(".");
                let index = lookup_index(&dictionary.gts, token, "GT")?;
                (index != dictionary.default_gt).then_some(index as u32)
            } else {
                None
            };
            let values = non_gt_keys
                .iter()
                .map(|key| {
                    sample
                        .values
                        .get(*key)
                        .cloned()
                        .unwrap_or_else(|| String::from("."))
                })
                .collect();
            Ok(pbs::SampleEntry {
                sample_index: sample_index as u32,
                gt_index,
                values,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(pbs::SliceRecord {
        relative_start,
        relative_end,
        reference: variant.reference.clone(),
        alternate: variant.alternate.clone(),
        secondary_alternates: variant.secondary_alternates.clone(),
        ids: variant.ids.clone(),
        quality: variant.quality.map(|quality| quality + 1.0).unwrap_or(0.0),
        filter_index,
        format_index,
        info_keys_explicit,
        info_key_indices: if info_keys_explicit {
            present_info_keys.iter().map(|&index| index as u32).collect()
        } else {
            Vec::new()
        },
        info_values,
        samples,
    })
}

/// Decode one delta record back into a full variant.
///
/// Unset fields resolve to the chunk defaults; any index that cannot be
/// resolved is a hard [`Error::DictionaryMismatch`] failure, never silently
/// replaced by a default.
pub fn decode(
    record: &pbs::SliceRecord,
    dictionary: &ChunkDictionary,
    chromosome: &str,
    base_position: i64,
) -> Result<Variant, Error> {
    let start = base_position + record.relative_start;
    let end = base_position + record.relative_end;

    let filter_index = record
        .filter_index
        .map(|index| index as usize)
        .unwrap_or(dictionary.default_filter);
    let filter = lookup(&dictionary.filters, filter_index, "FILTER")?.clone();

    let format_index = record
        .format_index
        .map(|index| index as usize)
        .unwrap_or(dictionary.default_format);
    let format_joined = lookup(&dictionary.formats, format_index, "FORMAT")?;
    let format: Vec<String> = if format_joined.is_empty() {
        Vec::new()
    } else {
        format_joined.split(':').map(ToString::to_string).collect()
    };

    let present_info_keys: Vec<usize> = if record.info_keys_explicit {
        record
            .info_key_indices
            .iter()
            .map(|&index| index as usize)
            .collect()
    } else {
        dictionary.default_info_keys.clone()
    };
    if present_info_keys.len() != record.info_values.len() {
        return Err(Error::DictionaryMismatch(format!(
            "{} INFO keys but {} INFO values",
            present_info_keys.len(),
            record.info_values.len()
        )));
    }
    let mut info = IndexMap::new();
    for (&index, value) in present_info_keys.iter().zip(record.info_values.iter()) {
        let key = lookup(&dictionary.info_keys, index, "INFO key")?;
        info.insert(key.clone(), value.clone());
    }

    let quality = if record.quality == 0.0 {
        None
    } else {
        Some(record.quality - 1.0)
    };

    let has_gt = format.iter().any(|key| key == "GT");
    let non_gt_count = format.len() - usize::from(has_gt);
    let mut samples = Vec::new();
    for entry in &record.samples {
        let name = lookup(&dictionary.samples, entry.sample_index as usize, "sample")?.clone();

        if entry.values.len() != non_gt_count {
            return Err(Error::DictionaryMismatch(format!(
                "sample {:?} carries {} values for {} non-GT FORMAT keys",
                name,
                entry.values.len(),
                non_gt_count
            )));
        }

        let mut values = IndexMap::new();
        let mut non_gt_values = entry.values.iter();
        for key in &format {
            if key == "GT" {
                let gt_index = entry
                    .gt_index
                    .map(|index| index as usize)
                    .unwrap_or(dictionary.default_gt);
                let token = lookup(&dictionary.gts, gt_index, "GT")?.clone();
                values.insert(key.clone(), token);
            } else {
                let value = non_gt_values.next().expect("length checked above");
                values.insert(key.clone(), value.clone());
            }
        }

        samples.push(SampleCall {
            sample: name,
            values,
        });
    }

    Ok(Variant {
        chromosome: chromosome.to_string(),
        start,
        end,
        ids: record.ids.clone(),
        reference: record.reference.clone(),
        alternate: record.alternate.clone(),
        secondary_alternates: record.secondary_alternates.clone(),
        quality,
        filter,
        info,
        format,
        samples,
    })
}

/// Encode one chunk of variants into a slice.
///
/// The dictionary is built from the full batch first (a barrier), then every
/// record is encoded against it.  Variants that do not fit the chunk are
/// logged and skipped; dictionary mismatches abort the whole chunk.
pub fn encode_slice(
    chromosome: &str,
    base_position: i64,
    chunk_size: i64,
    variants: &[Variant],
    options: &Options,
) -> Result<pbs::VcfSlice, Error> {
    let dictionary = build_dictionary(variants, options);

    let mut records = Vec::with_capacity(variants.len());
    for variant in variants {
        match encode(variant, &dictionary, base_position, chunk_size) {
            Ok(record) => records.push(record),
            Err(e @ Error::OutOfChunkRange { .. }) => {
                tracing::warn!("skipping record: {}", e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(pbs::VcfSlice {
        chromosome: chromosome.to_string(),
        base_position,
        dictionary: Some((&dictionary).into()),
        records,
    })
}

/// Decode all records of a slice.
///
/// The dictionary is deserialized up front; without it no record can be
/// decoded.
pub fn decode_slice(slice: &pbs::VcfSlice) -> Result<Vec<Variant>, Error> {
    let dictionary = slice
        .dictionary
        .as_ref()
        .ok_or_else(|| Error::DictionaryMismatch(String::from("slice without dictionary")))?;
    let dictionary: ChunkDictionary = dictionary.try_into()?;

    slice
        .records
        .iter()
        .map(|record| decode(record, &dictionary, &slice.chromosome, slice.base_position))
        .collect()
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{build_dictionary, ChunkDictionary};
    use crate::variant::{SampleCall, Variant};

    fn call(name: &str, gt: &str, dp: &str) -> SampleCall {
        SampleCall {
            sample: name.to_string(),
            values: IndexMap::from([
                (String::from("GT"), gt.to_string()),
                (String::from("DP"), dp.to_string()),
            ]),
        }
    }

    fn batch() -> Vec<Variant> {
        vec![
            Variant {
                chromosome: String::from("1"),
                start: 1000,
                end: 1000,
                ids: vec![String::from("rs100")],
                reference: String::from("A"),
                alternate: String::from("C"),
                secondary_alternates: vec![String::from("G")],
                quality: Some(29.0),
                filter: String::from("PASS"),
                info: IndexMap::from([(String::from("DP"), String::from("14"))]),
                format: vec![String::from("GT"), String::from("DP")],
                samples: vec![call("S1", "1/1", "10"), call("S2", "0/0", "7")],
            },
            Variant {
                chromosome: String::from("1"),
                start: 1042,
                end: 1042,
                ids: vec![],
                reference: String::from("T"),
                alternate: String::new(),
                secondary_alternates: vec![],
                quality: Some(0.0),
                filter: String::from("q10"),
                info: IndexMap::from([
                    (String::from("DP"), String::from("11")),
                    (String::from("DB"), String::new()),
                ]),
                format: vec![String::from("GT"), String::from("DP")],
                samples: vec![call("S1", "0/0", "12")],
            },
            Variant {
                chromosome: String::from("1"),
                start: 1100,
                end: 1100,
                ids: vec![],
                reference: String::from("G"),
                alternate: String::from("T"),
                secondary_alternates: vec![],
                quality: None,
                filter: String::from("PASS"),
                info: IndexMap::from([(String::from("DP"), String::from("9"))]),
                format: vec![String::from("GT"), String::from("DP")],
                samples: vec![call("S2", "0/0", "8")],
            },
        ]
    }

    fn dictionary() -> ChunkDictionary {
        build_dictionary(&batch(), &Default::default())
    }

    #[test]
    fn roundtrip_batch() -> Result<(), anyhow::Error> {
        let variants = batch();
        let slice = super::encode_slice("1", 1000, 1000, &variants, &Default::default())?;
        let decoded = super::decode_slice(&slice)?;

        assert_eq!(decoded, variants);

        Ok(())
    }

    #[rstest]
    #[case(Some(0.0), 1.0)]
    #[case(Some(29.0), 30.0)]
    #[case(None, 0.0)]
    fn quality_sentinel(#[case] quality: Option<f32>, #[case] encoded: f32) -> Result<(), anyhow::Error> {
        let mut variant = batch().remove(0);
        variant.quality = quality;
        let dictionary = dictionary();

        let record = super::encode(&variant, &dictionary, 1000, 1000)?;
        assert!(float_cmp::approx_eq!(f32, record.quality, encoded, ulps = 2));

        let decoded = super::decode(&record, &dictionary, "1", 1000)?;
        assert_eq!(decoded.quality, quality);

        Ok(())
    }

    #[test]
    fn default_fields_are_unset() -> Result<(), anyhow::Error> {
        let variants = batch();
        let dictionary = dictionary();

        // First variant matches the chunk defaults for FILTER, FORMAT, the
        // INFO key set, and S2's genotype.
        let record = super::encode(&variants[0], &dictionary, 1000, 1000)?;
        assert_eq!(record.filter_index, None);
        assert_eq!(record.format_index, None);
        assert!(!record.info_keys_explicit);
        assert!(record.info_key_indices.is_empty());
        assert_eq!(record.samples[0].gt_index, Some(0));
        assert_eq!(record.samples[1].gt_index, None);

        // Second variant deviates in FILTER and INFO keys.
        let record = super::encode(&variants[1], &dictionary, 1000, 1000)?;
        assert_eq!(record.filter_index, Some(1));
        assert!(record.info_keys_explicit);
        assert_eq!(record.info_key_indices, vec![0, 1]);
        assert_eq!(
            record.info_values,
            vec![String::from("11"), String::new()]
        );

        Ok(())
    }

    #[test]
    fn out_of_chunk_range() {
        let variants = batch();
        let dictionary = dictionary();

        assert!(matches!(
            super::encode(&variants[2], &dictionary, 1000, 100),
            Err(super::Error::OutOfChunkRange { .. })
        ));
        assert!(matches!(
            super::encode(&variants[0], &dictionary, 1042, 1000),
            Err(super::Error::OutOfChunkRange { .. })
        ));
    }

    #[test]
    fn out_of_range_records_are_skipped_in_slices() -> Result<(), anyhow::Error> {
        let variants = batch();
        let slice = super::encode_slice("1", 1000, 100, &variants, &Default::default())?;

        // The third variant (start 1100) does not fit a 100 base chunk.
        assert_eq!(slice.records.len(), 2);

        Ok(())
    }

    #[test]
    fn dictionary_mismatch_on_decode() -> Result<(), anyhow::Error> {
        let variants = batch();
        let mut slice = super::encode_slice("1", 1000, 1000, &variants, &Default::default())?;

        // Truncating the GT dictionary invalidates sample references.
        slice
            .dictionary
            .as_mut()
            .expect("dictionary present")
            .gts
            .truncate(1);

        assert!(matches!(
            super::decode_slice(&slice),
            Err(super::Error::DictionaryMismatch(_))
        ));

        Ok(())
    }

    #[test]
    fn dictionary_mismatch_on_encode() {
        let variants = batch();
        let dictionary = build_dictionary(&variants[1..], &Default::default());

        // The first variant's genotype is not in a dictionary built without it.
        assert!(matches!(
            super::encode(&variants[0], &dictionary, 1000, 1000),
            Err(super::Error::DictionaryMismatch(_))
        ));
    }

    #[test]
    fn format_without_gt() -> Result<(), anyhow::Error> {
        let variant = Variant {
            chromosome: String::from("1"),
            start: 1010,
            end: 1010,
            reference: String::from("A"),
            alternate: String::from("G"),
            filter: String::from("PASS"),
            format: vec![String::from("DP")],
            samples: vec![SampleCall {
                sample: String::from("S1"),
                values: IndexMap::from([(String::from("DP"), String::from("13"))]),
            }],
            ..Default::default()
        };
        let variants = vec![variant];

        let slice = super::encode_slice("1", 1000, 1000, &variants, &Default::default())?;
        assert_eq!(slice.records[0].samples[0].gt_index, None);

        let decoded = super::decode_slice(&slice)?;
        assert_eq!(decoded, variants);

        Ok(())
    }
}
