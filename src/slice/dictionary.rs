//! Construction of per-chunk dictionaries.

use indexmap::{IndexMap, IndexSet};

use super::{pbs, Error};
use crate::variant::Variant;

/// Options controlling dictionary defaults.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// FILTER string to force as the chunk default; when unset, the most
    /// frequent value wins.
    pub default_filter: Option<String>,
}

/// Ordered per-chunk dictionaries with their default entries.
///
/// Append-only while being built; index-stable and read-only once built.
/// Indices are 0-based positions in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkDictionary {
    /// Distinct FILTER strings.
    pub filters: IndexSet<String>,
    /// Index of the default FILTER string.
    pub default_filter: usize,
    /// Distinct colon-joined FORMAT strings.
    pub formats: IndexSet<String>,
    /// Index of the default FORMAT string.
    pub default_format: usize,
    /// Distinct individual INFO key names.
    pub info_keys: IndexSet<String>,
    /// Ascending indices of the INFO keys present in more than half of the
    /// chunk's variants.
    pub default_info_keys: Vec<usize>,
    /// Distinct raw GT tokens.
    pub gts: IndexSet<String>,
    /// Index of the default GT token.
    pub default_gt: usize,
    /// Distinct sample names.
    pub samples: IndexSet<String>,
}

/// Index of the entry with the strictly highest count; ties keep the
/// first-seen entry.
fn most_frequent(counts: &IndexMap<String, usize>) -> usize {
    let mut best = 0;
    let mut best_count = 0;
    for (index, count) in counts.values().enumerate() {
        if *count > best_count {
            best = index;
            best_count = *count;
        }
    }
    best
}

/// Build the dictionaries for one chunk of normalized variants.
///
/// This must complete before any record of the chunk is encoded; the result
/// is immutable afterwards and can be shared across concurrent encode calls.
pub fn build_dictionary(variants: &[Variant], options: &Options) -> ChunkDictionary {
    let mut filter_counts: IndexMap<String, usize> = IndexMap::new();
    let mut format_counts: IndexMap<String, usize> = IndexMap::new();
    let mut info_key_counts: IndexMap<String, usize> = IndexMap::new();
    let mut gt_counts: IndexMap<String, usize> = IndexMap::new();
    let mut samples = IndexSet::new();

    // A configured default filter is always the first dictionary entry.
    if let Some(default_filter) = options.default_filter.as_ref() {
        filter_counts.insert(default_filter.clone(), 0);
    }

    for variant in variants {
        *filter_counts.entry(variant.filter.clone()).or_default() += 1;
        *format_counts.entry(variant.format.join(":")).or_default() += 1;
        for key in variant.info.keys() {
            *info_key_counts.entry(key.clone()).or_default() += 1;
        }

        let has_gt = variant.format.iter().any(|key| key == "GT");
        for sample in &variant.samples {
            samples.insert(sample.sample.clone());
            if has_gt {
                let token = sample.genotype().unwrap_or(".");
                *gt_counts.entry(token.to_string()).or_default() += 1;
            }
        }
    }

    let default_filter = if options.default_filter.is_some() {
        0
    } else {
        most_frequent(&filter_counts)
    };
    let default_format = most_frequent(&format_counts);
    let default_gt = most_frequent(&gt_counts);
    let default_info_keys = info_key_counts
        .values()
        .enumerate()
        .filter(|(_, count)| **count * 2 > variants.len())
        .map(|(index, _)| index)
        .collect();

    ChunkDictionary {
        filters: filter_counts.keys().cloned().collect(),
        default_filter,
        formats: format_counts.keys().cloned().collect(),
        default_format,
        info_keys: info_key_counts.keys().cloned().collect(),
        default_info_keys,
        gts: gt_counts.keys().cloned().collect(),
        default_gt,
        samples,
    }
}

impl From<&ChunkDictionary> for pbs::Dictionary {
    fn from(dictionary: &ChunkDictionary) -> Self {
        Self {
            filters: dictionary.filters.iter().cloned().collect(),
            default_filter: dictionary.default_filter as u32,
            formats: dictionary.formats.iter().cloned().collect(),
            default_format: dictionary.default_format as u32,
            info_keys: dictionary.info_keys.iter().cloned().collect(),
            default_info_keys: dictionary
                .default_info_keys
                .iter()
                .map(|&index| index as u32)
                .collect(),
            gts: dictionary.gts.iter().cloned().collect(),
            default_gt: dictionary.default_gt as u32,
            samples: dictionary.samples.iter().cloned().collect(),
        }
    }
}

/// Rebuild an ordered set from wire data, rejecting duplicate entries.
fn checked_index_set(values: &[String], what: &str) -> Result<IndexSet<String>, Error> {
    let mut result = IndexSet::new();
    for value in values {
        if !result.insert(value.clone()) {
            return Err(Error::DictionaryMismatch(format!(
                "duplicate {} dictionary entry {:?}",
                what, value
            )));
        }
    }
    Ok(result)
}

/// Validate a default index against its dictionary size.
fn checked_default(index: u32, len: usize, what: &str) -> Result<usize, Error> {
    let index = index as usize;
    if index >= len && len > 0 {
        return Err(Error::DictionaryMismatch(format!(
            "default {} index {} out of range for {} entries",
            what, index, len
        )));
    }
    Ok(index)
}

impl TryFrom<&pbs::Dictionary> for ChunkDictionary {
    type Error = Error;

    fn try_from(dictionary: &pbs::Dictionary) -> Result<Self, Self::Error> {
        let filters = checked_index_set(&dictionary.filters, "FILTER")?;
        let formats = checked_index_set(&dictionary.formats, "FORMAT")?;
        let info_keys = checked_index_set(&dictionary.info_keys, "INFO key")?;
        let gts = checked_index_set(&dictionary.gts, "GT")?;
        let samples = checked_index_set(&dictionary.samples, "sample")?;

        let default_info_keys = dictionary
            .default_info_keys
            .iter()
            .map(|&index| {
                let index = index as usize;
                if index >= info_keys.len() {
                    Err(Error::DictionaryMismatch(format!(
                        "default INFO key index {} out of range for {} entries",
                        index,
                        info_keys.len()
                    )))
                } else {
                    Ok(index)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if default_info_keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(Error::DictionaryMismatch(String::from(
                "default INFO key indices are not strictly ascending",
            )));
        }

        Ok(Self {
            default_filter: checked_default(dictionary.default_filter, filters.len(), "FILTER")?,
            filters,
            default_format: checked_default(dictionary.default_format, formats.len(), "FORMAT")?,
            formats,
            info_keys,
            default_info_keys,
            default_gt: checked_default(dictionary.default_gt, gts.len(), "GT")?,
            gts,
            samples,
        })
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use crate::variant::{SampleCall, Variant};

    fn variant(filter: &str, info_keys: &[&str], gts: &[(&str, &str)]) -> Variant {
        Variant {
            chromosome: String::from("1"),
            start: 100,
            end: 100,
            reference: String::from("A"),
            alternate: String::from("C"),
            filter: filter.to_string(),
            info: info_keys
                .iter()
                .map(|key| (key.to_string(), String::from("1")))
                .collect(),
            format: vec![String::from("GT"), String::from("DP")],
            samples: gts
                .iter()
                .map(|(name, gt)| SampleCall {
                    sample: name.to_string(),
                    values: IndexMap::from([
                        (String::from("GT"), gt.to_string()),
                        (String::from("DP"), String::from("10")),
                    ]),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_are_most_frequent() {
        let variants = vec![
            variant("q10", &["DP"], &[("S1", "0/1")]),
            variant("PASS", &["DP", "DB"], &[("S1", "0/0")]),
            variant("PASS", &["DP"], &[("S1", "0/0")]),
        ];

        let dictionary = super::build_dictionary(&variants, &Default::default());

        assert_eq!(
            dictionary.filters.iter().cloned().collect::<Vec<_>>(),
            vec![String::from("q10"), String::from("PASS")]
        );
        assert_eq!(dictionary.default_filter, 1);
        assert_eq!(dictionary.default_format, 0);
        assert_eq!(
            dictionary.gts.iter().cloned().collect::<Vec<_>>(),
            vec![String::from("0/1"), String::from("0/0")]
        );
        assert_eq!(dictionary.default_gt, 1);
        // DP occurs in all three variants, DB only in one.
        assert_eq!(dictionary.default_info_keys, vec![0]);
    }

    #[test]
    fn frequency_ties_keep_first_seen() {
        let variants = vec![
            variant("q10", &[], &[("S1", "0/1")]),
            variant("PASS", &[], &[("S1", "1/1")]),
        ];

        let dictionary = super::build_dictionary(&variants, &Default::default());

        assert_eq!(dictionary.default_filter, 0);
        assert_eq!(dictionary.default_gt, 0);
    }

    #[test]
    fn configured_default_filter_comes_first() {
        let variants = vec![
            variant("q10", &[], &[("S1", "0/1")]),
            variant("q10", &[], &[("S2", "0/1")]),
        ];
        let options = super::Options {
            default_filter: Some(String::from("PASS")),
        };

        let dictionary = super::build_dictionary(&variants, &options);

        assert_eq!(
            dictionary.filters.iter().cloned().collect::<Vec<_>>(),
            vec![String::from("PASS"), String::from("q10")]
        );
        assert_eq!(dictionary.default_filter, 0);
        assert_eq!(
            dictionary.samples.iter().cloned().collect::<Vec<_>>(),
            vec![String::from("S1"), String::from("S2")]
        );
    }

    #[test]
    fn dictionary_snapshot() {
        let variants = vec![
            variant("PASS", &["DP"], &[("S1", "0/1")]),
            variant("PASS", &["DP", "DB"], &[("S2", "1/1")]),
        ];

        let dictionary = super::build_dictionary(&variants, &Default::default());

        insta::assert_debug_snapshot!(dictionary, @r###"
        ChunkDictionary {
            filters: {
                "PASS",
            },
            default_filter: 0,
            formats: {
                "GT:DP",
            },
            default_format: 0,
            info_keys: {
                "DP",
                "DB",
            },
            default_info_keys: [
                0,
            ],
            gts: {
                "0/1",
                "1/1",
            },
            default_gt: 0,
            samples: {
                "S1",
                "S2",
            },
        }
        "###);
    }

    #[test]
    fn wire_roundtrip() -> Result<(), anyhow::Error> {
        let variants = vec![
            variant("PASS", &["DP"], &[("S1", "0/1"), ("S2", "0/0")]),
            variant("q10", &["DP", "DB"], &[("S1", "1/1")]),
        ];
        let dictionary = super::build_dictionary(&variants, &Default::default());

        let wire: super::pbs::Dictionary = (&dictionary).into();
        let back: super::ChunkDictionary = (&wire).try_into()?;
        assert_eq!(back, dictionary);

        Ok(())
    }

    #[test]
    fn duplicate_wire_entries_are_rejected() {
        let wire = super::pbs::Dictionary {
            filters: vec![String::from("PASS"), String::from("PASS")],
            ..Default::default()
        };

        assert!(super::ChunkDictionary::try_from(&wire).is_err());
    }
}
