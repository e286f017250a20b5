//! In-memory representation of VCF records and normalized variants.

use indexmap::IndexMap;
use itertools::Itertools;
use noodles_vcf as vcf;

/// Per-sample call data.
///
/// The `values` map is dense over the enclosing record's FORMAT keys: values
/// that are missing in the source VCF are stored as `"."` so that records
/// survive encoding and decoding unchanged.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SampleCall {
    /// The sample name.
    pub sample: String,
    /// Mapping from FORMAT key to the sample's value.
    pub values: IndexMap<String, String>,
}

impl SampleCall {
    /// Return the raw GT token, if any.
    pub fn genotype(&self) -> Option<&str> {
        self.values.get("GT").map(|s| s.as_str())
    }
}

/// A raw, possibly multi-allelic VCF record.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VcfRecord {
    /// Chromosome name.
    pub chromosome: String,
    /// 1-based position.
    pub position: i64,
    /// Record identifiers, e.g., dbSNP IDs.
    pub ids: Vec<String>,
    /// Reference allele.
    pub reference: String,
    /// Alternate alleles (one or more).
    pub alternates: Vec<String>,
    /// Quality, if any.
    pub quality: Option<f32>,
    /// Filter string (`PASS`, `.`, or semicolon-joined failures).
    pub filter: String,
    /// INFO entries; flags map to the empty string.
    pub info: IndexMap<String, String>,
    /// FORMAT keys.
    pub format: Vec<String>,
    /// Per-sample calls, one per cohort sample.
    pub samples: Vec<SampleCall>,
}

/// A normalized single-allele variant.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    /// Chromosome name.
    pub chromosome: String,
    /// 1-based start position after trimming.
    pub start: i64,
    /// 1-based inclusive end position after trimming.
    pub end: i64,
    /// Record identifiers.
    pub ids: Vec<String>,
    /// Trimmed reference allele (empty for pure insertions).
    pub reference: String,
    /// Trimmed alternate allele (empty for pure deletions).
    pub alternate: String,
    /// Alternate alleles of sibling records that retained genotypes refer to.
    pub secondary_alternates: Vec<String>,
    /// Quality, if any.
    pub quality: Option<f32>,
    /// Filter string.
    pub filter: String,
    /// INFO entries.
    pub info: IndexMap<String, String>,
    /// FORMAT keys.
    pub format: Vec<String>,
    /// Retained per-sample calls.
    pub samples: Vec<SampleCall>,
}

/// Render an INFO value as its VCF string form.
fn info_value_to_string(value: &vcf::record::info::field::Value) -> String {
    use vcf::record::info::field::{value::Array, Value};

    match value {
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Flag => String::new(),
        Value::Character(c) => c.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(Array::Integer(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::Float(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::Character(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::String(vs)) => vs
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| String::from(".")))
            .join(","),
    }
}

/// Render a genotype field value as its VCF string form.
fn genotype_value_to_string(value: &vcf::record::genotypes::sample::Value) -> String {
    use vcf::record::genotypes::sample::{value::Array, Value};

    match value {
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Character(c) => c.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(Array::Integer(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::Float(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::Character(vs)) => vs
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_else(|| String::from(".")))
            .join(","),
        Value::Array(Array::String(vs)) => vs
            .iter()
            .map(|v| v.clone().unwrap_or_else(|| String::from(".")))
            .join(","),
    }
}

impl VcfRecord {
    /// Convert from a parsed VCF record.
    pub fn from_vcf(record: &vcf::Record, header: &vcf::Header) -> Result<Self, anyhow::Error> {
        let chromosome = record.chromosome().to_string();
        let position: usize = record.position().into();

        let ids = record.ids().iter().map(|id| id.to_string()).collect();
        let reference = record.reference_bases().to_string();
        let alternates = record
            .alternate_bases()
            .iter()
            .map(|allele| allele.to_string())
            .collect();

        let quality = record.quality_score().map(f32::from);
        let filter = match record.filters() {
            Some(vcf::record::Filters::Pass) => String::from("PASS"),
            Some(vcf::record::Filters::Fail(fails)) => fails.iter().join(";"),
            None => String::from("."),
        };

        let mut info = IndexMap::new();
        for (key, value) in record.info().as_ref().iter() {
            let value = match value {
                Some(value) => info_value_to_string(value),
                None => String::from("."),
            };
            info.insert(key.to_string(), value);
        }

        let format: Vec<String> = record
            .genotypes()
            .keys()
            .iter()
            .map(|key| key.to_string())
            .collect();

        let mut samples = Vec::new();
        for (name, sample) in header
            .sample_names()
            .iter()
            .zip(record.genotypes().values())
        {
            let mut values = IndexMap::new();
            for key in record.genotypes().keys().iter() {
                let value = match sample.get(key) {
                    Some(Some(value)) => genotype_value_to_string(value),
                    _ => String::from("."),
                };
                values.insert(key.to_string(), value);
            }
            samples.push(SampleCall {
                sample: name.clone(),
                values,
            });
        }

        Ok(Self {
            chromosome,
            position: position as i64,
            ids,
            reference,
            alternates,
            quality,
            filter,
            info,
            format,
            samples,
        })
    }
}

#[cfg(test)]
mod test {
    use noodles_vcf as vcf;
    use pretty_assertions::assert_eq;

    static HEADER: &str = "\
##fileformat=VCFv4.3
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">
##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">
##FILTER=<ID=q10,Description=\"Quality below 10\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read Depth\">
##contig=<ID=1,length=249250621>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
";

    fn read_records(body: &str) -> Result<Vec<super::VcfRecord>, anyhow::Error> {
        let text = format!("{}{}", HEADER, body);
        let mut reader = vcf::Reader::new(text.as_bytes());
        let header = reader.read_header()?;

        let mut result = Vec::new();
        for record in reader.records(&header) {
            result.push(super::VcfRecord::from_vcf(&record?, &header)?);
        }
        Ok(result)
    }

    #[test]
    fn from_vcf_multi_allelic() -> Result<(), anyhow::Error> {
        let records =
            read_records("1\t100\trs1\tA\tC,G\t29\tPASS\tDP=14\tGT:DP\t1/2:10\t0/0:7\n")?;

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.chromosome, "1");
        assert_eq!(record.position, 100);
        assert_eq!(record.ids, vec![String::from("rs1")]);
        assert_eq!(record.reference, "A");
        assert_eq!(record.alternates, vec![String::from("C"), String::from("G")]);
        assert_eq!(record.quality, Some(29.0));
        assert_eq!(record.filter, "PASS");
        assert_eq!(record.info.get("DP"), Some(&String::from("14")));
        assert_eq!(record.format, vec![String::from("GT"), String::from("DP")]);
        assert_eq!(record.samples.len(), 2);
        assert_eq!(record.samples[0].sample, "S1");
        assert_eq!(record.samples[0].genotype(), Some("1/2"));
        assert_eq!(record.samples[0].values.get("DP"), Some(&String::from("10")));
        assert_eq!(record.samples[1].genotype(), Some("0/0"));

        Ok(())
    }

    #[test]
    fn from_vcf_missing_quality_and_flag_info() -> Result<(), anyhow::Error> {
        let records = read_records("1\t1002\t.\tA\tAA\t.\tq10\tDB\tGT\t0/1\t0/0\n")?;

        let record = &records[0];
        assert_eq!(record.quality, None);
        assert_eq!(record.filter, "q10");
        assert_eq!(record.info.get("DB"), Some(&String::new()));
        assert!(record.ids.is_empty());

        Ok(())
    }
}
