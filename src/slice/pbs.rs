//! Protobuf wire types for variant slices.
//!
//! The message structs are maintained by hand with explicit field tags, so
//! no `protoc` step is needed at build time; the binary layout is plain
//! proto3.  A slice stream is a sequence of length-delimited [`VcfSlice`]
//! messages, each self-describing: the dictionary precedes the records that
//! reference it.

/// Per-chunk dictionaries shared by all records of one slice.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct Dictionary {
    /// Distinct FILTER strings in first-seen order.
    #[prost(string, repeated, tag = "1")]
    pub filters: Vec<String>,
    /// Index of the default FILTER string.
    #[prost(uint32, tag = "2")]
    pub default_filter: u32,
    /// Distinct colon-joined FORMAT strings in first-seen order.
    #[prost(string, repeated, tag = "3")]
    pub formats: Vec<String>,
    /// Index of the default FORMAT string.
    #[prost(uint32, tag = "4")]
    pub default_format: u32,
    /// Distinct INFO key names in first-seen order.
    #[prost(string, repeated, tag = "5")]
    pub info_keys: Vec<String>,
    /// Ascending indices of the INFO keys present in most records.
    #[prost(uint32, repeated, tag = "6")]
    pub default_info_keys: Vec<u32>,
    /// Distinct GT tokens in first-seen order.
    #[prost(string, repeated, tag = "7")]
    pub gts: Vec<String>,
    /// Index of the default GT token.
    #[prost(uint32, tag = "8")]
    pub default_gt: u32,
    /// Distinct sample names in first-seen order.
    #[prost(string, repeated, tag = "9")]
    pub samples: Vec<String>,
}

/// One retained sample of a slice record.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct SampleEntry {
    /// Index into the dictionary sample name table.
    #[prost(uint32, tag = "1")]
    pub sample_index: u32,
    /// Index into the GT dictionary; unset means the chunk default GT (only
    /// meaningful when the record's FORMAT contains GT).
    #[prost(uint32, optional, tag = "2")]
    pub gt_index: Option<u32>,
    /// Non-GT values, aligned to the record's FORMAT keys minus GT.
    #[prost(string, repeated, tag = "3")]
    pub values: Vec<String>,
}

/// One variant, delta-encoded against its chunk.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct SliceRecord {
    /// Start position relative to the chunk base position.
    #[prost(int64, tag = "1")]
    pub relative_start: i64,
    /// Inclusive end position relative to the chunk base position.
    #[prost(int64, tag = "2")]
    pub relative_end: i64,
    /// Trimmed reference allele.
    #[prost(string, tag = "3")]
    pub reference: String,
    /// Trimmed alternate allele.
    #[prost(string, tag = "4")]
    pub alternate: String,
    /// Alternate alleles of sibling records kept as genotype context.
    #[prost(string, repeated, tag = "5")]
    pub secondary_alternates: Vec<String>,
    /// Record identifiers.
    #[prost(string, repeated, tag = "6")]
    pub ids: Vec<String>,
    /// Quality shifted by one; `0` encodes an absent quality so a true
    /// quality of `0` stays representable.
    #[prost(float, tag = "7")]
    pub quality: f32,
    /// Index into the FILTER dictionary; unset means the chunk default.
    #[prost(uint32, optional, tag = "8")]
    pub filter_index: Option<u32>,
    /// Index into the FORMAT dictionary; unset means the chunk default.
    #[prost(uint32, optional, tag = "9")]
    pub format_index: Option<u32>,
    /// Whether `info_key_indices` replaces the chunk default INFO key set.
    #[prost(bool, tag = "10")]
    pub info_keys_explicit: bool,
    /// Ascending INFO key indices; only meaningful with
    /// `info_keys_explicit`.
    #[prost(uint32, repeated, tag = "11")]
    pub info_key_indices: Vec<u32>,
    /// INFO values aligned to the present key set in ascending dictionary
    /// order.
    #[prost(string, repeated, tag = "12")]
    pub info_values: Vec<String>,
    /// Retained samples.
    #[prost(message, repeated, tag = "13")]
    pub samples: Vec<SampleEntry>,
}

/// One encoded chunk: dictionary plus delta records.
#[derive(Clone, PartialEq, prost::Message, serde::Serialize, serde::Deserialize)]
pub struct VcfSlice {
    /// Chromosome name.
    #[prost(string, tag = "1")]
    pub chromosome: String,
    /// Base genomic position of the chunk.
    #[prost(int64, tag = "2")]
    pub base_position: i64,
    /// The chunk dictionary.
    #[prost(message, optional, tag = "3")]
    pub dictionary: Option<Dictionary>,
    /// The encoded records.
    #[prost(message, repeated, tag = "4")]
    pub records: Vec<SliceRecord>,
}
