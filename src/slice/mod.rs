//! Compact, dictionary-compressed slice encoding of normalized variants.
//!
//! A slice covers one genomic chunk: a contiguous run of variants that share
//! a base position and a set of dictionaries.  Records within a slice only
//! store deltas from the chunk defaults.

pub mod codec;
pub mod decode;
pub mod dictionary;
pub mod encode;
pub mod pbs;

/// Errors that can occur during slice encoding/decoding.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// A variant does not fit the chunk it was assigned to.
    #[error(
        "variant at {start}..={end} outside of chunk at {base_position} with size {chunk_size}"
    )]
    OutOfChunkRange {
        /// 1-based variant start.
        start: i64,
        /// 1-based inclusive variant end.
        end: i64,
        /// Base position of the chunk.
        base_position: i64,
        /// Configured chunk size.
        chunk_size: i64,
    },
    /// A dictionary lookup failed; the data and the dictionary do not belong
    /// together.
    #[error("dictionary mismatch: {0}")]
    DictionaryMismatch(String),
}
