//! Computation of minimal key fields for one reference/alternate pair.

use super::Error;

/// Canonical, trimmed representation of a single allele.
///
/// `reference` and `alternate` share no leading bases; trailing bases are
/// kept as-is.  For pure insertions `reference` is empty and the coordinates
/// anchor the insertion point; for pure deletions `alternate` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyFields {
    /// 1-based start position.
    pub start: i64,
    /// 1-based inclusive end position.
    pub end: i64,
    /// Trimmed reference allele.
    pub reference: String,
    /// Trimmed alternate allele.
    pub alternate: String,
}

/// Return the first byte index at which the two alleles differ.
///
/// When one allele is a prefix of the other the index is the length of the
/// shorter one.  Must not be called with identical alleles.
fn index_of_difference(reference: &str, alternate: &str) -> usize {
    reference
        .bytes()
        .zip(alternate.bytes())
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| std::cmp::min(reference.len(), alternate.len()))
}

/// Compute the minimal-spanning key fields for `(position, reference, alternate)`.
///
/// Dispatches on the relative allele lengths: same-length substitutions,
/// pure insertions (empty reference), pure deletions (empty alternate), and
/// general indels.  A shared leading prefix is trimmed in all cases; after
/// trimming, insertions anchor one base before the first inserted base while
/// deletions and substitutions start at the first differing base.
pub fn resolve(position: i64, reference: &str, alternate: &str) -> Result<KeyFields, Error> {
    if reference == alternate {
        return Err(Error::InvalidAllele {
            position,
            reference: reference.to_string(),
            alternate: alternate.to_string(),
        });
    }

    let len_ref = reference.len() as i64;
    let len_alt = alternate.len() as i64;

    if reference.is_empty() {
        // Pure insertion, anchored before the insertion point.
        return Ok(KeyFields {
            start: position - 1,
            end: position + len_alt,
            reference: String::new(),
            alternate: alternate.to_string(),
        });
    }
    if alternate.is_empty() {
        // Pure deletion.
        return Ok(KeyFields {
            start: position,
            end: position + len_ref - 1,
            reference: reference.to_string(),
            alternate: String::new(),
        });
    }

    let i = index_of_difference(reference, alternate);

    if len_ref == len_alt {
        // Substitution-like; spans from the first differing base.
        return Ok(KeyFields {
            start: position + i as i64,
            end: position + len_alt - 1,
            reference: reference[i..].to_string(),
            alternate: alternate[i..].to_string(),
        });
    }

    if i == 0 {
        if len_ref > len_alt {
            // Deletion-anchored indel without shared prefix.
            Ok(KeyFields {
                start: position,
                end: position + len_ref - 1,
                reference: reference.to_string(),
                alternate: alternate.to_string(),
            })
        } else {
            // Insertion-anchored indel without shared prefix.
            Ok(KeyFields {
                start: position - 1,
                end: position + len_alt,
                reference: reference.to_string(),
                alternate: alternate.to_string(),
            })
        }
    } else {
        let end = position + std::cmp::max(len_ref, len_alt) - 1;
        let start = if len_ref > len_alt {
            position + i as i64
        } else {
            // The trimmed reference may be empty; anchor on the last shared base.
            position + i as i64 - 1
        };
        Ok(KeyFields {
            start,
            end,
            reference: reference[i..].to_string(),
            alternate: alternate[i..].to_string(),
        })
    }
}
