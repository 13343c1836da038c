//! Helpers for sparse distributed representations given as index lists or bit vectors.
//!
//! Column sets produced by the pooler are sparse (ascending column indices), encoder output and
//! pooler input are dense (`&[bool]`). These functions convert between both forms and compare SDRs.

use crate::error::{HtmError, Result};
use fnv::FnvHasher;
use std::hash::Hasher;

/// Indices of the set bits, in ascending order.
#[inline]
pub fn dense_to_sparse(bits: &[bool]) -> Vec<usize> {
    bits.iter()
        .enumerate()
        .filter_map(|(index, &bit)| bit.then_some(index))
        .collect()
}

/// Bit vector of length `size` with the given indices set. Duplicates are allowed.
pub fn sparse_to_dense(indices: &[usize], size: usize) -> Result<Vec<bool>> {
    let mut bits = vec![false; size];
    for &index in indices {
        *bits
            .get_mut(index)
            .ok_or(HtmError::IndexOutOfBounds { index, size })? = true;
    }
    Ok(bits)
}

/// Overlap of two ascending index lists relative to the larger one: `|A ∩ B| / max(|A|, |B|)`.
///
/// Two empty SDRs are identical (1.0); an empty and a non-empty SDR share nothing (0.0).
pub fn similarity(a: &[usize], b: &[usize]) -> f64 {
    debug_assert!(a.windows(2).all(|w| w[0] < w[1]), "SDR not ascending");
    debug_assert!(b.windows(2).all(|w| w[0] < w[1]), "SDR not ascending");

    let larger = a.len().max(b.len());
    if larger == 0 {
        return 1.0;
    }

    let (mut i, mut j, mut shared) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                i += 1;
                j += 1;
            }
        }
    }

    shared as f64 / larger as f64
}

/// FNV-1a fingerprint of an index list. Equal lists always hash equal.
#[inline]
pub fn fingerprint(indices: &[usize]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write_usize(indices.len());
    for &index in indices {
        hasher.write_usize(index);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_sparse_conversion() {
        let bits = sparse_to_dense(&[1, 4, 4, 7], 8).unwrap();
        assert_eq!(bits.iter().filter(|&&b| b).count(), 3);
        assert_eq!(dense_to_sparse(&bits), vec![1, 4, 7]);
        assert_eq!(
            sparse_to_dense(&[8], 8).unwrap_err(),
            HtmError::IndexOutOfBounds { index: 8, size: 8 }
        );
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity(&[], &[]), 1.0);
        assert_eq!(similarity(&[1, 2], &[]), 0.0);
        assert_eq!(similarity(&[1, 2, 3, 4], &[1, 2, 3, 4]), 1.0);
        assert_eq!(similarity(&[1, 2, 3, 4], &[2, 4]), 0.5);
        assert_eq!(similarity(&[1, 3, 5, 7], &[2, 3, 6, 7]), 0.5);
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(fingerprint(&[3, 9, 12]), fingerprint(&[3, 9, 12]));
        assert_ne!(fingerprint(&[3, 9, 12]), fingerprint(&[3, 9, 13]));
        assert_ne!(fingerprint(&[]), fingerprint(&[0]));
    }
}
