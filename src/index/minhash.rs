//! MinHash signatures and LSH banding (§4.3 MinHashSignature, §4.4 minhash
//! stage). `num_hashes` independent hash functions are simulated via a single
//! keyed hash per index, the standard trick to avoid storing `num_hashes`
//! distinct hasher instances.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSignature(pub Vec<u64>);

impl MinHashSignature {
    /// Compute a `num_hashes`-wide signature over `symbols`.
    pub fn compute<'a>(symbols: impl IntoIterator<Item = &'a str>, num_hashes: usize) -> Self {
        let symbols: Vec<&str> = symbols.into_iter().collect();
        let mut signature = vec![u64::MAX; num_hashes];
        for symbol in &symbols {
            for (i, slot) in signature.iter_mut().enumerate() {
                let mut hasher = DefaultHasher::new();
                (i as u64).hash(&mut hasher);
                symbol.hash(&mut hasher);
                let h = hasher.finish();
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Self(signature)
    }

    /// True if `self` and `other` share at least one of `bands` bands of
    /// `rows` consecutive signature rows (LSH banding, §4.4). Caller must
    /// ensure `bands * rows == self.0.len() == other.0.len()`; a mismatch is
    /// a configuration bug caught earlier by `SessionConfiguration::validate`.
    pub fn collides(&self, other: &MinHashSignature, bands: usize, rows: usize) -> bool {
        if self.0.len() != other.0.len() || other.0.len() != bands * rows {
            return false;
        }
        for band in 0..bands {
            let start = band * rows;
            let end = start + rows;
            if self.0[start..end] == other.0[start..end] {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_symbol_sets_collide() {
        let a = MinHashSignature::compute(["x", "y", "z"], 20);
        let b = MinHashSignature::compute(["z", "y", "x"], 20);
        assert!(a.collides(&b, 4, 5));
        assert_eq!(a, b);
    }

    #[test]
    fn disjoint_symbol_sets_do_not_collide_at_strict_banding() {
        let a = MinHashSignature::compute(["a1", "a2", "a3", "a4"], 100);
        let b = MinHashSignature::compute(["b1", "b2", "b3", "b4"], 100);
        assert!(!a.collides(&b, 1, 100));
    }

    #[test]
    fn mismatched_signature_lengths_never_collide() {
        let a = MinHashSignature::compute(["x"], 20);
        let b = MinHashSignature::compute(["x"], 10);
        assert!(!a.collides(&b, 4, 5));
    }
}
