//! Length-ratio prefilter index (§4.3 LengthBucket).

use crate::symbol::PatternName;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
pub struct LengthBucket {
    buckets: BTreeMap<usize, HashSet<PatternName>>,
}

impl LengthBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, length: usize, name: PatternName) {
        self.buckets.entry(length).or_default().insert(name);
    }

    pub fn remove(&mut self, length: usize, name: &PatternName) {
        if let Some(bucket) = self.buckets.get_mut(&length) {
            bucket.remove(name);
        }
    }

    /// Names whose bucket length falls in `[min_len, max_len]` inclusive.
    /// `min_len > max_len` is a legitimately empty window (inward-rounded
    /// real-valued bounds can cross when they land within one integer of
    /// each other), not a caller error, so it's handled rather than handed
    /// to `BTreeMap::range`, which panics on an inverted bound.
    pub fn range(&self, min_len: usize, max_len: usize) -> HashSet<PatternName> {
        if min_len > max_len {
            return HashSet::new();
        }
        self.buckets
            .range(min_len..=max_len)
            .flat_map(|(_, names)| names.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_includes_bounds() {
        let mut lb = LengthBucket::new();
        lb.insert(2, PatternName("PTRN|a".into()));
        lb.insert(4, PatternName("PTRN|b".into()));
        lb.insert(6, PatternName("PTRN|c".into()));
        let found = lb.range(2, 4);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn remove_drops_from_bucket() {
        let mut lb = LengthBucket::new();
        let name = PatternName("PTRN|a".into());
        lb.insert(3, name.clone());
        lb.remove(3, &name);
        assert!(lb.range(0, 10).is_empty());
    }

    #[test]
    fn inverted_bounds_are_an_empty_range_not_a_panic() {
        let mut lb = LengthBucket::new();
        lb.insert(5, PatternName("PTRN|a".into()));
        assert!(lb.range(6, 5).is_empty());
    }
}
