//! Per-pattern Bloom filter (§4.3 BloomFilter): O(1) "definitely not
//! overlapping" membership check over a pattern's symbol set.
//!
//! No pack example declares a working Bloom filter crate (the one reference
//! hit, `probabilistic_collections`, is used without ever being added to its
//! own `Cargo.toml` — see DESIGN.md), so this is a small hand-rolled k-hash
//! filter sized from `bloom_false_positive_rate`, double-hashing per
//! Kirsch-Mitzenmacher to derive the k hash positions from two seeded hashes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<bool>,
    num_hashes: usize,
}

impl BloomFilter {
    /// Size a filter for `expected_items` elements at `false_positive_rate`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = false_positive_rate.clamp(1e-6, 0.5);
        let m = (-(n * p.ln()) / (std::f64::consts::LN_2.powi(2))).ceil().max(8.0);
        let k = ((m / n) * std::f64::consts::LN_2).round().max(1.0) as usize;
        Self {
            bits: vec![false; m as usize],
            num_hashes: k,
        }
    }

    fn hash_pair(item: &str) -> (u64, u64) {
        let mut h1 = DefaultHasher::new();
        item.hash(&mut h1);
        let a = h1.finish();

        let mut h2 = DefaultHasher::new();
        // salt the second hash so it is independent of the first
        0x9E3779B97F4A7C15u64.hash(&mut h2);
        item.hash(&mut h2);
        let b = h2.finish();
        (a, b)
    }

    fn positions(&self, item: &str) -> impl Iterator<Item = usize> + '_ {
        let (a, b) = Self::hash_pair(item);
        let len = self.bits.len() as u64;
        (0..self.num_hashes).map(move |i| (a.wrapping_add((i as u64).wrapping_mul(b)) % len) as usize)
    }

    pub fn insert(&mut self, item: &str) {
        for pos in self.positions(item).collect::<Vec<_>>() {
            self.bits[pos] = true;
        }
    }

    /// True if `item` may be present; false means definitely absent.
    pub fn contains(&self, item: &str) -> bool {
        self.positions(item).all(|pos| self.bits[pos])
    }

    /// True iff at least one of `items` may be present (§4.4 bloom stage).
    pub fn contains_any<'a>(&self, items: impl IntoIterator<Item = &'a str>) -> bool {
        items.into_iter().any(|item| self.contains(item))
    }
}
