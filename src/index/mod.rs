//! Candidate Index (C3, §4.3): five structures kept in sync on every learn,
//! queried by the Filter Pipeline Executor (C4).

pub mod bloom;
pub mod length_bucket;
pub mod minhash;
pub mod ngram;
pub mod postings;

use crate::config::SessionConfiguration;
use crate::pattern::Pattern;
use crate::symbol::PatternName;
use bloom::BloomFilter;
use length_bucket::LengthBucket;
use minhash::MinHashSignature;
use ngram::NGramIndex;
use postings::InvertedPostings;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// The full index bundle for one `library_id`. Rebuilt in-process from the
/// pattern store on startup; updated incrementally on `learn`.
#[derive(Default)]
pub struct CandidateIndex {
    inner: RwLock<CandidateIndexInner>,
}

#[derive(Default)]
struct CandidateIndexInner {
    length_bucket: LengthBucket,
    postings: InvertedPostings,
    ngram: NGramIndex,
    bloom: HashMap<PatternName, BloomFilter>,
    minhash: HashMap<PatternName, MinHashSignature>,
    /// remembered length + joined string per pattern, needed to remove it
    /// cleanly from length_bucket/ngram without re-deriving from `data`.
    lengths: HashMap<PatternName, usize>,
    joined: HashMap<PatternName, String>,
}

impl CandidateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically publish (or re-publish) `pattern` across all five
    /// structures (§4.3 "build contract"). Safe to call for both first-learn
    /// and repeat-learn; repeat-learn is a cheap idempotent overwrite.
    pub fn sync_pattern(&self, pattern: &Pattern, config: &SessionConfiguration) {
        let mut inner = self.inner.write().expect("candidate index lock poisoned");

        if let Some(&old_len) = inner.lengths.get(&pattern.name) {
            inner.length_bucket.remove(old_len, &pattern.name);
        }
        if let Some(old_joined) = inner.joined.get(&pattern.name).cloned() {
            inner.ngram.remove(&pattern.name, &old_joined);
        }
        inner.postings.remove(&pattern.name);

        let symbols: Vec<String> = crate::symbol::flatten(&pattern.data)
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let length = pattern.pattern_len();

        let mut tf: HashMap<String, u64> = HashMap::new();
        for s in &symbols {
            *tf.entry(s.clone()).or_insert(0) += 1;
        }

        inner.length_bucket.insert(length, pattern.name.clone());
        inner.postings.insert(pattern.name.clone(), tf);

        let joined = ngram::joined_string(symbols.iter().map(|s| s.as_str()));
        inner.ngram.insert(pattern.name.clone(), &joined);

        let mut bloom = BloomFilter::new(symbols.len().max(1), config.bloom_false_positive_rate);
        for s in &symbols {
            bloom.insert(s);
        }
        inner.bloom.insert(pattern.name.clone(), bloom);

        let signature = MinHashSignature::compute(symbols.iter().map(|s| s.as_str()), config.minhash_num_hashes);
        inner.minhash.insert(pattern.name.clone(), signature);

        inner.lengths.insert(pattern.name.clone(), length);
        inner.joined.insert(pattern.name.clone(), joined);
    }

    pub fn remove_all(&self) {
        let mut inner = self.inner.write().expect("candidate index lock poisoned");
        *inner = CandidateIndexInner::default();
    }

    pub fn length_range(&self, min_len: usize, max_len: usize) -> HashSet<PatternName> {
        self.inner.read().expect("candidate index lock poisoned").length_bucket.range(min_len, max_len)
    }

    pub fn jaccard_overlap(&self, symbols: &HashSet<String>) -> HashMap<PatternName, usize> {
        self.inner.read().expect("candidate index lock poisoned").postings.candidates_with_overlap(symbols)
    }

    pub fn pattern_symbol_set(&self, name: &PatternName) -> Option<HashSet<String>> {
        self.inner.read().expect("candidate index lock poisoned").postings.symbol_set(name).cloned()
    }

    pub fn bloom_contains_any<'a>(&self, name: &PatternName, symbols: impl IntoIterator<Item = &'a str>) -> bool {
        let inner = self.inner.read().expect("candidate index lock poisoned");
        match inner.bloom.get(name) {
            Some(bf) => bf.contains_any(symbols),
            None => true, // absent filter degrades to pass-through (§4.3)
        }
    }

    pub fn minhash_collides(&self, name: &PatternName, query: &MinHashSignature, bands: usize, rows: usize) -> bool {
        let inner = self.inner.read().expect("candidate index lock poisoned");
        match inner.minhash.get(name) {
            Some(sig) => sig.collides(query, bands, rows),
            None => true,
        }
    }

    pub fn joined_string_for(&self, name: &PatternName) -> Option<String> {
        self.inner.read().expect("candidate index lock poisoned").joined.get(name).cloned()
    }

    pub fn all_names(&self) -> HashSet<PatternName> {
        self.inner.read().expect("candidate index lock poisoned").lengths.keys().cloned().collect()
    }
}
