//! Inverted postings index (§4.3 InvertedPostings): symbol presence for
//! Jaccard support and the document-frequency source for metrics (§4.7).

use crate::symbol::PatternName;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct InvertedPostings {
    /// symbol -> (pattern_name -> term frequency within that pattern)
    postings: HashMap<String, HashMap<PatternName, u64>>,
    /// cached symbol set per pattern, needed to remove a pattern cleanly.
    pattern_symbols: HashMap<PatternName, HashSet<String>>,
}

impl InvertedPostings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: PatternName, symbol_counts: HashMap<String, u64>) {
        self.pattern_symbols
            .insert(name.clone(), symbol_counts.keys().cloned().collect());
        for (symbol, tf) in symbol_counts {
            self.postings.entry(symbol).or_default().insert(name.clone(), tf);
        }
    }

    pub fn remove(&mut self, name: &PatternName) {
        if let Some(symbols) = self.pattern_symbols.remove(name) {
            for symbol in symbols {
                if let Some(map) = self.postings.get_mut(&symbol) {
                    map.remove(name);
                }
            }
        }
    }

    /// Patterns containing at least one of `symbols`, mapped to the size of
    /// their intersection with `symbols` (for exact Jaccard computation).
    pub fn candidates_with_overlap(&self, symbols: &HashSet<String>) -> HashMap<PatternName, usize> {
        let mut overlap: HashMap<PatternName, usize> = HashMap::new();
        for symbol in symbols {
            if let Some(map) = self.postings.get(symbol) {
                for name in map.keys() {
                    *overlap.entry(name.clone()).or_insert(0) += 1;
                }
            }
        }
        overlap
    }

    pub fn symbol_set(&self, name: &PatternName) -> Option<&HashSet<String>> {
        self.pattern_symbols.get(name)
    }

    pub fn document_frequency(&self, symbol: &str) -> u64 {
        self.postings.get(symbol).map(|m| m.len() as u64).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(s, c)| (s.to_string(), *c)).collect()
    }

    #[test]
    fn overlap_counts_distinct_symbols() {
        let mut idx = InvertedPostings::new();
        let p1 = PatternName("PTRN|1".into());
        idx.insert(p1.clone(), counts(&[("a", 2), ("b", 1)]));

        let query: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();
        let overlap = idx.candidates_with_overlap(&query);
        assert_eq!(overlap.get(&p1), Some(&1));
    }

    #[test]
    fn remove_clears_postings() {
        let mut idx = InvertedPostings::new();
        let p1 = PatternName("PTRN|1".into());
        idx.insert(p1.clone(), counts(&[("a", 1)]));
        idx.remove(&p1);
        assert_eq!(idx.document_frequency("a"), 0);
    }

    #[test]
    fn document_frequency_counts_patterns() {
        let mut idx = InvertedPostings::new();
        idx.insert(PatternName("PTRN|1".into()), counts(&[("a", 5)]));
        idx.insert(PatternName("PTRN|2".into()), counts(&[("a", 1)]));
        assert_eq!(idx.document_frequency("a"), 2);
    }
}
