//! Pattern Library (C2, §4.2): the learn/lookup surface in front of a
//! [`PatternStore`], correctly distinguishing first-learn (`seed`) from
//! repeat-learn (`relearn`) of the same pattern identity.

use crate::error::{KatoError, Result};
use crate::pattern::{LibraryId, Pattern};
use crate::store::PatternStore;
use crate::symbol::{symbol_count, PatternName, Sequence};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Minimum total symbols a `Sequence` must carry to be learnable (§3, §4.2).
pub const MIN_LEARNABLE_SYMBOLS: usize = 2;

/// Aggregate statistics over a library's full pattern pool (§4.2, §4.7
/// "library-wide" inputs to `global_normalized_entropy`).
#[derive(Debug, Clone, Default)]
pub struct LibraryStats {
    pub pattern_count: usize,
    pub total_frequency: u64,
    /// document frequency of each symbol: number of distinct patterns it
    /// appears in, not occurrence count.
    pub symbol_document_frequency: HashMap<String, u64>,
    pub distinct_symbol_count: usize,
}

pub struct Library {
    id: LibraryId,
    store: Arc<dyn PatternStore>,
}

impl Library {
    pub fn new(id: LibraryId, store: Arc<dyn PatternStore>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> &LibraryId {
        &self.id
    }

    /// Learn `data` with the given per-observation emotives/metadata. Returns
    /// the pattern's (content-addressed) name regardless of whether this was
    /// a first-learn or a repeat-learn.
    pub async fn learn(
        &self,
        data: Sequence,
        emotives: &HashMap<String, f64>,
        metadata: &HashMap<String, HashSet<String>>,
        persistence: usize,
    ) -> Result<PatternName> {
        if symbol_count(&data) < MIN_LEARNABLE_SYMBOLS {
            return Err(KatoError::EmptyLearn);
        }
        let name = PatternName::from_data(&data);
        match self.store.get(&self.id, &name).await? {
            Some(mut existing) => {
                existing.relearn(emotives, metadata, persistence);
                self.store.upsert(&self.id, existing).await?;
                log::info!("library {}: relearned {} (frequency incremented)", self.id, name);
            }
            None => {
                let mut fresh = Pattern::new(data, persistence);
                fresh.seed(emotives, metadata, persistence);
                self.store.upsert(&self.id, fresh).await?;
                log::info!("library {}: learned new pattern {}", self.id, name);
            }
        }
        Ok(name)
    }

    pub async fn get(&self, name: &PatternName) -> Result<Option<Pattern>> {
        self.store.get(&self.id, name).await
    }

    pub async fn all(&self) -> Result<Vec<Pattern>> {
        self.store.all(&self.id).await
    }

    pub async fn drop_all(&self) -> Result<()> {
        self.store.drop_all(&self.id).await
    }

    /// Library-wide statistics for metrics that need more than one pattern's
    /// context (§4.7 `global_normalized_entropy`).
    pub async fn stats(&self) -> Result<LibraryStats> {
        let patterns = self.all().await?;
        let mut symbol_document_frequency: HashMap<String, u64> = HashMap::new();
        let mut total_frequency = 0u64;

        for pattern in &patterns {
            total_frequency += pattern.frequency;
            let mut seen_in_pattern = HashSet::new();
            for event in &pattern.data {
                for symbol in event {
                    seen_in_pattern.insert(symbol.as_str().to_string());
                }
            }
            for symbol in seen_in_pattern {
                *symbol_document_frequency.entry(symbol).or_insert(0) += 1;
            }
        }

        Ok(LibraryStats {
            pattern_count: patterns.len(),
            total_frequency,
            distinct_symbol_count: symbol_document_frequency.len(),
            symbol_document_frequency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPatternStore;
    use crate::symbol::Symbol;

    fn seq(a: &str, b: &str) -> Sequence {
        vec![vec![Symbol::new(a)], vec![Symbol::new(b)]]
    }

    #[tokio::test]
    async fn first_learn_seeds_then_relearn_increments() {
        let store: Arc<dyn PatternStore> = Arc::new(InMemoryPatternStore::new());
        let lib = Library::new(LibraryId::new("lib"), store);

        let mut emotives = HashMap::new();
        emotives.insert("joy".to_string(), 1.0);

        let name1 = lib.learn(seq("a", "b"), &emotives, &HashMap::new(), 5).await.unwrap();
        let p1 = lib.get(&name1).await.unwrap().unwrap();
        assert_eq!(p1.frequency, 1);
        assert_eq!(p1.emotives.get("joy").unwrap().len(), 1);

        let name2 = lib.learn(seq("a", "b"), &emotives, &HashMap::new(), 5).await.unwrap();
        assert_eq!(name1, name2);
        let p2 = lib.get(&name2).await.unwrap().unwrap();
        assert_eq!(p2.frequency, 2);
        assert_eq!(p2.emotives.get("joy").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn distinct_data_yields_distinct_patterns() {
        let store: Arc<dyn PatternStore> = Arc::new(InMemoryPatternStore::new());
        let lib = Library::new(LibraryId::new("lib"), store);

        lib.learn(seq("a", "b"), &HashMap::new(), &HashMap::new(), 5).await.unwrap();
        lib.learn(seq("c", "d"), &HashMap::new(), &HashMap::new(), 5).await.unwrap();

        let stats = lib.stats().await.unwrap();
        assert_eq!(stats.pattern_count, 2);
        assert_eq!(stats.total_frequency, 2);
        assert_eq!(stats.distinct_symbol_count, 4);
    }

    #[tokio::test]
    async fn symbol_document_frequency_counts_patterns_not_occurrences() {
        let store: Arc<dyn PatternStore> = Arc::new(InMemoryPatternStore::new());
        let lib = Library::new(LibraryId::new("lib"), store);

        // "a" appears twice within one pattern's data, should count once for
        // document frequency.
        let data = vec![vec![Symbol::new("a"), Symbol::new("a")], vec![Symbol::new("b")]];
        lib.learn(data, &HashMap::new(), &HashMap::new(), 5).await.unwrap();

        let stats = lib.stats().await.unwrap();
        assert_eq!(stats.symbol_document_frequency.get("a"), Some(&1));
    }

    #[tokio::test]
    async fn single_symbol_sequence_is_rejected() {
        let store: Arc<dyn PatternStore> = Arc::new(InMemoryPatternStore::new());
        let lib = Library::new(LibraryId::new("lib"), store);
        let data = vec![vec![Symbol::new("a")]];
        let result = lib.learn(data, &HashMap::new(), &HashMap::new(), 5).await;
        assert!(matches!(result, Err(crate::error::KatoError::EmptyLearn)));
    }

    #[tokio::test]
    async fn drop_all_empties_the_library() {
        let store: Arc<dyn PatternStore> = Arc::new(InMemoryPatternStore::new());
        let lib = Library::new(LibraryId::new("lib"), store);
        lib.learn(seq("a", "b"), &HashMap::new(), &HashMap::new(), 5).await.unwrap();
        lib.drop_all().await.unwrap();
        assert!(lib.all().await.unwrap().is_empty());
    }
}
