//! Pattern data model (§3) and the per-pattern rolling accumulators (§4.2).

use crate::symbol::{symbol_count, PatternName, Sequence};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Grouping key for sessions sharing a learned pattern pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LibraryId(pub String);

impl LibraryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A rolling window of at most `capacity` values, FIFO eviction (§3, §9
/// "bounded ring"). `push` is O(1) amortized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotiveWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl EmotiveWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: PatternName,
    pub data: Sequence,
    pub frequency: u64,
    /// capacity enforced per-key at push time; see `EmotiveWindow`.
    pub emotives: HashMap<String, EmotiveWindow>,
    pub metadata: HashMap<String, HashSet<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// `EmotiveWindow::capacity` makes exact equality awkward to derive for floats
// transitively through `HashMap` iteration order-independence; `PartialEq`
// above only requires `Pattern`'s own fields compare, which is sufficient for
// the identity checks this crate needs (tests compare `name`/`frequency`).
impl Eq for EmotiveWindow {}
impl PartialEq for EmotiveWindow {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.values == other.values
    }
}

impl Pattern {
    /// First-learn constructor: frequency starts at 1, accumulators empty.
    pub fn new(data: Sequence, persistence: usize) -> Self {
        let _ = persistence; // accumulators are populated by `relearn`, not here
        let now = Utc::now();
        Self {
            name: PatternName::from_data(&data),
            data,
            frequency: 1,
            emotives: HashMap::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pattern_len(&self) -> usize {
        symbol_count(&self.data)
    }

    /// Merge a new learn of the same `data`: increment frequency, append each
    /// emotive (FIFO-capped at `persistence`), set-union each metadata key.
    pub fn relearn(
        &mut self,
        emotives: &HashMap<String, f64>,
        metadata: &HashMap<String, HashSet<String>>,
        persistence: usize,
    ) {
        self.frequency += 1;
        for (key, value) in emotives {
            let window = self
                .emotives
                .entry(key.clone())
                .or_insert_with(|| EmotiveWindow::new(persistence));
            window.push(*value);
        }
        for (key, values) in metadata {
            self.metadata.entry(key.clone()).or_default().extend(values.iter().cloned());
        }
        self.updated_at = Utc::now();
    }

    /// Seed the accumulators for a brand-new pattern's first observation.
    pub fn seed(
        &mut self,
        emotives: &HashMap<String, f64>,
        metadata: &HashMap<String, HashSet<String>>,
        persistence: usize,
    ) {
        for (key, value) in emotives {
            self.emotives
                .entry(key.clone())
                .or_insert_with(|| EmotiveWindow::new(persistence))
                .push(*value);
        }
        for (key, values) in metadata {
            self.metadata.entry(key.clone()).or_default().extend(values.iter().cloned());
        }
    }

    pub fn emotive_means(&self) -> HashMap<String, f64> {
        self.emotives.iter().map(|(k, w)| (k.clone(), w.mean())).collect()
    }
}
