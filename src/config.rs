//! Session configuration contract (§6) and its validation (§9 "Configuration
//! validation").

use crate::error::{KatoError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmMode {
    Clear,
    Rolling,
}

/// Closed set of ranking metrics (§9 "tagged variant", not a string-keyed
/// lookup in the hot path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankSortAlgo {
    Potential,
    Similarity,
    Evidence,
    Confidence,
    Snr,
    Fragmentation,
    Frequency,
    NormalizedEntropy,
    GlobalNormalizedEntropy,
    ItfdfSimilarity,
    Confluence,
    PredictiveInformation,
    BayesianPosterior,
}

/// One stage in the filter pipeline (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStageKind {
    Length,
    Jaccard,
    Bloom,
    Minhash,
    Rapidfuzz,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfiguration {
    pub max_pattern_length: usize,
    pub persistence: usize,
    pub recall_threshold: f64,
    pub stm_mode: StmMode,
    pub max_predictions: usize,
    pub sort_symbols: bool,
    pub use_token_matching: bool,
    pub rank_sort_algo: RankSortAlgo,
    pub filter_pipeline: Vec<FilterStageKind>,
    pub length_min_ratio: f64,
    pub length_max_ratio: f64,
    pub jaccard_threshold: f64,
    pub jaccard_min_overlap: usize,
    pub minhash_threshold: f64,
    pub minhash_bands: usize,
    pub minhash_rows: usize,
    pub minhash_num_hashes: usize,
    pub bloom_false_positive_rate: f64,
    pub max_candidates_per_stage: usize,
    pub enable_filter_metrics: bool,
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            max_pattern_length: 0,
            persistence: 5,
            recall_threshold: 0.1,
            stm_mode: StmMode::Clear,
            max_predictions: 100,
            sort_symbols: true,
            use_token_matching: true,
            rank_sort_algo: RankSortAlgo::Potential,
            filter_pipeline: vec![
                FilterStageKind::Length,
                FilterStageKind::Jaccard,
                FilterStageKind::Rapidfuzz,
            ],
            length_min_ratio: 0.5,
            length_max_ratio: 2.0,
            jaccard_threshold: 0.3,
            jaccard_min_overlap: 2,
            minhash_threshold: 0.7,
            minhash_bands: 20,
            minhash_rows: 5,
            minhash_num_hashes: 100,
            bloom_false_positive_rate: 0.01,
            max_candidates_per_stage: 100_000,
            enable_filter_metrics: true,
        }
    }
}

impl SessionConfiguration {
    /// Enforce the cross-field invariants (§6, §9). Auto-syncs
    /// `sort_symbols`/`use_token_matching` rather than rejecting (per §6:
    /// "caller override logs a mismatch warning but is honored").
    pub fn validate(&mut self) -> Result<()> {
        if self.persistence < 1 || self.persistence > 100 {
            return Err(KatoError::Validation(format!(
                "persistence must be in 1..=100, got {}",
                self.persistence
            )));
        }
        if !(0.0..=1.0).contains(&self.recall_threshold) {
            return Err(KatoError::Validation(format!(
                "recall_threshold must be in 0.0..=1.0, got {}",
                self.recall_threshold
            )));
        }
        if self.max_predictions == 0 || self.max_predictions > 10_000 {
            return Err(KatoError::Validation(format!(
                "max_predictions must be in 1..=10000, got {}",
                self.max_predictions
            )));
        }
        if self.max_candidates_per_stage < 100 {
            return Err(KatoError::Validation(format!(
                "max_candidates_per_stage must be >= 100, got {}",
                self.max_candidates_per_stage
            )));
        }
        if !(1e-4..=0.1).contains(&self.bloom_false_positive_rate) {
            return Err(KatoError::Validation(format!(
                "bloom_false_positive_rate must be in 1e-4..=0.1, got {}",
                self.bloom_false_positive_rate
            )));
        }
        // LSH parameter validation: rejection, not warning (DESIGN.md open
        // question resolution).
        if self.minhash_bands * self.minhash_rows != self.minhash_num_hashes {
            return Err(KatoError::Validation(format!(
                "minhash_bands ({}) * minhash_rows ({}) must equal minhash_num_hashes ({})",
                self.minhash_bands, self.minhash_rows, self.minhash_num_hashes
            )));
        }

        // Auto-sync invariant (§6): enabling token matching forces
        // sort_symbols=true; disabling forces sort_symbols=false.
        let required_sort = self.use_token_matching;
        if self.sort_symbols != required_sort {
            log::warn!(
                "sort_symbols={} is inconsistent with use_token_matching={}; overriding sort_symbols to {}",
                self.sort_symbols,
                self.use_token_matching,
                required_sort
            );
            self.sort_symbols = required_sort;
        }

        Ok(())
    }
}
