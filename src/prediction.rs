//! The prediction object (§6) and the future-potential record emitted by
//! the Prediction Ranker (C8).

use crate::segment::Anomaly;
use crate::symbol::{Event, PatternName, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bit-exact prediction object (§6). Field order here matches the spec's
/// listing; serde field order in JSON output follows declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub name: PatternName,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub frequency: u64,
    pub matches: Vec<Symbol>,
    pub missing: Vec<Symbol>,
    pub extras: Vec<Symbol>,
    pub past: Vec<Event>,
    pub present: Vec<Event>,
    pub future: Vec<Event>,

    pub confidence: f64,
    pub evidence: f64,
    pub similarity: f64,
    pub snr: f64,
    pub fragmentation: f64,
    pub entropy: f64,
    pub normalized_entropy: f64,
    pub global_normalized_entropy: f64,
    pub confluence: f64,
    pub itfdf_similarity: f64,
    pub predictive_information: f64,
    pub tfidf_score: f64,
    pub bayesian_prior: f64,
    pub bayesian_likelihood: f64,
    pub bayesian_posterior: f64,
    pub potential: f64,

    pub emotives: HashMap<String, f64>,
    pub anomalies: Vec<Anomaly>,
}

impl Prediction {
    /// Accessor for the configurable rank-sort field (§4.8, §9 "tagged
    /// variant" dispatch — a `match`, never a string-keyed lookup).
    pub fn metric(&self, algo: crate::config::RankSortAlgo) -> f64 {
        use crate::config::RankSortAlgo::*;
        match algo {
            Potential => self.potential,
            Similarity => self.similarity,
            Evidence => self.evidence,
            Confidence => self.confidence,
            Snr => self.snr,
            Fragmentation => self.fragmentation,
            Frequency => self.frequency as f64,
            NormalizedEntropy => self.normalized_entropy,
            GlobalNormalizedEntropy => self.global_normalized_entropy,
            ItfdfSimilarity => self.itfdf_similarity,
            Confluence => self.confluence,
            PredictiveInformation => self.predictive_information,
            BayesianPosterior => self.bayesian_posterior,
        }
    }
}

/// Per-symbol aggregation across all emitted predictions (§4.8 step 3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuturePotential {
    pub symbol: Symbol,
    pub total_potential: f64,
    pub prediction_count: u64,
    pub patterns: Vec<PatternName>,
}

/// The envelope returned by `predict` (§4.8 step 4, §4.10).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    pub predictions: Vec<Prediction>,
    pub future_potentials: Vec<FuturePotential>,
    pub count: usize,
}
