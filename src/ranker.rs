//! Prediction Ranker (C8, §4.8): sorts the scored candidate set by the
//! configured metric, truncates to `max_predictions`, and aggregates
//! per-symbol future potentials across the emitted batch.

use crate::config::RankSortAlgo;
use crate::prediction::{FuturePotential, Prediction, PredictionEnvelope};
use crate::symbol::Symbol;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Sort by `algo` descending, `name` ascending as a deterministic
/// tie-break (§4.8 step 1), then truncate to `max_predictions`.
pub fn rank(mut predictions: Vec<Prediction>, algo: RankSortAlgo, max_predictions: usize) -> Vec<Prediction> {
    predictions.sort_by(|a, b| {
        b.metric(algo)
            .partial_cmp(&a.metric(algo))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.0.cmp(&b.name.0))
    });
    predictions.truncate(max_predictions);
    predictions
}

/// Aggregate, for every symbol appearing in any emitted prediction's
/// `future`, the sum of `potential` over predictions that forecast it and
/// the set of patterns that did so (§4.8 step 3).
pub fn future_potentials(predictions: &[Prediction]) -> Vec<FuturePotential> {
    let mut accum: HashMap<Symbol, (f64, u64, Vec<crate::symbol::PatternName>)> = HashMap::new();

    for prediction in predictions {
        let mut seen_in_this_prediction = std::collections::HashSet::new();
        for event in &prediction.future {
            for symbol in event {
                if !seen_in_this_prediction.insert(symbol.clone()) {
                    continue;
                }
                let entry = accum.entry(symbol.clone()).or_insert((0.0, 0, Vec::new()));
                entry.0 += prediction.potential;
                entry.1 += 1;
                entry.2.push(prediction.name.clone());
            }
        }
    }

    let mut result: Vec<FuturePotential> = accum
        .into_iter()
        .map(|(symbol, (total_potential, prediction_count, patterns))| FuturePotential {
            symbol,
            total_potential,
            prediction_count,
            patterns,
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_potential
            .partial_cmp(&a.total_potential)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.as_str().cmp(b.symbol.as_str()))
    });
    result
}

/// Assemble the final envelope (§4.8 step 4).
pub fn build_envelope(predictions: Vec<Prediction>, algo: RankSortAlgo, max_predictions: usize) -> PredictionEnvelope {
    let ranked = rank(predictions, algo, max_predictions);
    let potentials = future_potentials(&ranked);
    PredictionEnvelope {
        count: ranked.len(),
        predictions: ranked,
        future_potentials: potentials,
    }
}
