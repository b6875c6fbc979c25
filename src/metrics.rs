//! Metric Evaluator (C7, §4.7): the dozen information-theoretic fields
//! attached to every prediction. Split into two passes per the spec's "pass
//! order" — per-candidate metrics first, then an ensemble-wide normalization
//! for `bayesian_posterior` and `predictive_information`.

use crate::library::LibraryStats;
use crate::numerical_stability::safe_divide;
use crate::pattern::Pattern;
use crate::segment::{matched_event_blocks, Segmentation};
use crate::symbol::{flatten, Sequence, Symbol};
use std::collections::{HashMap, HashSet};

/// Every scalar metric field except `bayesian_posterior` and
/// `predictive_information`, which need ensemble context to finalize
/// (`normalize_ensemble`).
#[derive(Debug, Clone, Default)]
pub struct CandidateMetrics {
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
    pub tfidf_score: f64,
    pub bayesian_prior: f64,
    pub bayesian_likelihood: f64,
    /// un-normalized predictive-information contribution; `normalize_ensemble`
    /// divides by the ensemble's maximum to land in `[0, 1]`.
    pub predictive_information_raw: f64,
    pub potential: f64,
}

/// `expectation(p, n)` (§4.7, resolving the spec's Open Question): Shannon
/// self-information of `p`, normalized by the max entropy of an
/// `n`-symbol alphabet. Zero for a degenerate `p` or single-symbol alphabet.
fn expectation(p: f64, n: usize) -> f64 {
    if p <= 0.0 || n <= 1 {
        return 0.0;
    }
    let log2n = (n as f64).log2();
    if log2n <= 0.0 {
        return 0.0;
    }
    -p * p.log2() / log2n
}

fn shannon_entropy_bits(symbols: &[Symbol]) -> f64 {
    if symbols.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in symbols {
        *counts.entry(s.as_str()).or_insert(0) += 1;
    }
    let total = symbols.len() as f64;
    -counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Compute every metric for one candidate (§4.7). `ensemble_total_frequency`
/// is the sum of `frequency` across the full candidate set being ranked this
/// predict call (the `itfdf_similarity` denominator); `stm` is the session's
/// current short-term memory (needed for `fragmentation`, which counts
/// matched-event blocks against the observed events, not just `present`).
pub fn evaluate_candidate(
    pattern: &Pattern,
    stm: &Sequence,
    segmentation: &Segmentation,
    similarity: f64,
    stats: &LibraryStats,
    ensemble_total_frequency: u64,
) -> CandidateMetrics {
    let m = segmentation.matches.len() as f64;
    let x = segmentation.extras.len() as f64;
    let present_len = flatten(&segmentation.present).len() as f64;
    let pattern_len = pattern.pattern_len() as f64;

    let confidence = safe_divide(m, present_len, 0.0);
    let evidence = safe_divide(m, pattern_len, 0.0);
    let snr = safe_divide(2.0 * m - x, 2.0 * m + x, 0.0);

    let blocks = matched_event_blocks(stm, &segmentation.present);
    let fragmentation = blocks.saturating_sub(1) as f64;

    let present_symbols = flatten(&segmentation.present);
    let entropy = shannon_entropy_bits(&present_symbols);
    let unique_present: HashSet<&str> = present_symbols.iter().map(|s| s.as_str()).collect();
    let normalized_entropy = safe_divide(entropy, (unique_present.len() as f64).log2(), 0.0);

    let lib_total_frequency = stats.total_frequency as f64;
    let global_normalized_entropy: f64 = unique_present
        .iter()
        .map(|sym| {
            let df = *stats.symbol_document_frequency.get(*sym).unwrap_or(&0) as f64;
            let p = safe_divide(df, lib_total_frequency, 0.0);
            expectation(p, stats.distinct_symbol_count)
        })
        .sum();

    let pattern_symbols = flatten(&pattern.data);
    let unique_pattern: HashSet<&str> = pattern_symbols.iter().map(|s| s.as_str()).collect();
    let freq_share = safe_divide(pattern.frequency as f64, lib_total_frequency, 0.0);
    let geometric_product: f64 = unique_pattern
        .iter()
        .map(|sym| {
            let df = *stats.symbol_document_frequency.get(*sym).unwrap_or(&0) as f64;
            safe_divide(df, stats.pattern_count as f64, 0.0)
        })
        .product();
    let confluence = freq_share * (1.0 - geometric_product);

    let distance = 1.0 - similarity;
    let itfdf_similarity = 1.0
        - safe_divide(
            distance * pattern.frequency as f64,
            ensemble_total_frequency as f64,
            0.0,
        );

    let tfidf_score = if pattern_len > 0.0 && !unique_pattern.is_empty() {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for s in &pattern_symbols {
            *counts.entry(s.as_str()).or_insert(0) += 1;
        }
        let sum: f64 = unique_pattern
            .iter()
            .map(|sym| {
                let count = *counts.get(*sym).unwrap_or(&0) as f64;
                let df = (*stats.symbol_document_frequency.get(*sym).unwrap_or(&0)).max(1) as f64;
                let tf = count / pattern_len;
                let idf = safe_divide(stats.pattern_count as f64, df, stats.pattern_count as f64).log2() + 1.0;
                tf * idf
            })
            .sum();
        sum / unique_pattern.len() as f64
    } else {
        0.0
    };

    let bayesian_prior = freq_share;
    let bayesian_likelihood = similarity;
    let predictive_information_raw = bayesian_prior * shannon_entropy_bits(&flatten(&segmentation.future));

    let potential =
        (evidence + confidence) * snr + itfdf_similarity + safe_divide(1.0, fragmentation + 1.0, 1.0);

    CandidateMetrics {
        confidence,
        evidence,
        similarity,
        snr,
        fragmentation,
        entropy,
        normalized_entropy,
        global_normalized_entropy,
        confluence,
        itfdf_similarity,
        tfidf_score,
        bayesian_prior,
        bayesian_likelihood,
        predictive_information_raw,
        potential,
    }
}

/// Ensemble-wide finalization (§4.7 "pass order"): normalize
/// `predictive_information` against the ensemble maximum and
/// `bayesian_posterior` so the batch sums to 1 (§8 universal invariant).
/// Returns `(predictive_information, bayesian_posterior)` parallel to `raw`.
pub fn normalize_ensemble(raw: &[CandidateMetrics]) -> (Vec<f64>, Vec<f64>) {
    let max_pi = raw
        .iter()
        .map(|m| m.predictive_information_raw)
        .fold(0.0_f64, f64::max);
    let predictive_information: Vec<f64> = raw
        .iter()
        .map(|m| safe_divide(m.predictive_information_raw, max_pi, 0.0))
        .collect();

    let numerators: Vec<f64> = raw.iter().map(|m| m.bayesian_prior * m.bayesian_likelihood).collect();
    let sum: f64 = numerators.iter().sum();
    let posteriors: Vec<f64> = if sum > 0.0 {
        numerators.iter().map(|&n| n / sum).collect()
    } else if !raw.is_empty() {
        vec![1.0 / raw.len() as f64; raw.len()]
    } else {
        Vec::new()
    };

    (predictive_information, posteriors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use crate::segment::segment;

    fn ev(strs: &[&str]) -> Vec<Symbol> {
        strs.iter().map(|s| Symbol::new(*s)).collect()
    }

    fn stats_for(patterns: &[&Pattern]) -> LibraryStats {
        let mut df: HashMap<String, u64> = HashMap::new();
        let mut total_frequency = 0u64;
        for p in patterns {
            total_frequency += p.frequency;
            let set: HashSet<String> = flatten(&p.data).iter().map(|s| s.as_str().to_string()).collect();
            for sym in set {
                *df.entry(sym).or_insert(0) += 1;
            }
        }
        LibraryStats {
            pattern_count: patterns.len(),
            total_frequency,
            distinct_symbol_count: df.len(),
            symbol_document_frequency: df,
        }
    }

    #[test]
    fn confidence_evidence_and_snr_simple_case() {
        // matches "simple linear sequence" scenario (§8.1)
        let pattern = Pattern::new(vec![ev(&["a"]), ev(&["b"]), ev(&["c"])], 5);
        let stm = vec![ev(&["b"])];
        let seg = segment(&stm, &pattern.data).unwrap();
        let stats = stats_for(&[&pattern]);
        let metrics = evaluate_candidate(&pattern, &stm, &seg, 1.0, &stats, pattern.frequency);

        assert!((metrics.confidence - 1.0).abs() < 1e-9);
        assert!((metrics.evidence - 1.0 / 3.0).abs() < 1e-9);
        assert!((metrics.snr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn posteriors_sum_to_one() {
        let p1 = Pattern::new(vec![ev(&["a"]), ev(&["b"])], 5);
        let p2 = Pattern::new(vec![ev(&["a"]), ev(&["c"])], 5);
        let p3 = Pattern::new(vec![ev(&["a"]), ev(&["d"])], 5);
        let stats = stats_for(&[&p1, &p2, &p3]);
        let stm = vec![ev(&["a"])];

        let mut raw = Vec::new();
        for (p, sim) in [(&p1, 0.9), (&p2, 0.6), (&p3, 0.3)] {
            let seg = segment(&stm, &p.data).unwrap();
            raw.push(evaluate_candidate(p, &stm, &seg, sim, &stats, 3));
        }
        let (_pi, posteriors) = normalize_ensemble(&raw);
        let sum: f64 = posteriors.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let max_idx = posteriors
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap()
            .0;
        assert_eq!(max_idx, 0);
    }

    #[test]
    fn degenerate_ensemble_posteriors_still_sum_to_one() {
        let p1 = Pattern::new(vec![ev(&["a"]), ev(&["b"])], 5);
        let stats = LibraryStats::default();
        let stm = vec![ev(&["a"])];
        let seg = segment(&stm, &p1.data).unwrap();
        let raw = vec![evaluate_candidate(&p1, &stm, &seg, 0.0, &stats, 0)];
        let (_pi, posteriors) = normalize_ensemble(&raw);
        assert!((posteriors.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
