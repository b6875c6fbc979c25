//! Filter Pipeline Executor (C4, §4.4): an ordered, caller-declared sequence
//! of candidate-reduction stages, each a plain value implementing
//! [`FilterStage`] — no inheritance, just a `Vec<Box<dyn FilterStage>>` built
//! once from `SessionConfiguration::filter_pipeline` (§9).

use crate::config::{FilterStageKind, SessionConfiguration};
use crate::index::{minhash::MinHashSignature, CandidateIndex};
use crate::symbol::{flatten, PatternName, Sequence};
use std::collections::HashSet;

/// Everything a stage needs besides its own candidate list: the STM it is
/// filtering against and the session's tuned thresholds.
pub struct FilterContext<'a> {
    pub stm: &'a Sequence,
    pub stm_symbols: HashSet<String>,
    pub stm_length: usize,
    pub index: &'a CandidateIndex,
    pub config: &'a SessionConfiguration,
}

impl<'a> FilterContext<'a> {
    pub fn new(stm: &'a Sequence, index: &'a CandidateIndex, config: &'a SessionConfiguration) -> Self {
        let stm_symbols: HashSet<String> = flatten(stm).iter().map(|s| s.as_str().to_string()).collect();
        Self {
            stm,
            stm_symbols,
            stm_length: stm.len(),
            index,
            config,
        }
    }
}

pub trait FilterStage: Send + Sync {
    /// Apply this stage, returning the (possibly shrunk) candidate set.
    /// Per §4.4, a stage whose input exceeds `max_candidates_per_stage`
    /// degrades to an identity pass-through rather than erroring.
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName>;

    fn name(&self) -> &'static str;
}

fn guard_overflow(stage_name: &str, candidates: &[PatternName], limit: usize) -> bool {
    if candidates.len() > limit {
        log::warn!(
            "filter stage '{}' received {} candidates (limit {}); degrading to pass-through",
            stage_name,
            candidates.len(),
            limit
        );
        true
    } else {
        false
    }
}

struct LengthStage;
impl FilterStage for LengthStage {
    fn name(&self) -> &'static str {
        "length"
    }
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName> {
        if guard_overflow(self.name(), &candidates, ctx.config.max_candidates_per_stage) {
            return candidates;
        }
        // Round inward: the spec's bound is real-valued (L*ratio), but
        // `length_range` only takes integer pattern lengths, so widening
        // with floor/ceil would admit patterns just outside the window.
        let min_len = (ctx.stm_length as f64 * ctx.config.length_min_ratio).ceil() as usize;
        let max_len = (ctx.stm_length as f64 * ctx.config.length_max_ratio).floor() as usize;
        let allowed = ctx.index.length_range(min_len, max_len);
        candidates.into_iter().filter(|c| allowed.contains(c)).collect()
    }
}

struct JaccardStage;
impl FilterStage for JaccardStage {
    fn name(&self) -> &'static str {
        "jaccard"
    }
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName> {
        if guard_overflow(self.name(), &candidates, ctx.config.max_candidates_per_stage) {
            return candidates;
        }
        let overlap = ctx.index.jaccard_overlap(&ctx.stm_symbols);
        let candidate_set: HashSet<&PatternName> = candidates.iter().collect();
        overlap
            .into_iter()
            .filter(|(name, _)| candidate_set.contains(name))
            .filter_map(|(name, intersection)| {
                let pattern_symbols = ctx.index.pattern_symbol_set(&name)?;
                let union = ctx.stm_symbols.len() + pattern_symbols.len() - intersection;
                let jaccard = if union == 0 { 0.0 } else { intersection as f64 / union as f64 };
                if jaccard >= ctx.config.jaccard_threshold && intersection >= ctx.config.jaccard_min_overlap {
                    Some(name)
                } else {
                    None
                }
            })
            .collect()
    }
}

struct BloomStage;
impl FilterStage for BloomStage {
    fn name(&self) -> &'static str {
        "bloom"
    }
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName> {
        if guard_overflow(self.name(), &candidates, ctx.config.max_candidates_per_stage) {
            return candidates;
        }
        let query: Vec<&str> = ctx.stm_symbols.iter().map(|s| s.as_str()).collect();
        candidates
            .into_iter()
            .filter(|name| ctx.index.bloom_contains_any(name, query.iter().copied()))
            .collect()
    }
}

struct MinhashStage;
impl FilterStage for MinhashStage {
    fn name(&self) -> &'static str {
        "minhash"
    }
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName> {
        if guard_overflow(self.name(), &candidates, ctx.config.max_candidates_per_stage) {
            return candidates;
        }
        let query = MinHashSignature::compute(
            ctx.stm_symbols.iter().map(|s| s.as_str()),
            ctx.config.minhash_num_hashes,
        );
        candidates
            .into_iter()
            .filter(|name| {
                ctx.index
                    .minhash_collides(name, &query, ctx.config.minhash_bands, ctx.config.minhash_rows)
            })
            .collect()
    }
}

struct RapidfuzzStage;
impl FilterStage for RapidfuzzStage {
    fn name(&self) -> &'static str {
        "rapidfuzz"
    }
    fn apply(&self, candidates: Vec<PatternName>, ctx: &FilterContext) -> Vec<PatternName> {
        if guard_overflow(self.name(), &candidates, ctx.config.max_candidates_per_stage) {
            return candidates;
        }
        let mut stm_syms: Vec<&str> = ctx.stm_symbols.iter().map(|s| s.as_str()).collect();
        stm_syms.sort_unstable();
        let joined_stm = crate::index::ngram::joined_string(stm_syms.into_iter());
        let threshold = ctx.config.recall_threshold * 100.0;

        candidates
            .into_iter()
            .filter(|name| {
                let Some(joined_pattern) = ctx.index.joined_string_for(name) else {
                    return true;
                };
                let score = crate::similarity::levenshtein_ratio(&joined_stm, &joined_pattern) * 100.0;
                score >= threshold
            })
            .collect()
    }
}

fn stage_for(kind: FilterStageKind) -> Box<dyn FilterStage> {
    match kind {
        FilterStageKind::Length => Box::new(LengthStage),
        FilterStageKind::Jaccard => Box::new(JaccardStage),
        FilterStageKind::Bloom => Box::new(BloomStage),
        FilterStageKind::Minhash => Box::new(MinhashStage),
        FilterStageKind::Rapidfuzz => Box::new(RapidfuzzStage),
    }
}

/// Run the declared pipeline in order, stage k seeing only stage k-1's
/// output (§4.4). An empty pipeline loads every pattern in the index
/// (explicit caller risk, per spec). Output is sorted by pattern name for
/// determinism, independent of how each stage internally iterated.
pub fn run_pipeline(stm: &Sequence, index: &CandidateIndex, config: &SessionConfiguration) -> Vec<PatternName> {
    let ctx = FilterContext::new(stm, index, config);

    let mut candidates: Vec<PatternName> = if config.filter_pipeline.is_empty() {
        index.all_names().into_iter().collect()
    } else {
        let mut current: Vec<PatternName> = index.all_names().into_iter().collect();
        for kind in &config.filter_pipeline {
            let stage = stage_for(*kind);
            let before = current.len();
            current = stage.apply(current, &ctx);
            if config.enable_filter_metrics {
                log::debug!(
                    "filter stage '{}': {} -> {} candidates",
                    stage.name(),
                    before,
                    current.len()
                );
            }
        }
        current
    };

    candidates.sort();
    candidates.dedup();
    candidates
}
