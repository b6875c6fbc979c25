//! Temporal Segmenter (C6, §4.6): splits a candidate pattern's events into
//! past/present/future relative to what STM actually observed, and records
//! the symbol-level diff (`matches`/`missing`/`extras`) plus any fuzzy-match
//! anomalies.

use crate::symbol::{flatten, Event, Sequence, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub observed: Symbol,
    pub expected: Symbol,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub past: Sequence,
    pub present: Sequence,
    pub future: Sequence,
    pub matches: Vec<Symbol>,
    pub missing: Vec<Symbol>,
    pub extras: Vec<Symbol>,
    pub anomalies: Vec<Anomaly>,
}

/// Segment pattern events `pattern` against the observed STM events `stm`
/// (§4.6). Returns `None` when no STM symbol appears anywhere in `pattern`
/// (undefined segmentation; §4.6 tie-break — such a candidate should not
/// have survived §4.5 scoring).
pub fn segment(stm: &Sequence, pattern: &Sequence) -> Option<Segmentation> {
    let stm_symbols: HashSet<Symbol> = flatten(stm).into_iter().collect();

    let matched_event_indices: Vec<usize> = pattern
        .iter()
        .enumerate()
        .filter(|(_, event)| event.iter().any(|s| stm_symbols.contains(s)))
        .map(|(i, _)| i)
        .collect();

    let (lo, hi) = match (matched_event_indices.first(), matched_event_indices.last()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => return None,
    };

    let past: Sequence = pattern[0..lo].to_vec();
    let present: Sequence = pattern[lo..=hi].to_vec();
    let future: Sequence = pattern[(hi + 1)..].to_vec();

    let present_symbols = flatten(&present);
    let stm_flat = flatten(stm);
    let present_set: HashSet<&Symbol> = present_symbols.iter().collect();
    let stm_set: HashSet<&Symbol> = stm_flat.iter().collect();

    let mut matches: Vec<Symbol> = present_symbols.iter().filter(|s| stm_set.contains(s)).cloned().collect();
    matches.sort();

    let missing: Vec<Symbol> = present_symbols.into_iter().filter(|s| !stm_set.contains(s)).collect();
    let extras: Vec<Symbol> = stm_flat.into_iter().filter(|s| !present_set.contains(s)).collect();

    Some(Segmentation {
        past,
        present,
        future,
        matches,
        missing,
        extras,
        anomalies: Vec::new(),
    })
}

/// Number of contiguous matched-event blocks in `present` (§4.7
/// `fragmentation` input): count runs of consecutive events that contain at
/// least one STM symbol.
pub fn matched_event_blocks(stm: &Sequence, present: &Sequence) -> usize {
    let stm_set: HashSet<Symbol> = flatten(stm).into_iter().collect();
    let mut blocks = 0usize;
    let mut in_block = false;
    for event in present {
        let hit = has_match(event, &stm_set);
        if hit && !in_block {
            blocks += 1;
            in_block = true;
        } else if !hit {
            in_block = false;
        }
    }
    blocks
}

fn has_match(event: &Event, stm_set: &HashSet<Symbol>) -> bool {
    event.iter().any(|s| stm_set.contains(s))
}
