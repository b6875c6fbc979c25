//! Symbols, events, and sequences (§3) plus the content-addressing used to
//! derive pattern and vector names.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::ops::Deref;

pub const VECTOR_PREFIX: &str = "VCTR|";
pub const PATTERN_PREFIX: &str = "PTRN|";

/// A single symbol. Vector-derived symbols carry the `VCTR|<sha1-hex>` form;
/// everything else is a plain string symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_vector_derived(&self) -> bool {
        self.0.starts_with(VECTOR_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Symbol {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(s)
    }
}

/// An ordered sequence of symbols observed "together" (§3 Event).
pub type Event = Vec<Symbol>;

/// An ordered list of events (§3 Sequence).
pub type Sequence = Vec<Event>;

/// Total number of symbols across all events of a sequence.
pub fn symbol_count(seq: &Sequence) -> usize {
    seq.iter().map(|e| e.len()).sum()
}

/// Flatten a sequence into its symbols, preserving event/within-event order.
pub fn flatten(seq: &Sequence) -> Vec<Symbol> {
    seq.iter().flat_map(|e| e.iter().cloned()).collect()
}

/// Canonical nested-list serialization used as the hash input for pattern
/// names (§3): `[["a","b"],["c"]]`-shaped, independent of hashmap iteration
/// order since `Sequence`/`Event` are plain ordered vectors.
pub fn canonical_serialization(seq: &Sequence) -> String {
    let mut out = String::from("[");
    for (i, event) in seq.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        for (j, sym) in event.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push('"');
            for c in sym.as_str().chars() {
                if c == '"' || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
        out.push(']');
    }
    out.push(']');
    out
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A pattern's identity: `"PTRN|" + sha1(canonical_serialization(data))`.
/// Pure function of `data` — two equal sequences always hash to the same name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatternName(pub String);

impl PatternName {
    pub fn from_data(data: &Sequence) -> Self {
        let hex = sha1_hex(canonical_serialization(data).as_bytes());
        PatternName(format!("{}{}", PATTERN_PREFIX, hex))
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A vector's identity: `"VCTR|" + sha1(canonical_float_bytes(v))`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorName(pub String);

impl VectorName {
    pub fn from_vector(vector: &[f32]) -> Self {
        let hex = sha1_hex(&crate::numerical_stability::canonical_float_bytes(vector));
        VectorName(format!("{}{}", VECTOR_PREFIX, hex))
    }

    pub fn as_symbol(&self) -> Symbol {
        Symbol(self.0.clone())
    }
}

impl fmt::Display for VectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(events: &[&[&str]]) -> Sequence {
        events
            .iter()
            .map(|e| e.iter().map(|s| Symbol::new(*s)).collect())
            .collect()
    }

    #[test]
    fn pattern_name_is_deterministic() {
        let a = seq(&[&["a", "b"], &["c"]]);
        let b = seq(&[&["a", "b"], &["c"]]);
        assert_eq!(PatternName::from_data(&a), PatternName::from_data(&b));
    }

    #[test]
    fn pattern_name_distinguishes_event_boundaries() {
        // [["a"],["b","c"]] must not collide with [["a","b"],["c"]]
        let a = seq(&[&["a"], &["b", "c"]]);
        let b = seq(&[&["a", "b"], &["c"]]);
        assert_ne!(PatternName::from_data(&a), PatternName::from_data(&b));
    }

    #[test]
    fn pattern_name_format() {
        let name = PatternName::from_data(&seq(&[&["a"], &["b"]]));
        assert!(name.0.starts_with("PTRN|"));
        assert_eq!(name.0.len(), "PTRN|".len() + 40);
        assert!(name.0["PTRN|".len()..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn vector_name_format() {
        let v = vec![0.0f32; 768];
        let name = VectorName::from_vector(&v);
        assert!(name.0.starts_with("VCTR|"));
        assert_eq!(name.0.len(), "VCTR|".len() + 40);
    }

    #[test]
    fn symbol_count_sums_events() {
        let s = seq(&[&["a", "b"], &["c"]]);
        assert_eq!(symbol_count(&s), 3);
    }
}
