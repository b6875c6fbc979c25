//! Observation ingestion and the Symbolizer (C1, §4.1).

use crate::error::{KatoError, Result};
use crate::store::VectorStore;
use crate::symbol::{Event, Symbol, VectorName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const VECTOR_DIMENSION: usize = 768;

/// A single multimodal observation fed to `Engine::observe` (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    pub strings: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
    pub emotives: HashMap<String, f64>,
    /// Already coerced to strings by the caller; accumulated as a set per key.
    pub metadata: HashMap<String, String>,
    pub unique_id: Option<String>,
}

impl Observation {
    pub fn with_strings(strings: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            strings: strings.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Canonicalize an observation into an ordered event, or `None` if it
/// carries no symbols (a no-op on STM). Pure in its inputs + `sort_symbols`
/// aside from the (idempotent) vector-store side effect (§4.1).
pub async fn canonicalize(
    observation: &Observation,
    vector_store: &dyn VectorStore,
    sort_symbols: bool,
) -> Result<Option<Event>> {
    let mut symbols: Vec<Symbol> = observation.strings.iter().map(|s| Symbol::new(s.as_str())).collect();

    for vector in &observation.vectors {
        if vector.len() != VECTOR_DIMENSION {
            return Err(KatoError::VectorDimension {
                expected: VECTOR_DIMENSION,
                actual: vector.len(),
            });
        }
        let name = VectorName::from_vector(vector);
        vector_store.put(&name, vector).await?;
        symbols.push(name.as_symbol());
    }

    if symbols.is_empty() {
        return Ok(None);
    }

    if sort_symbols {
        symbols.sort();
    }

    Ok(Some(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryVectorStore;

    #[tokio::test]
    async fn empty_observation_is_a_no_op() {
        let store = InMemoryVectorStore::new();
        let obs = Observation::default();
        let event = canonicalize(&obs, &store, true).await.unwrap();
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn sort_symbols_makes_order_irrelevant() {
        let store = InMemoryVectorStore::new();
        let ab = Observation::with_strings(["a", "b"]);
        let ba = Observation::with_strings(["b", "a"]);
        let ab_event = canonicalize(&ab, &store, true).await.unwrap().unwrap();
        let ba_event = canonicalize(&ba, &store, true).await.unwrap().unwrap();
        assert_eq!(ab_event, ba_event);
    }

    #[tokio::test]
    async fn unsorted_preserves_input_order() {
        let store = InMemoryVectorStore::new();
        let obs = Observation::with_strings(["b", "a"]);
        let event = canonicalize(&obs, &store, false).await.unwrap().unwrap();
        assert_eq!(event, vec![Symbol::new("b"), Symbol::new("a")]);
    }

    #[tokio::test]
    async fn wrong_dimension_vector_is_rejected() {
        let store = InMemoryVectorStore::new();
        let mut obs = Observation::default();
        obs.vectors.push(vec![0.0; 10]);
        let result = canonicalize(&obs, &store, true).await;
        assert!(matches!(result, Err(KatoError::VectorDimension { expected: 768, actual: 10 })));
    }

    #[tokio::test]
    async fn vector_symbol_has_vctr_prefix_and_persists() {
        let store = InMemoryVectorStore::new();
        let mut obs = Observation::default();
        obs.vectors.push(vec![1.0; 768]);
        let event = canonicalize(&obs, &store, true).await.unwrap().unwrap();
        assert_eq!(event.len(), 1);
        assert!(event[0].is_vector_derived());

        let name = VectorName::from_vector(&vec![1.0; 768]);
        assert!(store.get(&name).await.unwrap().is_some());
    }
}
