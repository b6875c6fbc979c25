//! Persistence collaborator interfaces (§1 "deliberately out of scope",
//! §6 store traits). A real deployment backs these with a pattern store, a
//! vector store, and connection pooling; this crate ships an in-memory
//! reference implementation of each so the engine is runnable and testable
//! standalone.

use crate::error::{KatoError, Result};
use crate::pattern::{LibraryId, Pattern};
use crate::symbol::{PatternName, VectorName};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn upsert(&self, library_id: &LibraryId, pattern: Pattern) -> Result<()>;
    async fn get(&self, library_id: &LibraryId, name: &PatternName) -> Result<Option<Pattern>>;
    async fn all(&self, library_id: &LibraryId) -> Result<Vec<Pattern>>;
    async fn drop_all(&self, library_id: &LibraryId) -> Result<()>;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn put(&self, name: &VectorName, vector: &[f32]) -> Result<()>;
    async fn get(&self, name: &VectorName) -> Result<Option<Vec<f32>>>;
}

/// Default `PatternStore`: an `Arc<RwLock<_>>`-backed map, cheap to clone.
#[derive(Default)]
pub struct InMemoryPatternStore {
    libraries: RwLock<HashMap<LibraryId, HashMap<PatternName, Pattern>>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn upsert(&self, library_id: &LibraryId, pattern: Pattern) -> Result<()> {
        let mut libraries = self
            .libraries
            .write()
            .map_err(|_| KatoError::Storage("pattern store lock poisoned".into()))?;
        libraries
            .entry(library_id.clone())
            .or_default()
            .insert(pattern.name.clone(), pattern);
        Ok(())
    }

    async fn get(&self, library_id: &LibraryId, name: &PatternName) -> Result<Option<Pattern>> {
        let libraries = self
            .libraries
            .read()
            .map_err(|_| KatoError::Storage("pattern store lock poisoned".into()))?;
        Ok(libraries
            .get(library_id)
            .and_then(|patterns| patterns.get(name))
            .cloned())
    }

    async fn all(&self, library_id: &LibraryId) -> Result<Vec<Pattern>> {
        let libraries = self
            .libraries
            .read()
            .map_err(|_| KatoError::Storage("pattern store lock poisoned".into()))?;
        Ok(libraries
            .get(library_id)
            .map(|patterns| patterns.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn drop_all(&self, library_id: &LibraryId) -> Result<()> {
        let mut libraries = self
            .libraries
            .write()
            .map_err(|_| KatoError::Storage("pattern store lock poisoned".into()))?;
        libraries.remove(library_id);
        Ok(())
    }
}

/// Default `VectorStore`: vectors referenced by at least one pattern persist
/// for the process lifetime; `put` is idempotent for identical vectors under
/// the same hash (§3 invariant; see DESIGN.md for the collision tie-break).
#[derive(Default)]
pub struct InMemoryVectorStore {
    vectors: RwLock<HashMap<VectorName, Vec<f32>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn put(&self, name: &VectorName, vector: &[f32]) -> Result<()> {
        let mut vectors = self
            .vectors
            .write()
            .map_err(|_| KatoError::Storage("vector store lock poisoned".into()))?;
        vectors.entry(name.clone()).or_insert_with(|| vector.to_vec());
        Ok(())
    }

    async fn get(&self, name: &VectorName) -> Result<Option<Vec<f32>>> {
        let vectors = self
            .vectors
            .read()
            .map_err(|_| KatoError::Storage("vector store lock poisoned".into()))?;
        Ok(vectors.get(name).cloned())
    }
}
