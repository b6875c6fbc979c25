//! Session Memory Core (C9, §4.9): per-session STM state machine, emotive
//! rolling window, metadata accumulator, and the auto-learn trigger.

use crate::config::{SessionConfiguration, StmMode};
use crate::error::{KatoError, Result};
use crate::index::CandidateIndex;
use crate::library::Library;
use crate::observation::canonicalize;
use crate::pattern::{EmotiveWindow, LibraryId};
use crate::store::VectorStore;
use crate::symbol::{PatternName, Sequence};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// The two STM states named in §4.9; tracked informatively alongside `stm`
/// rather than as a separate enum field, since `stm.is_empty()` already
/// carries the distinction and no transition depends on anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Accumulating,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub library_id: LibraryId,
    pub stm: Sequence,
    pub emotives_window: HashMap<String, EmotiveWindow>,
    pub metadata_accum: HashMap<String, HashSet<String>>,
    pub time_counter: u64,
    pub config: SessionConfiguration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObserveResult {
    pub stm_length: usize,
    pub time: u64,
    pub auto_learned_pattern: Option<PatternName>,
}

impl SessionState {
    pub fn new(library_id: LibraryId, mut config: SessionConfiguration) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            library_id,
            stm: Vec::new(),
            emotives_window: HashMap::new(),
            metadata_accum: HashMap::new(),
            time_counter: 0,
            config,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        if self.stm.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Accumulating
        }
    }

    /// Session-level emotive contribution folded into a learned pattern: the
    /// mean of each key's rolling window. The spec only specifies the
    /// per-pattern accumulator (§3); this mean-of-window choice is this
    /// implementation's resolution of how a session's running emotives
    /// collapse into the single scalar `Pattern::relearn` expects per learn.
    fn emotive_snapshot(&self) -> HashMap<String, f64> {
        self.emotives_window.iter().map(|(k, w)| (k.clone(), w.mean())).collect()
    }

    /// Observe one input (§4.9). Canonicalizes via the Symbolizer (C1); a
    /// no-op observation (no symbols) leaves all session state untouched,
    /// including `time_counter` (§8 universal invariant).
    pub async fn observe(
        &mut self,
        observation: &crate::observation::Observation,
        vector_store: &dyn VectorStore,
        library: &Library,
        index: &CandidateIndex,
    ) -> Result<ObserveResult> {
        let event = canonicalize(observation, vector_store, self.config.sort_symbols).await?;
        let Some(event) = event else {
            return Ok(ObserveResult {
                stm_length: self.stm.len(),
                time: self.time_counter,
                auto_learned_pattern: None,
            });
        };

        self.stm.push(event);
        self.time_counter += 1;

        for (key, value) in &observation.emotives {
            self.emotives_window
                .entry(key.clone())
                .or_insert_with(|| EmotiveWindow::new(self.config.persistence))
                .push(*value);
        }
        for (key, value) in &observation.metadata {
            self.metadata_accum.entry(key.clone()).or_default().insert(value.clone());
        }

        let mut auto_learned_pattern = None;
        if self.config.max_pattern_length > 0 && self.stm.len() >= self.config.max_pattern_length {
            let name = library
                .learn(
                    self.stm.clone(),
                    &self.emotive_snapshot(),
                    &self.metadata_accum,
                    self.config.persistence,
                )
                .await?;
            if let Some(pattern) = library.get(&name).await? {
                index.sync_pattern(&pattern, &self.config);
            }
            log::info!("auto-learn triggered at stm length {}: {}", self.stm.len(), name);
            auto_learned_pattern = Some(name);

            match self.config.stm_mode {
                StmMode::Clear => self.stm.clear(),
                StmMode::Rolling => {
                    if !self.stm.is_empty() {
                        self.stm.remove(0);
                    }
                }
            }
        }

        Ok(ObserveResult {
            stm_length: self.stm.len(),
            time: self.time_counter,
            auto_learned_pattern,
        })
    }

    /// Explicit `learn` (§4.9): rejects on an empty STM.
    pub async fn learn(&mut self, library: &Library, index: &CandidateIndex) -> Result<PatternName> {
        if self.stm.is_empty() {
            return Err(KatoError::EmptyLearn);
        }
        let name = library
            .learn(self.stm.clone(), &self.emotive_snapshot(), &self.metadata_accum, self.config.persistence)
            .await?;
        if let Some(pattern) = library.get(&name).await? {
            index.sync_pattern(&pattern, &self.config);
        }
        Ok(name)
    }

    pub fn clear_stm(&mut self) {
        self.stm.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use crate::store::{InMemoryPatternStore, InMemoryVectorStore};
    use std::sync::Arc;

    fn library() -> (Library, CandidateIndex) {
        let store: Arc<dyn crate::store::PatternStore> = Arc::new(InMemoryPatternStore::new());
        (Library::new(LibraryId::new("lib"), store), CandidateIndex::new())
    }

    #[tokio::test]
    async fn empty_observation_leaves_state_unchanged() {
        let (library, index) = library();
        let vs = InMemoryVectorStore::new();
        let mut session = SessionState::new(LibraryId::new("lib"), SessionConfiguration::default()).unwrap();

        let result = session.observe(&Observation::default(), &vs, &library, &index).await.unwrap();
        assert_eq!(result.stm_length, 0);
        assert_eq!(result.time, 0);
        assert!(session.stm.is_empty());
    }

    #[tokio::test]
    async fn auto_learn_clear_empties_stm() {
        let (library, index) = library();
        let vs = InMemoryVectorStore::new();
        let mut config = SessionConfiguration::default();
        config.max_pattern_length = 3;
        config.stm_mode = StmMode::Clear;
        let mut session = SessionState::new(LibraryId::new("lib"), config).unwrap();

        for s in ["x", "y"] {
            let r = session.observe(&Observation::with_strings([s]), &vs, &library, &index).await.unwrap();
            assert!(r.auto_learned_pattern.is_none());
        }
        let r = session.observe(&Observation::with_strings(["z"]), &vs, &library, &index).await.unwrap();
        assert!(r.auto_learned_pattern.is_some());
        assert!(session.stm.is_empty());
    }

    #[tokio::test]
    async fn auto_learn_rolling_drops_oldest_event() {
        let (library, index) = library();
        let vs = InMemoryVectorStore::new();
        let mut config = SessionConfiguration::default();
        config.max_pattern_length = 3;
        config.stm_mode = StmMode::Rolling;
        let mut session = SessionState::new(LibraryId::new("lib"), config).unwrap();

        for s in ["x", "y", "z"] {
            session.observe(&Observation::with_strings([s]), &vs, &library, &index).await.unwrap();
        }
        assert_eq!(session.stm.len(), 2);
        assert_eq!(session.stm[0][0].as_str(), "y");
        assert_eq!(session.stm[1][0].as_str(), "z");
    }

    #[tokio::test]
    async fn explicit_learn_on_empty_stm_is_rejected() {
        let (library, index) = library();
        let mut session = SessionState::new(LibraryId::new("lib"), SessionConfiguration::default()).unwrap();
        let result = session.learn(&library, &index).await;
        assert!(matches!(result, Err(KatoError::EmptyLearn)));
    }

    #[tokio::test]
    async fn clear_stm_then_observe_matches_fresh_session() {
        let (library, index) = library();
        let vs = InMemoryVectorStore::new();
        let mut session = SessionState::new(LibraryId::new("lib"), SessionConfiguration::default()).unwrap();
        session.observe(&Observation::with_strings(["a"]), &vs, &library, &index).await.unwrap();
        session.clear_stm();
        session.observe(&Observation::with_strings(["b"]), &vs, &library, &index).await.unwrap();

        let mut fresh = SessionState::new(LibraryId::new("lib"), SessionConfiguration::default()).unwrap();
        fresh.observe(&Observation::with_strings(["b"]), &vs, &library, &index).await.unwrap();

        assert_eq!(session.stm, fresh.stm);
    }
}
