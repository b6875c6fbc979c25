//! Engine Facade (C10, §4.10): orchestrates observe → (maybe auto-learn) →
//! predict for one session call. Owns no matching logic itself — each step
//! delegates to C1-C9; this module is wiring plus the concurrency model of
//! §5 (per-session mutex, per-library shard).

use crate::config::SessionConfiguration;
use crate::error::Result;
use crate::filter;
use crate::index::CandidateIndex;
use crate::library::Library;
use crate::metrics;
use crate::observation::Observation;
use crate::pattern::{LibraryId, Pattern};
use crate::prediction::{Prediction, PredictionEnvelope};
use crate::ranker;
use crate::segment::segment;
use crate::session::{ObserveResult, SessionId, SessionState};
use crate::similarity::{levenshtein_ratio, token_similarity};
use crate::store::{PatternStore, VectorStore};
use crate::symbol::{flatten, PatternName};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A library's learned patterns plus the candidate indices built over them
/// (§5 "shared state"): one shard per `library_id`, reads lock-free-ish
/// (shard-scoped `RwLock`), writes serialized per shard.
struct LibraryShard {
    library: Library,
    index: CandidateIndex,
}

/// Per-call options for `observe_sequence` (§4.10).
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserveSequenceOptions {
    pub learn_after_each: bool,
    pub learn_at_end: bool,
    pub clear_stm_between: bool,
}

pub struct Engine {
    pattern_store: Arc<dyn PatternStore>,
    vector_store: Arc<dyn VectorStore>,
    shards: RwLock<HashMap<LibraryId, Arc<LibraryShard>>>,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionState>>>>,
}

impl Engine {
    pub fn new(pattern_store: Arc<dyn PatternStore>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            pattern_store,
            vector_store,
            shards: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn shard_for(&self, library_id: &LibraryId) -> Arc<LibraryShard> {
        if let Some(shard) = self.shards.read().await.get(library_id) {
            return shard.clone();
        }
        let mut shards = self.shards.write().await;
        shards
            .entry(library_id.clone())
            .or_insert_with(|| {
                Arc::new(LibraryShard {
                    library: Library::new(library_id.clone(), self.pattern_store.clone()),
                    index: CandidateIndex::new(),
                })
            })
            .clone()
    }

    pub async fn create_session(
        &self,
        session_id: SessionId,
        library_id: LibraryId,
        config: SessionConfiguration,
    ) -> Result<()> {
        let state = SessionState::new(library_id, config)?;
        self.sessions.write().await.insert(session_id, Arc::new(Mutex::new(state)));
        Ok(())
    }

    async fn session_handle(&self, session_id: &SessionId) -> Result<Arc<Mutex<SessionState>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| crate::error::KatoError::Validation(format!("unknown session {:?}", session_id.0)))
    }

    pub async fn observe(&self, session_id: &SessionId, observation: &Observation) -> Result<ObserveResult> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let shard = self.shard_for(&session.library_id).await;
        session.observe(observation, self.vector_store.as_ref(), &shard.library, &shard.index).await
    }

    /// §4.10: stream `observations` through one session, with the three
    /// caller-declared hooks applied after each element / at the end.
    pub async fn observe_sequence(
        &self,
        session_id: &SessionId,
        observations: &[Observation],
        opts: ObserveSequenceOptions,
    ) -> Result<Vec<ObserveResult>> {
        let handle = self.session_handle(session_id).await?;
        let mut results = Vec::with_capacity(observations.len());
        let mut session = handle.lock().await;
        let shard = self.shard_for(&session.library_id).await;

        for observation in observations {
            let result = session.observe(observation, self.vector_store.as_ref(), &shard.library, &shard.index).await?;
            results.push(result);
            if opts.learn_after_each && !session.stm.is_empty() {
                session.learn(&shard.library, &shard.index).await?;
            }
            if opts.clear_stm_between {
                session.clear_stm();
            }
        }
        if opts.learn_at_end && !session.stm.is_empty() {
            session.learn(&shard.library, &shard.index).await?;
        }
        Ok(results)
    }

    pub async fn learn(&self, session_id: &SessionId) -> Result<PatternName> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;
        let shard = self.shard_for(&session.library_id).await;
        session.learn(&shard.library, &shard.index).await
    }

    pub async fn clear_stm(&self, session_id: &SessionId) -> Result<()> {
        let handle = self.session_handle(session_id).await?;
        handle.lock().await.clear_stm();
        Ok(())
    }

    pub async fn clear_all(&self, library_id: &LibraryId) -> Result<()> {
        let shard = self.shard_for(library_id).await;
        shard.library.drop_all().await?;
        shard.index.remove_all();
        log::info!("library {}: cleared all patterns and indices", library_id);
        Ok(())
    }

    pub async fn get_pattern(&self, library_id: &LibraryId, name: &PatternName) -> Result<Option<Pattern>> {
        let shard = self.shard_for(library_id).await;
        shard.library.get(name).await
    }

    pub async fn update_session_config(&self, session_id: &SessionId, mut config: SessionConfiguration) -> Result<()> {
        config.validate()?;
        let handle = self.session_handle(session_id).await?;
        handle.lock().await.config = config;
        Ok(())
    }

    /// §4.4-§4.8 orchestration: filter → score → segment → evaluate metrics
    /// → rank. CPU-bound stages fan out with `rayon`, never touching the
    /// async executor (§5 "suspension points").
    pub async fn predict(&self, session_id: &SessionId) -> Result<PredictionEnvelope> {
        let handle = self.session_handle(session_id).await?;
        let session = handle.lock().await;
        let stm = session.stm.clone();
        let config = session.config.clone();
        let library_id = session.library_id.clone();
        drop(session);

        let shard = self.shard_for(&library_id).await;

        let candidate_names = filter::run_pipeline(&stm, &shard.index, &config);

        let mut patterns = Vec::with_capacity(candidate_names.len());
        for name in &candidate_names {
            if let Some(pattern) = shard.library.get(name).await? {
                patterns.push(pattern);
            }
        }

        let stats = shard.library.stats().await?;

        let stm_tokens = flatten(&stm);
        let stm_joined = crate::index::ngram::joined_string(stm_tokens.iter().map(|s| s.as_str()));

        let scored: Vec<(Pattern, crate::segment::Segmentation, f64)> = patterns
            .into_par_iter()
            .filter_map(|pattern| {
                let similarity = if config.use_token_matching {
                    let pattern_tokens = flatten(&pattern.data);
                    token_similarity(&stm_tokens, &pattern_tokens)
                } else {
                    let joined_pattern = shard
                        .index
                        .joined_string_for(&pattern.name)
                        .unwrap_or_else(|| crate::index::ngram::joined_string(flatten(&pattern.data).iter().map(|s| s.as_str())));
                    levenshtein_ratio(&stm_joined, &joined_pattern)
                };
                if similarity < config.recall_threshold {
                    return None;
                }
                let segmentation = segment(&stm, &pattern.data)?;
                Some((pattern, segmentation, similarity))
            })
            .collect();

        let ensemble_total_frequency: u64 = scored.iter().map(|(p, _, _)| p.frequency).sum();

        let raw_metrics: Vec<metrics::CandidateMetrics> = scored
            .par_iter()
            .map(|(pattern, segmentation, similarity)| {
                metrics::evaluate_candidate(pattern, &stm, segmentation, *similarity, &stats, ensemble_total_frequency)
            })
            .collect();

        let (predictive_information, bayesian_posterior) = metrics::normalize_ensemble(&raw_metrics);

        let mut predictions = Vec::with_capacity(scored.len());
        for (i, (pattern, segmentation, _similarity)) in scored.into_iter().enumerate() {
            let cm = &raw_metrics[i];
            predictions.push(Prediction {
                name: pattern.name.clone(),
                kind: "prototypical",
                frequency: pattern.frequency,
                matches: segmentation.matches,
                missing: segmentation.missing,
                extras: segmentation.extras,
                past: segmentation.past,
                present: segmentation.present,
                future: segmentation.future,
                confidence: cm.confidence,
                evidence: cm.evidence,
                similarity: cm.similarity,
                snr: cm.snr,
                fragmentation: cm.fragmentation,
                entropy: cm.entropy,
                normalized_entropy: cm.normalized_entropy,
                global_normalized_entropy: cm.global_normalized_entropy,
                confluence: cm.confluence,
                itfdf_similarity: cm.itfdf_similarity,
                predictive_information: predictive_information[i],
                tfidf_score: cm.tfidf_score,
                bayesian_prior: cm.bayesian_prior,
                bayesian_likelihood: cm.bayesian_likelihood,
                bayesian_posterior: bayesian_posterior[i],
                potential: cm.potential,
                emotives: pattern.emotive_means(),
                anomalies: segmentation.anomalies,
            });
        }

        Ok(ranker::build_envelope(predictions, config.rank_sort_algo, config.max_predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RankSortAlgo, StmMode};
    use crate::store::{InMemoryPatternStore, InMemoryVectorStore};

    fn engine() -> Engine {
        Engine::new(Arc::new(InMemoryPatternStore::new()), Arc::new(InMemoryVectorStore::new()))
    }

    #[tokio::test]
    async fn simple_linear_sequence_end_to_end() {
        // §8 scenario 1
        let engine = engine();
        let session_id = SessionId("s1".into());
        let library_id = LibraryId::new("lib1");
        engine
            .create_session(session_id.clone(), library_id.clone(), SessionConfiguration::default())
            .await
            .unwrap();

        for s in ["a", "b", "c"] {
            engine.observe(&session_id, &Observation::with_strings([s])).await.unwrap();
        }
        engine.learn(&session_id).await.unwrap();
        engine.clear_stm(&session_id).await.unwrap();
        engine.observe(&session_id, &Observation::with_strings(["b"])).await.unwrap();

        let envelope = engine.predict(&session_id).await.unwrap();
        assert_eq!(envelope.predictions.len(), 1);
        let p = &envelope.predictions[0];
        assert_eq!(p.past, vec![vec![crate::symbol::Symbol::new("a")]]);
        assert_eq!(p.present, vec![vec![crate::symbol::Symbol::new("b")]]);
        assert_eq!(p.future, vec![vec![crate::symbol::Symbol::new("c")]]);
        assert_eq!(p.matches, vec![crate::symbol::Symbol::new("b")]);
        assert!(p.missing.is_empty());
        assert!(p.extras.is_empty());
        assert!((p.confidence - 1.0).abs() < 1e-9);
        assert!((p.evidence - 1.0 / 3.0).abs() < 1e-9);
        assert!((p.snr - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn one_symbol_stm_yields_no_predictions() {
        // §8 boundary: minimum learnability
        let engine = engine();
        let session_id = SessionId("s1".into());
        let library_id = LibraryId::new("lib1");
        engine
            .create_session(session_id.clone(), library_id.clone(), SessionConfiguration::default())
            .await
            .unwrap();
        engine.observe(&session_id, &Observation::with_strings(["a", "b"])).await.unwrap();
        engine.learn(&session_id).await.unwrap();
        engine.clear_stm(&session_id).await.unwrap();
        engine.observe(&session_id, &Observation::with_strings(["z"])).await.unwrap();

        let envelope = engine.predict(&session_id).await.unwrap();
        assert!(envelope.predictions.is_empty());
    }

    #[tokio::test]
    async fn max_predictions_one_returns_at_most_one() {
        let engine = engine();
        let session_id = SessionId("s1".into());
        let library_id = LibraryId::new("lib1");
        let mut config = SessionConfiguration::default();
        config.max_predictions = 1;
        config.recall_threshold = 0.0;
        config.jaccard_threshold = 0.0;
        config.jaccard_min_overlap = 1;
        config.rank_sort_algo = RankSortAlgo::Potential;
        engine.create_session(session_id.clone(), library_id.clone(), config).await.unwrap();

        for pair in [["a", "b"], ["a", "c"]] {
            engine.observe(&session_id, &Observation::with_strings(pair)).await.unwrap();
            engine.learn(&session_id).await.unwrap();
            engine.clear_stm(&session_id).await.unwrap();
        }
        engine.observe(&session_id, &Observation::with_strings(["a"])).await.unwrap();
        let envelope = engine.predict(&session_id).await.unwrap();
        assert!(envelope.predictions.len() <= 1);
    }

    #[tokio::test]
    async fn clear_all_removes_patterns_from_library() {
        let engine = engine();
        let session_id = SessionId("s1".into());
        let library_id = LibraryId::new("lib1");
        engine
            .create_session(session_id.clone(), library_id.clone(), SessionConfiguration::default())
            .await
            .unwrap();
        engine.observe(&session_id, &Observation::with_strings(["a", "b"])).await.unwrap();
        let name = engine.learn(&session_id).await.unwrap();
        assert!(engine.get_pattern(&library_id, &name).await.unwrap().is_some());

        engine.clear_all(&library_id).await.unwrap();
        assert!(engine.get_pattern(&library_id, &name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn auto_learn_via_observe_sequence() {
        let engine = engine();
        let session_id = SessionId("s1".into());
        let library_id = LibraryId::new("lib1");
        let mut config = SessionConfiguration::default();
        config.max_pattern_length = 3;
        config.stm_mode = StmMode::Clear;
        engine.create_session(session_id.clone(), library_id.clone(), config).await.unwrap();

        let observations = vec![
            Observation::with_strings(["x"]),
            Observation::with_strings(["y"]),
            Observation::with_strings(["z"]),
        ];
        let results = engine
            .observe_sequence(&session_id, &observations, ObserveSequenceOptions::default())
            .await
            .unwrap();
        assert!(results[2].auto_learned_pattern.is_some());
    }
}
