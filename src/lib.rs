//! KATO — a deterministic symbolic-sequence learning and prediction engine
//! (§1). See `SPEC_FULL.md` for the full component breakdown; this crate
//! implements C1-C10 plus the ambient stack (error taxonomy, config
//! validation, store traits, logging) described there.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod library;
pub mod metrics;
pub mod numerical_stability;
pub mod observation;
pub mod pattern;
pub mod prediction;
pub mod ranker;
pub mod segment;
pub mod session;
pub mod similarity;
pub mod store;
pub mod symbol;

pub use config::{FilterStageKind, RankSortAlgo, SessionConfiguration, StmMode};
pub use engine::{Engine, ObserveSequenceOptions};
pub use error::{KatoError, Result};
pub use observation::Observation;
pub use pattern::{LibraryId, Pattern};
pub use prediction::{FuturePotential, Prediction, PredictionEnvelope};
pub use session::{ObserveResult, SessionId, SessionState};
pub use store::{InMemoryPatternStore, InMemoryVectorStore, PatternStore, VectorStore};
pub use symbol::{Event, PatternName, Sequence, Symbol, VectorName};
