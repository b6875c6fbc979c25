//! Error taxonomy (§7). One enum covers every error kind the core can raise;
//! `PatternNotFoundError` is deliberately absent — per §7 a missing pattern
//! "returns null, not raised", so lookups return `Result<Option<Pattern>, KatoError>`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KatoError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimension { expected: usize, actual: usize },

    #[error("cannot learn from an empty short-term memory")]
    EmptyLearn,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("filter stage overflow: {stage} received {candidates} candidates (limit {limit})")]
    StageOverflow {
        stage: String,
        candidates: usize,
        limit: usize,
    },

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, KatoError>;
