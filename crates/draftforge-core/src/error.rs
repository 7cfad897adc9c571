//! Error taxonomy for the generation and indexing pipeline.
//!
//! Validation and addressing errors propagate immediately; mid-pipeline
//! failures are classified fatal-vs-degraded at the stage boundary by
//! the coordinator. Degraded conditions (retrieval returned nothing,
//! brand analysis unavailable) are not errors at all — they are folded
//! into the final response's suggestions.

use thiserror::Error;

/// A single item that could not be written during an upsert batch.
#[derive(Debug, Clone)]
pub struct ItemFailure {
    pub id: String,
    pub reason: String,
}

/// All failure modes surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed request; rejected before any state transition.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A named collection does not exist. Caller addressing error.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A content id was not found in its collection.
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// Embedding or write failure for part of an upsert batch. Items in
    /// `failed` were not written; everything else was committed.
    #[error("index write failed for {} of {} items", failed.len(), attempted)]
    IndexWrite {
        attempted: usize,
        written: usize,
        failed: Vec<ItemFailure>,
    },

    /// Strategy planning or draft generation failed. Fatal to the run.
    /// Carries the partial strategy, when one existed, for diagnostics.
    #[error("generation failed during {stage}: {message}")]
    GenerationFailed {
        stage: String,
        message: String,
        partial_strategy: Option<String>,
    },

    /// A bounded capability call exceeded its deadline. Treated
    /// identically to that call failing.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The caller cancelled an in-flight streaming generation.
    #[error("generation cancelled by caller")]
    Cancelled,

    /// Backend storage failure (index database, vector store).
    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    /// Embedding backend failure after retries were exhausted.
    #[error("embedding failed: {0}")]
    Embedding(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Storage(err)
    }
}

impl EngineError {
    /// Short stable kind label, used in `error` events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation",
            EngineError::CollectionNotFound(_) => "collection_not_found",
            EngineError::ContentNotFound(_) => "content_not_found",
            EngineError::IndexWrite { .. } => "index_write",
            EngineError::GenerationFailed { .. } => "generation_failed",
            EngineError::Timeout { .. } => "timeout",
            EngineError::Cancelled => "cancelled",
            EngineError::Storage(_) => "storage",
            EngineError::Embedding(_) => "embedding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_write_message_counts_failures() {
        let err = EngineError::IndexWrite {
            attempted: 3,
            written: 2,
            failed: vec![ItemFailure {
                id: "b".into(),
                reason: "embedding backend unavailable".into(),
            }],
        };
        assert_eq!(err.to_string(), "index write failed for 1 of 3 items");
        assert_eq!(err.kind(), "index_write");
    }

    #[test]
    fn generation_failed_keeps_partial_strategy() {
        let err = EngineError::GenerationFailed {
            stage: "drafting".into(),
            message: "capability unavailable".into(),
            partial_strategy: Some("thought-leadership angle".into()),
        };
        match err {
            EngineError::GenerationFailed {
                partial_strategy, ..
            } => assert!(partial_strategy.is_some()),
            _ => unreachable!(),
        }
    }
}
