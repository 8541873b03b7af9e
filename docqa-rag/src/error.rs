//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A single text could not be embedded (for example because it is too
    /// long for the model). Other texts in the same pass may still succeed.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The embedding service cannot be used at all: bad credentials,
    /// exhausted quota, unreachable endpoint, or a misconfigured model.
    #[error("Embedding service unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An embedding pass over a document was aborted and produced nothing usable.
    #[error("Embedding pass failed: {0}")]
    EmbeddingBatch(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    /// Whether this failure concerns one input only, so the caller may skip
    /// the item and carry on with the rest of the batch.
    pub fn is_item_failure(&self) -> bool {
        matches!(self, RagError::Embedding { .. })
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
