//! Embedding provider trait and the document embedding pass.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::document::{Chunk, EmbeddedChunk};
use crate::error::{RagError, Result};

/// What an embedding will be used for.
///
/// Providers that distinguish between the two (Gemini does) tune the vector
/// accordingly; the two are not interchangeable, so each call site must pick
/// the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingTask {
    /// A chunk of source text that will be searched.
    Document,
    /// A user query that will be compared against documents.
    Query,
}

/// A provider that generates vector embeddings from text input.
///
/// Implementations must return [`RagError::Embedding`] for failures that
/// only concern the given text (e.g. it is too long) and
/// [`RagError::EmbeddingUnavailable`] when the service itself cannot be used,
/// so that batch callers can tell skippable items from fatal conditions.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{EmbeddingProvider, EmbeddingTask};
///
/// let provider = MyEmbeddingProvider::new();
/// let vector = provider.embed("hello world", EmbeddingTask::Query).await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>>;

    /// Identifier of the embedding model, for logging.
    fn model_id(&self) -> &str;
}

/// Embed each text in order, one request per item.
///
/// Per-item failures are logged and reported as `None` at the item's
/// position; the returned vector always has `texts.len()` entries.
///
/// # Errors
///
/// Returns the provider's error as soon as a failure is not item-specific
/// (see [`RagError::is_item_failure`]).
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[&str],
    task: EmbeddingTask,
) -> Result<Vec<Option<Vec<f32>>>> {
    let mut results = Vec::with_capacity(texts.len());
    for (position, text) in texts.iter().enumerate() {
        match provider.embed(text, task).await {
            Ok(embedding) if embedding.is_empty() => {
                warn!(model = provider.model_id(), position, "provider returned an empty embedding, skipping");
                results.push(None);
            }
            Ok(embedding) => results.push(Some(embedding)),
            Err(e) if e.is_item_failure() => {
                warn!(
                    model = provider.model_id(),
                    position,
                    text_len = text.chars().count(),
                    error = %e,
                    "could not embed text, skipping"
                );
                results.push(None);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}

/// Embed document chunks and pair each chunk with its vector.
///
/// Chunks whose embedding failed are dropped together with their text, so
/// every returned record holds a chunk and the vector computed for it. The
/// surviving chunks keep their original order and indices.
///
/// # Errors
///
/// Returns [`RagError::EmbeddingBatch`] if the service is unavailable, or if
/// none of a non-empty set of chunks could be embedded.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: Vec<Chunk>,
) -> Result<Vec<EmbeddedChunk>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let total = chunks.len();
    debug!(model = provider.model_id(), chunk_count = total, "embedding document chunks");

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let embeddings = embed_texts(provider, &texts, EmbeddingTask::Document).await.map_err(|e| {
        error!(model = provider.model_id(), error = %e, "embedding pass aborted");
        RagError::EmbeddingBatch(format!("embedding service failed: {e}"))
    })?;

    let embedded: Vec<EmbeddedChunk> = chunks
        .into_iter()
        .zip(embeddings)
        .filter_map(|(chunk, embedding)| embedding.map(|embedding| EmbeddedChunk { chunk, embedding }))
        .collect();

    if embedded.is_empty() {
        error!(model = provider.model_id(), chunk_count = total, "no chunk could be embedded");
        return Err(RagError::EmbeddingBatch(format!("none of the {total} chunks could be embedded")));
    }

    info!(
        model = provider.model_id(),
        chunk_count = total,
        embedded = embedded.len(),
        skipped = total - embedded.len(),
        "embedded document chunks"
    );
    Ok(embedded)
}
