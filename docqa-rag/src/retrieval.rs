//! Cosine-similarity retrieval over embedded chunks.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::document::{Chunk, EmbeddedChunk};
use crate::embedding::{EmbeddingProvider, EmbeddingTask};
use crate::error::{RagError, Result};

/// Number of characters of a chunk quoted in its justification.
pub const PREVIEW_CHARS: usize = 150;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude, the dimensions differ,
/// or the result is not a finite number.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

/// Human-readable provenance line for a retrieved chunk.
pub fn justification_for(text: &str) -> String {
    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        format!("From document (snippet: \"{preview}...\")")
    } else {
        format!("From document (snippet: \"{preview}\")")
    }
}

/// A single retrieved chunk with its score and provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    pub chunk: Chunk,
    pub score: f32,
    /// Short provenance line quoting the start of the chunk.
    pub justification: String,
    /// The full, untruncated chunk text.
    pub snippet: String,
}

/// Ranked retrieval output, best match first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievalHit>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn chunks(&self) -> Vec<&Chunk> {
        self.hits.iter().map(|hit| &hit.chunk).collect()
    }

    pub fn justifications(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.justification.as_str()).collect()
    }

    pub fn snippets(&self) -> Vec<&str> {
        self.hits.iter().map(|hit| hit.snippet.as_str()).collect()
    }

    /// Chunk texts in ranked order, separated by a blank line. This is the
    /// context handed to the language model.
    pub fn context(&self) -> String {
        self.hits.iter().map(|hit| hit.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }
}

/// Rank `entries` against a query vector and select the best `top_k`.
///
/// Entries are ordered by descending cosine similarity; equal scores keep
/// their position in `entries` (lower position first). While walking the
/// ranked list, an entry whose chunk text is identical to an already
/// selected one is skipped, so the result never holds the same text twice.
pub fn rank(query: &[f32], entries: &[EmbeddedChunk], top_k: usize) -> RetrievalResult {
    if top_k == 0 || entries.is_empty() {
        return RetrievalResult::default();
    }

    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(position, entry)| (position, cosine_similarity(query, &entry.embedding)))
        .collect();
    scored.sort_by(|(pa, sa), (pb, sb)| {
        sb.partial_cmp(sa).unwrap_or(Ordering::Equal).then_with(|| pa.cmp(pb))
    });

    let mut seen: HashSet<&str> = HashSet::new();
    let mut hits = Vec::with_capacity(top_k.min(entries.len()));
    for (position, score) in scored {
        if hits.len() == top_k {
            break;
        }
        let chunk = &entries[position].chunk;
        if !seen.insert(chunk.text.as_str()) {
            continue;
        }
        hits.push(RetrievalHit {
            chunk: chunk.clone(),
            score,
            justification: justification_for(&chunk.text),
            snippet: chunk.text.clone(),
        });
    }

    RetrievalResult { hits }
}

/// Embeds queries and ranks a document's chunks against them.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Retrieve up to `top_k` chunks relevant to `query`.
    ///
    /// Returns an empty result without calling the provider when there is
    /// nothing to search.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the query cannot be embedded.
    pub async fn retrieve(
        &self,
        query: &str,
        entries: &[EmbeddedChunk],
        top_k: usize,
    ) -> Result<RetrievalResult> {
        if entries.is_empty() {
            debug!("no embedded chunks to search");
            return Ok(RetrievalResult::default());
        }

        let query_embedding = self.provider.embed(query, EmbeddingTask::Query).await?;
        if query_embedding.is_empty() {
            warn!(model = self.provider.model_id(), "query embedding is empty");
            return Err(RagError::Embedding {
                provider: self.provider.model_id().to_string(),
                message: "empty query embedding".into(),
            });
        }

        let result = rank(&query_embedding, entries, top_k);
        debug!(
            model = self.provider.model_id(),
            candidates = entries.len(),
            top_k,
            returned = result.len(),
            "retrieved chunks"
        );
        Ok(result)
    }
}
