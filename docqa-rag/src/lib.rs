//! # docqa-rag
//!
//! Retrieval core for the document assistant.
//!
//! The crate covers three steps:
//!
//! - **Chunking** ([`RecursiveChunker`]): split a document into overlapping,
//!   trimmed chunks along paragraph, line, word, and character boundaries.
//! - **Embedding** ([`EmbeddingProvider`], [`embed_chunks`]): turn chunks
//!   into [`EmbeddedChunk`] records, dropping chunks that cannot be embedded.
//! - **Retrieval** ([`Retriever`], [`rank`]): embed a query and select the
//!   most similar chunks by cosine similarity, with provenance for each hit.
//!
//! ## Feature flags
//!
//! | Feature  | Description                              | Default |
//! |----------|------------------------------------------|---------|
//! | `gemini` | [`gemini::GeminiEmbeddingProvider`]      | yes     |

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod retrieval;

pub use chunking::RecursiveChunker;
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, EmbeddedChunk};
pub use embedding::{EmbeddingProvider, EmbeddingTask, embed_chunks, embed_texts};
pub use error::{RagError, Result};
#[cfg(feature = "gemini")]
pub use gemini::GeminiEmbeddingProvider;
pub use retrieval::{
    PREVIEW_CHARS, RetrievalHit, RetrievalResult, Retriever, cosine_similarity, justification_for,
    rank,
};
