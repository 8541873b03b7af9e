//! Data types for documents, chunks, and their embeddings.

use serde::{Deserialize, Serialize};

/// A source document: its display name and the full extracted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Name the document was uploaded under, usually the file name.
    pub name: String,
    /// The extracted text content.
    pub text: String,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }

    /// Length of the text in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// A bounded, trimmed segment of a [`Document`].
///
/// `index` is the chunk's position in document order as produced by the
/// chunker; it survives when neighbouring chunks are dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

/// A [`Chunk`] paired with its document embedding.
///
/// Keeping the two in one record means a chunk can never be separated from
/// the vector computed for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}
