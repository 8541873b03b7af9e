//! Recursive character chunking.
//!
//! [`RecursiveChunker`] splits text hierarchically: paragraphs, then lines,
//! then words, then single characters. Pieces are merged back greedily up to
//! `chunk_size` characters, and each emitted chunk seeds the next one with up
//! to `chunk_overlap` characters of trailing context.

use std::collections::VecDeque;

use crate::config::RagConfig;
use crate::document::Chunk;

/// Boundaries tried in order of preference. The empty separator splits into
/// individual characters and always applies.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text along semantic boundaries into overlapping chunks.
///
/// Lengths are measured in characters (Unicode scalar values), not bytes.
/// Every chunk is trimmed and no chunk is empty. When the text offers a
/// boundary inside the limit (and the character fallback always does), no
/// chunk is longer than `chunk_size`.
///
/// # Example
///
/// ```rust
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(20, 5);
/// let chunks = chunker.split("A cat sat on a mat.\n\nA dog ran in the park.");
/// assert_eq!(chunks[0], "A cat sat on a mat.");
/// assert!(chunks.iter().all(|c| c.chars().count() <= 20));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk (at least 1)
    /// * `chunk_overlap`: maximum number of characters repeated between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    /// Create a chunker using the sizes from a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into trimmed, non-empty chunk strings in document order.
    ///
    /// Returns an empty `Vec` for empty or whitespace-only input.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }

    /// Split text into indexed [`Chunk`]s.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.split(text).into_iter().enumerate().map(|(index, text)| Chunk { index, text }).collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) =
            match separators.iter().position(|s| s.is_empty() || text.contains(s)) {
                Some(i) => (separators[i], &separators[i + 1..]),
                None => ("", &separators[separators.len()..]),
            };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            // Oversized piece: flush what we have, then break it down further.
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks of at most `chunk_size`
    /// characters, carrying trailing pieces into the next chunk as overlap.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some((_, front_len)) = window.pop_front() else { break };
                    total -= front_len;
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_trimmed(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split text at a separator, attaching each separator to the start of the
/// piece that follows it. An empty separator yields single characters.
/// Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
