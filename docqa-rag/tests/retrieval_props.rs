//! Property and integration tests for top-k retrieval.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docqa_rag::{
    Chunk, EmbeddedChunk, EmbeddingProvider, EmbeddingTask, RagError, RecursiveChunker, Retriever,
    embed_chunks, rank,
};
use proptest::prelude::*;

const DIM: usize = 8;

/// Deterministic bag-of-bytes embedding: identical texts get identical
/// vectors. Counts calls, and query calls separately.
#[derive(Default)]
struct HashingProvider {
    calls: AtomicUsize,
    query_calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> docqa_rag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if task == EmbeddingTask::Query {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
        }
        let mut vector = vec![0.0f32; DIM];
        for byte in text.bytes() {
            vector[(byte as usize) % DIM] += 1.0;
        }
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        "hashing"
    }
}

struct FailingProvider;

#[async_trait]
impl EmbeddingProvider for FailingProvider {
    async fn embed(&self, _text: &str, _task: EmbeddingTask) -> docqa_rag::Result<Vec<f32>> {
        Err(RagError::EmbeddingUnavailable { provider: "failing".into(), message: "quota".into() })
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, DIM)
}

/// Entries drawn from a small vocabulary so duplicate texts are common.
fn arb_entries() -> impl Strategy<Value = Vec<EmbeddedChunk>> {
    proptest::collection::vec((0usize..6, arb_embedding()), 0..20).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(index, (word, embedding))| EmbeddedChunk {
                chunk: Chunk { index, text: format!("chunk text {word}") },
                embedding,
            })
            .collect()
    })
}

/// **Property: top-k bound**
/// *For any* entries and query, `rank` returns at most `top_k` chunks, all
/// taken from the input, with no two sharing the same text, ordered by
/// non-increasing score.
mod prop_rank_top_k {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn bounded_distinct_members(
            entries in arb_entries(),
            query in arb_embedding(),
            top_k in 0usize..25,
        ) {
            let result = rank(&query, &entries, top_k);
            prop_assert!(result.len() <= top_k);

            let distinct: HashSet<&str> = entries.iter().map(|e| e.chunk.text.as_str()).collect();
            prop_assert_eq!(result.len(), top_k.min(distinct.len()));

            let mut seen = HashSet::new();
            for hit in &result.hits {
                prop_assert!(entries.iter().any(|e| e.chunk == hit.chunk));
                prop_assert!(seen.insert(hit.chunk.text.clone()), "duplicate text {:?}", hit.chunk.text);
                prop_assert_eq!(&hit.snippet, &hit.chunk.text);
            }

            for pair in result.hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }

        #[test]
        fn ranking_is_deterministic(
            entries in arb_entries(),
            query in arb_embedding(),
            top_k in 1usize..10,
        ) {
            prop_assert_eq!(rank(&query, &entries, top_k), rank(&query, &entries, top_k));
        }
    }
}

#[test]
fn identical_vector_outranks_orthogonal_one() {
    let entries = vec![
        EmbeddedChunk { chunk: Chunk { index: 0, text: "orthogonal".into() }, embedding: vec![0.0, 1.0] },
        EmbeddedChunk { chunk: Chunk { index: 1, text: "identical".into() }, embedding: vec![1.0, 0.0] },
    ];
    let result = rank(&[1.0, 0.0], &entries, 2);
    assert_eq!(result.hits[0].chunk.text, "identical");
    assert!((result.hits[0].score - 1.0).abs() < 1e-6);
    assert_eq!(result.hits[1].chunk.text, "orthogonal");
    assert_eq!(result.hits[1].score, 0.0);
}

#[tokio::test]
async fn empty_state_short_circuits_without_embedding() {
    let provider = Arc::new(HashingProvider::default());
    let retriever = Retriever::new(provider.clone());

    let result = retriever.retrieve("anything", &[], 5).await.unwrap();
    assert!(result.is_empty());
    assert!(result.justifications().is_empty());
    assert!(result.snippets().is_empty());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chunk_embed_retrieve_end_to_end() {
    let provider = Arc::new(HashingProvider::default());
    let text = "zzzz zzzz zzzz.\n\naaaa bbbb cccc.\n\nxxxx yyyy wwww.";
    let chunks = RecursiveChunker::new(16, 0).chunk(text);
    assert_eq!(chunks.len(), 3);

    let entries = embed_chunks(provider.as_ref(), chunks).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(provider.query_calls.load(Ordering::SeqCst), 0);

    let retriever = Retriever::new(provider.clone());
    let result = retriever.retrieve("aaaa bbbb cccc.", &entries, 1).await.unwrap();
    assert_eq!(provider.query_calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.len(), 1);
    assert_eq!(result.hits[0].chunk.text, "aaaa bbbb cccc.");
    assert_eq!(result.justifications(), vec!["From document (snippet: \"aaaa bbbb cccc.\")"]);
}

#[tokio::test]
async fn query_embedding_failure_is_reported() {
    let retriever = Retriever::new(Arc::new(FailingProvider));
    let entries = vec![EmbeddedChunk {
        chunk: Chunk { index: 0, text: "text".into() },
        embedding: vec![1.0],
    }];
    let err = retriever.retrieve("query", &entries, 3).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable { .. }));
}
