//! The Gemini provider against a local stand-in for the embedding API:
//! credential failures stop the pass, oversized chunks are skipped.
#![cfg(feature = "gemini")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use docqa_gemini::{Gemini, Model};
use docqa_rag::{Chunk, EmbeddingProvider, EmbeddingTask, GeminiEmbeddingProvider, RagError, embed_chunks};
use serde_json::{Value, json};
use url::Url;

async fn handle(
    State(requests): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    requests.fetch_add(1, Ordering::SeqCst);

    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "API_KEY_INVALID",
                    "domain": "googleapis.com"
                }]
            }
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    let text = body["content"]["parts"][0]["text"].as_str().unwrap_or_default();
    if text.contains("OVERSIZED") {
        let body = json!({
            "error": {"code": 400, "message": "input too long", "status": "INVALID_ARGUMENT"}
        });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }
    Json(json!({"embedding": {"values": [text.len() as f32, 1.0]}})).into_response()
}

async fn spawn_server() -> (Url, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
    let requests = Arc::new(AtomicUsize::new(0));
    let app = Router::new().fallback(handle).with_state(requests.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    let base = Url::parse(&format!("http://{addr}/v1beta/")).expect("base url");
    (base, requests, handle)
}

fn provider(api_key: &str, base: Url) -> GeminiEmbeddingProvider {
    let client = Gemini::with_model_and_base_url(api_key, Model::TextEmbedding004, base)
        .expect("client");
    GeminiEmbeddingProvider::from_client(client)
}

fn chunks(n: usize) -> Vec<Chunk> {
    (0..n).map(|index| Chunk { index, text: format!("chunk number {index}") }).collect()
}

#[tokio::test]
async fn invalid_key_stops_the_pass_after_one_request() {
    let (base, requests, handle) = spawn_server().await;
    let provider = provider("wrong-key", base);

    let err = provider.embed("hello", EmbeddingTask::Query).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable { .. }), "unexpected error: {err}");
    requests.store(0, Ordering::SeqCst);

    let err = embed_chunks(&provider, chunks(50)).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingBatch(_)));
    assert!(err.to_string().contains("embedding service failed"), "unexpected error: {err}");
    assert_eq!(requests.load(Ordering::SeqCst), 1);

    handle.abort();
}

#[tokio::test]
async fn oversized_chunk_is_skipped_and_the_rest_embedded() {
    let (base, requests, handle) = spawn_server().await;
    let provider = provider("test-key", base);

    let mut input = chunks(3);
    input[1].text = "OVERSIZED chunk".into();

    let embedded = embed_chunks(&provider, input).await.unwrap();
    let indices: Vec<usize> = embedded.iter().map(|e| e.chunk.index).collect();
    assert_eq!(indices, vec![0, 2]);
    assert_eq!(embedded[0].embedding, vec!["chunk number 0".len() as f32, 1.0]);
    assert_eq!(requests.load(Ordering::SeqCst), 3);

    handle.abort();
}
