//! Response parsing tests for the Gemini API.
//!
//! These validate that real-world JSON responses deserialize into our types,
//! covering missing fields, blocked prompts, thought parts, and unknown
//! enum values.

use crate::{BlockReason, FinishReason, GenerationResponse};
use serde_json::json;

// ── Basic text response ─────────────────────────────────────────────

#[test]
fn parse_simple_text_response() {
    let json = json!({
        "candidates": [{
            "content": {
                "parts": [{"text": "Hello, world!"}],
                "role": "model"
            },
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": 5,
            "candidatesTokenCount": 4,
            "totalTokenCount": 9
        },
        "modelVersion": "gemini-2.5-flash",
        "responseId": "abc123"
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.text(), "Hello, world!");
    assert_eq!(resp.candidates.len(), 1);
    assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::Stop));
    assert_eq!(resp.model_version.as_deref(), Some("gemini-2.5-flash"));
    assert_eq!(resp.response_id.as_deref(), Some("abc123"));

    let usage = resp.usage_metadata.as_ref().unwrap();
    assert_eq!(usage.prompt_token_count, Some(5));
    assert_eq!(usage.candidates_token_count, Some(4));
    assert_eq!(usage.total_token_count, Some(9));
}

// ── Multi-part text ─────────────────────────────────────────────────

#[test]
fn text_concatenates_parts_of_first_candidate() {
    let json = json!({
        "candidates": [
            {"content": {"parts": [{"text": "Q1: Why"}, {"text": "?\nQ2: How?"}], "role": "model"}},
            {"content": {"parts": [{"text": "ignored"}], "role": "model"}}
        ]
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.text(), "Q1: Why?\nQ2: How?");
}

#[test]
fn text_skips_thought_parts() {
    let json = json!({
        "candidates": [{
            "content": {
                "parts": [
                    {"text": "Let me think about the document...", "thought": true},
                    {"text": "The answer is 42."}
                ],
                "role": "model"
            }
        }]
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.text(), "The answer is 42.");
}

// ── Prompt blocked response ─────────────────────────────────────────

#[test]
fn parse_blocked_prompt_response() {
    let json = json!({
        "candidates": [],
        "promptFeedback": {
            "blockReason": "SAFETY",
            "safetyRatings": [
                {"category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "probability": "HIGH"}
            ]
        }
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert!(resp.candidates.is_empty());
    assert_eq!(resp.text(), "");
    let feedback = resp.prompt_feedback.as_ref().unwrap();
    assert_eq!(feedback.block_reason, Some(BlockReason::Safety));
}

// ── Empty / minimal responses ───────────────────────────────────────

#[test]
fn parse_empty_object() {
    let resp: GenerationResponse = serde_json::from_value(json!({})).unwrap();
    assert!(resp.candidates.is_empty());
    assert!(resp.usage_metadata.is_none());
    assert_eq!(resp.text(), "");
}

#[test]
fn parse_candidate_without_content() {
    let json = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::MaxTokens));
    assert_eq!(resp.text(), "");
}

// ── Unknown / future enum values degrade gracefully ─────────────────

#[test]
fn parse_unknown_finish_reason_string() {
    let json = json!({
        "candidates": [{
            "content": {"parts": [{"text": "ok"}], "role": "model"},
            "finishReason": "SOME_FUTURE_REASON"
        }]
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.candidates[0].finish_reason, Some(FinishReason::Unknown));
    assert_eq!(resp.text(), "ok");
}

#[test]
fn parse_ignores_non_text_parts() {
    let json = json!({
        "candidates": [{
            "content": {
                "parts": [
                    {"functionCall": {"name": "lookup", "args": {}}},
                    {"text": "done"}
                ],
                "role": "model"
            }
        }]
    });

    let resp: GenerationResponse = serde_json::from_value(json).unwrap();
    assert_eq!(resp.text(), "done");
}
