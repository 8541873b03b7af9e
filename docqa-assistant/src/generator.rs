//! Text generation backends.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use docqa_gemini::{Gemini, Model};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a generation call produced no text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// The request failed (transport, auth, quota, server error).
    #[error("request failed: {0}")]
    Request(String),

    /// The prompt was blocked by the service.
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// The service answered without any text.
    #[error("model returned no text")]
    Empty,
}

/// A model that turns a prompt into a single completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GeneratorError>;

    /// Identifier of the underlying model, for logging.
    fn model_id(&self) -> &str;
}

/// [`TextGenerator`] backed by the Gemini `generateContent` API.
pub struct GeminiGenerator {
    client: Gemini,
    model_id: String,
    temperature: Option<f32>,
}

impl GeminiGenerator {
    /// Create a generator for the given API key and model.
    pub fn new(api_key: impl AsRef<str>, model: impl Into<Model>) -> Result<Self, GeneratorError> {
        let client = Gemini::with_model(api_key, model)
            .map_err(|e| GeneratorError::Request(format!("failed to create Gemini client: {e}")))?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Gemini) -> Self {
        let model_id = client.model().as_str().to_string();
        Self { client, model_id, temperature: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GeneratorError> {
        debug!(model = %self.model_id, prompt_len = prompt.len(), "generating content");

        let mut builder = self.client.generate_content().with_user_message(prompt);
        if let Some(temperature) = self.temperature {
            builder = builder.with_temperature(temperature);
        }
        let response = builder.execute().await.map_err(|e| GeneratorError::Request(e.to_string()))?;

        let text = response.text();
        if !text.trim().is_empty() {
            return Ok(text);
        }
        match response.prompt_feedback.and_then(|feedback| feedback.block_reason) {
            Some(reason) => {
                warn!(model = %self.model_id, ?reason, "prompt blocked");
                Err(GeneratorError::Blocked(format!("{reason:?}")))
            }
            None => Err(GeneratorError::Empty),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Scripted [`TextGenerator`] for tests and offline runs.
///
/// Replies are consumed in order; once the script runs out every call fails.
/// All prompts are recorded.
#[derive(Debug, Default)]
pub struct MockGenerator {
    replies: Mutex<VecDeque<std::result::Result<String, GeneratorError>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, error: GeneratorError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, reply: std::result::Result<String, GeneratorError>) {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).push_back(reply);
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GeneratorError> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).push(prompt.to_string());
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(GeneratorError::Request("no scripted reply left".into())))
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}
