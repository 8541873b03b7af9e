//! Gemini embedding provider using the `docqa-gemini` crate.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use docqa_gemini::{EmbedBuilder, Gemini, Model, TaskType};

use crate::embedding::{EmbeddingProvider, EmbeddingTask};
use crate::error::{RagError, Result};

const PROVIDER: &str = "Gemini";

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// [`EmbeddingTask::Document`] maps to [`TaskType::RetrievalDocument`] and
/// [`EmbeddingTask::Query`] to [`TaskType::RetrievalQuery`]. Requests the
/// API rejects as malformed or too large are reported as per-item failures;
/// anything else (auth, quota, transport, server errors) makes the whole
/// service unavailable.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key", "models/text-embedding-004")?;
/// let embedding = provider.embed("hello world", EmbeddingTask::Query).await?;
/// ```
pub struct GeminiEmbeddingProvider {
    client: Gemini,
    model_id: String,
    output_dimensionality: Option<i32>,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider for the given API key and embedding model.
    pub fn new(api_key: impl AsRef<str>, model: impl Into<Model>) -> Result<Self> {
        let client = Gemini::with_model(api_key, model).map_err(|e| {
            RagError::ConfigError(format!("failed to create Gemini embedding client: {e}"))
        })?;
        Ok(Self::from_client(client))
    }

    /// Create a new provider from an existing [`Gemini`] client.
    ///
    /// Use this when you need full control over the client configuration
    /// (e.g. a custom base URL).
    pub fn from_client(client: Gemini) -> Self {
        let model_id = client.model().as_str().to_string();
        Self { client, model_id, output_dimensionality: None }
    }

    /// Set the output dimensionality (truncates the embedding vector).
    pub fn with_output_dimensionality(mut self, dims: i32) -> Self {
        self.output_dimensionality = Some(dims);
        self
    }

    fn embed_builder(&self, task: EmbeddingTask) -> EmbedBuilder {
        let task_type = match task {
            EmbeddingTask::Document => TaskType::RetrievalDocument,
            EmbeddingTask::Query => TaskType::RetrievalQuery,
        };
        let mut builder = self.client.embed_content().with_task_type(task_type);
        if let Some(dims) = self.output_dimensionality {
            builder = builder.with_output_dimensionality(dims);
        }
        builder
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, ?task, text_len = text.len(), "embedding single text");

        let response = self.embed_builder(task).with_text(text).execute().await.map_err(|e| {
            if e.is_client_side() {
                warn!(provider = PROVIDER, error = %e, "embedding request rejected");
                RagError::Embedding { provider: PROVIDER.into(), message: e.to_string() }
            } else {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                RagError::EmbeddingUnavailable { provider: PROVIDER.into(), message: e.to_string() }
            }
        })?;

        Ok(response.embedding.values)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
