use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::client::{Error, GeminiClient};
use crate::generation::{Content, Part};

/// The intended downstream use of an embedding.
///
/// Document and query embeddings live in the same space but are tuned
/// differently, so ingestion and search must request the matching type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
    SemanticSimilarity,
    Classification,
    Clustering,
    QuestionAnswering,
    FactVerification,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            TaskType::RetrievalQuery => "RETRIEVAL_QUERY",
            TaskType::SemanticSimilarity => "SEMANTIC_SIMILARITY",
            TaskType::Classification => "CLASSIFICATION",
            TaskType::Clustering => "CLUSTERING",
            TaskType::QuestionAnswering => "QUESTION_ANSWERING",
            TaskType::FactVerification => "FACT_VERIFICATION",
        }
    }
}

/// Request body for `models/{model}:embedContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedContentRequest {
    pub model: String,
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEmbeddingResponse {
    pub embedding: ContentEmbedding,
}

/// Builder for a single embedding request.
pub struct EmbedBuilder {
    client: Arc<GeminiClient>,
    text: Option<String>,
    task_type: Option<TaskType>,
    output_dimensionality: Option<i32>,
}

impl EmbedBuilder {
    pub(crate) fn new(client: Arc<GeminiClient>) -> Self {
        Self { client, text: None, task_type: None, output_dimensionality: None }
    }

    /// Set the text to embed.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the task type the embedding is optimised for.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Truncate the returned vector to `dims` values.
    pub fn with_output_dimensionality(mut self, dims: i32) -> Self {
        self.output_dimensionality = Some(dims);
        self
    }

    pub(crate) fn build_request(self) -> (Arc<GeminiClient>, EmbedContentRequest) {
        let request = EmbedContentRequest {
            model: self.client.model.to_string(),
            content: Content {
                parts: vec![Part::text(self.text.unwrap_or_default())],
                role: None,
            },
            task_type: self.task_type,
            output_dimensionality: self.output_dimensionality,
        };
        (self.client, request)
    }

    /// Send the request.
    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<ContentEmbeddingResponse, Error> {
        let (client, request) = self.build_request();
        client.embed_content(request).await
    }
}
