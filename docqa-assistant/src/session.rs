//! The per-user session: the uploaded document, its embedded chunks, and
//! the interaction history built on top of them.

use std::sync::Arc;

use docqa_rag::{
    Document, EmbeddedChunk, EmbeddingProvider, GeminiEmbeddingProvider, RagError, RecursiveChunker,
    Retriever, embed_chunks,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AssistantConfig;
use crate::error::{AssistantError, Result};
use crate::extract::extract_text;
use crate::generator::{GeminiGenerator, TextGenerator};
use crate::orchestrator::{Answer, Evaluation, Orchestrator};

/// One question asked in free-form mode and the answer it received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: Answer,
}

/// A generated challenge question and, once submitted, the user's attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeItem {
    pub question: String,
    pub user_answer: Option<String>,
    pub evaluation: Option<Evaluation>,
}

/// Everything derived from one uploaded document.
///
/// A session is built completely before it becomes visible, and is dropped
/// as a whole when another upload starts. Chunks and their vectors only
/// exist inside [`EmbeddedChunk`] records, so they cannot drift apart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSession {
    pub document: Document,
    pub chunks: Vec<EmbeddedChunk>,
    /// Number of chunks produced before failed embeddings were dropped.
    pub chunk_count: usize,
    /// Model summary, or the summary fallback text if summarization failed.
    pub summary: String,
    pub history: Vec<ChatTurn>,
    pub challenge: Vec<ChallengeItem>,
}

impl DocumentSession {
    /// Chunks dropped because they could not be embedded.
    pub fn skipped_chunks(&self) -> usize {
        self.chunk_count - self.chunks.len()
    }
}

/// Owns the session context and runs every user-facing operation on it.
pub struct Assistant {
    orchestrator: Orchestrator,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: RecursiveChunker,
    question_count: usize,
    session: Option<DocumentSession>,
}

impl Assistant {
    /// Build an assistant talking to Gemini for both generation and
    /// embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Configuration`] if a client cannot be created.
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let generator = GeminiGenerator::new(&config.api_key, config.generation_model.as_str())
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;
        let embedder = GeminiEmbeddingProvider::new(&config.api_key, config.embedding_model.as_str())
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;
        Ok(Self::with_backends(Arc::new(generator), Arc::new(embedder), config))
    }

    /// Build an assistant on arbitrary model backends.
    pub fn with_backends(
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &AssistantConfig,
    ) -> Self {
        let retriever = Retriever::new(embedder.clone());
        Self {
            orchestrator: Orchestrator::from_config(generator, retriever, config),
            embedder,
            chunker: RecursiveChunker::from_config(&config.rag),
            question_count: config.question_count,
            session: None,
        }
    }

    /// The active session, if a document has been uploaded successfully.
    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    /// Default number of challenge questions.
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// Drop the active session.
    pub fn clear(&mut self) {
        self.session = None;
    }

    /// Process an uploaded file and make it the active document.
    ///
    /// The previous session is discarded first, so a failed upload leaves
    /// no document loaded. A failed summary does not fail the upload; the
    /// session then carries the summary fallback text.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Extraction`] if no text can be read and
    /// [`AssistantError::EmbeddingBatch`] if the chunks cannot be embedded.
    pub async fn upload(&mut self, name: &str, bytes: Vec<u8>) -> Result<&DocumentSession> {
        self.session = None;

        let text = extract_text(name, bytes).await?;
        let document = Document::new(name, text);

        let chunks = self.chunker.chunk(&document.text);
        let chunk_count = chunks.len();
        if chunk_count == 0 {
            return Err(AssistantError::Extraction {
                name: name.to_string(),
                message: "document produced no text chunks".into(),
            });
        }

        let embedded = embed_chunks(self.embedder.as_ref(), chunks).await.map_err(|e| match e {
            RagError::EmbeddingBatch(message) => AssistantError::EmbeddingBatch(message),
            other => AssistantError::Rag(other),
        })?;

        let summary = match self.orchestrator.summarize(&document.text).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(name, error = %e, "summary unavailable, keeping document");
                e.user_message()
            }
        };

        info!(
            name,
            chars = document.char_count(),
            chunk_count,
            embedded = embedded.len(),
            "document ready"
        );
        Ok(self.session.insert(DocumentSession {
            document,
            chunks: embedded,
            chunk_count,
            summary,
            history: Vec::new(),
            challenge: Vec::new(),
        }))
    }

    /// Answer a free-form question about the active document.
    pub async fn ask(&mut self, question: &str) -> Result<Answer> {
        let session = self.session.as_mut().ok_or(AssistantError::NoDocument)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        let answer = self.orchestrator.answer(question, &session.chunks).await?;
        session.history.push(ChatTurn { question: question.to_string(), answer: answer.clone() });
        Ok(answer)
    }

    /// Generate a fresh set of challenge questions, replacing the previous
    /// set. `None` uses the configured question count.
    pub async fn generate_challenge(&mut self, n: Option<usize>) -> Result<Vec<String>> {
        let session = self.session.as_mut().ok_or(AssistantError::NoDocument)?;
        let n = n.unwrap_or(self.question_count);

        let questions = self.orchestrator.generate_questions(&session.document.text, n).await?;
        session.challenge = questions
            .iter()
            .map(|question| ChallengeItem {
                question: question.clone(),
                user_answer: None,
                evaluation: None,
            })
            .collect();
        Ok(questions)
    }

    /// Evaluate the user's answer to a challenge question.
    ///
    /// The attempt is recorded on the matching challenge item, if any.
    pub async fn submit_challenge_answer(
        &mut self,
        question: &str,
        user_answer: &str,
    ) -> Result<Evaluation> {
        let session = self.session.as_mut().ok_or(AssistantError::NoDocument)?;
        if question.trim().is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }
        let user_answer = user_answer.trim();
        if user_answer.is_empty() {
            return Err(AssistantError::EmptyAnswer);
        }

        let evaluation =
            self.orchestrator.evaluate(question, user_answer, &session.chunks).await?;
        if let Some(item) = session.challenge.iter_mut().find(|item| item.question == question) {
            item.user_answer = Some(user_answer.to_string());
            item.evaluation = Some(evaluation.clone());
        }
        Ok(evaluation)
    }
}
