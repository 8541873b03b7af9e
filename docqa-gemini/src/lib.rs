//! # docqa-gemini
//!
//! A small async client for the two Gemini REST endpoints a document
//! question-answering assistant needs:
//!
//! - `embedContent` with an explicit [`TaskType`] (document vs. query)
//! - `generateContent` for single, non-streaming completions
//!
//! ```no_run
//! use docqa_gemini::{Gemini, Model, TaskType};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = Gemini::with_model("API_KEY", Model::TextEmbedding004)?;
//! let vector = embedder
//!     .embed_content()
//!     .with_text("What does the report conclude?")
//!     .with_task_type(TaskType::RetrievalQuery)
//!     .execute()
//!     .await?
//!     .embedding
//!     .values;
//!
//! let writer = Gemini::new("API_KEY")?;
//! let answer = writer.generate_content().with_user_message("Say hi").execute().await?.text();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod embedding;
pub mod generation;

#[cfg(test)]
mod response_parsing_tests;

pub use client::{Error, Gemini, GeminiBuilder, Model};
pub use embedding::{
    ContentEmbedding, ContentEmbeddingResponse, EmbedBuilder, EmbedContentRequest, TaskType,
};
pub use generation::{
    BlockReason, Candidate, Content, ContentBuilder, FinishReason, GenerateContentRequest,
    GenerationConfig, GenerationResponse, Part, PromptFeedback, Role, UsageMetadata,
};
