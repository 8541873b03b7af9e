//! # docqa-assistant
//!
//! Document question answering on top of [`docqa_rag`].
//!
//! An [`Assistant`] owns the session context for one user: upload a PDF or
//! text file, then ask free-form questions answered only from the document,
//! or generate challenge questions and have your answers graded.
//!
//! ```rust,ignore
//! use docqa_assistant::{Assistant, AssistantConfig};
//!
//! let config = AssistantConfig::from_env()?;
//! let mut assistant = Assistant::from_config(&config)?;
//! let session = assistant.upload("paper.pdf", std::fs::read("paper.pdf")?).await?;
//! println!("{}", session.summary);
//!
//! let answer = assistant.ask("What dataset was used?").await?;
//! println!("{}\n{}", answer.text, answer.justification);
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod orchestrator;
pub mod session;

pub use config::{AssistantConfig, AssistantConfigBuilder};
pub use error::{AssistantError, Operation, Result};
pub use extract::{FileKind, extract_text};
pub use generator::{GeminiGenerator, GeneratorError, MockGenerator, TextGenerator};
pub use orchestrator::{
    Answer, Evaluation, NOT_IN_CONTEXT, Orchestrator, Verdict, parse_questions, truncate_words,
};
pub use session::{Assistant, ChallengeItem, ChatTurn, DocumentSession};
