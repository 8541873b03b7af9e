//! Error types for the `docqa-assistant` crate.

use std::fmt;

use docqa_rag::RagError;
use thiserror::Error;

/// The model-backed operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Summarize,
    Answer,
    GenerateQuestions,
    Evaluate,
}

impl Operation {
    /// Fixed text shown to the user when this operation fails.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            Operation::Summarize => "Could not generate summary.",
            Operation::Answer => "Error generating answer.",
            Operation::GenerateQuestions => "Failed to generate questions.",
            Operation::Evaluate => "Error during evaluation.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Summarize => "summarize",
            Operation::Answer => "answer",
            Operation::GenerateQuestions => "generate_questions",
            Operation::Evaluate => "evaluate",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the assistant.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Missing credentials or an invalid setting. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The uploaded file could not be turned into text.
    #[error("Could not extract text from '{name}': {message}")]
    Extraction { name: String, message: String },

    /// The document's chunks could not be embedded; no session was created.
    #[error("Could not process the document: {0}")]
    EmbeddingBatch(String),

    /// A query could not be embedded during an operation.
    #[error("Embedding failed during {operation}: {source}")]
    Embedding {
        operation: Operation,
        #[source]
        source: RagError,
    },

    /// The generative model call failed or returned nothing usable.
    #[error("Generation failed during {operation}: {message}")]
    Generation { operation: Operation, message: String },

    #[error("No document has been uploaded")]
    NoDocument,

    #[error("Question must not be empty")]
    EmptyQuestion,

    #[error("Answer must not be empty")]
    EmptyAnswer,

    #[error(transparent)]
    Rag(#[from] RagError),
}

impl AssistantError {
    /// Human-readable message for the interactive surface.
    ///
    /// Failures of a model-backed operation map to that operation's fixed
    /// fallback text; the detailed error is meant for the log.
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::Generation { operation, .. }
            | AssistantError::Embedding { operation, .. } => {
                operation.fallback_message().to_string()
            }
            AssistantError::NoDocument => "Please upload a document first.".to_string(),
            AssistantError::EmptyQuestion => "Please enter a question.".to_string(),
            AssistantError::EmptyAnswer => "Please enter an answer.".to_string(),
            AssistantError::EmbeddingBatch(_) => {
                format!("{self}. Please try uploading the document again.")
            }
            other => other.to_string(),
        }
    }

    /// Whether the error should stop the program rather than one interaction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AssistantError::Configuration(_))
    }
}

/// A convenience result type for assistant operations.
pub type Result<T> = std::result::Result<T, AssistantError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_failures_use_fixed_fallbacks() {
        let cases = [
            (Operation::Summarize, "Could not generate summary."),
            (Operation::Answer, "Error generating answer."),
            (Operation::GenerateQuestions, "Failed to generate questions."),
            (Operation::Evaluate, "Error during evaluation."),
        ];
        for (operation, expected) in cases {
            let err = AssistantError::Generation { operation, message: "503".into() };
            assert_eq!(err.user_message(), expected);
        }
    }

    #[test]
    fn query_embedding_failure_uses_operation_fallback() {
        let err = AssistantError::Embedding {
            operation: Operation::Evaluate,
            source: RagError::EmbeddingUnavailable {
                provider: "Gemini".into(),
                message: "quota".into(),
            },
        };
        assert_eq!(err.user_message(), "Error during evaluation.");
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn only_configuration_is_fatal() {
        assert!(AssistantError::Configuration("missing key".into()).is_fatal());
        assert!(!AssistantError::NoDocument.is_fatal());
        assert!(!AssistantError::EmbeddingBatch("quota".into()).is_fatal());
    }

    #[test]
    fn batch_failure_prompts_retry() {
        let msg = AssistantError::EmbeddingBatch("none of the 3 chunks could be embedded".into())
            .user_message();
        assert!(msg.ends_with("Please try uploading the document again."));
    }
}
