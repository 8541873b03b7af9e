//! Assistant configuration.

use std::fmt;
use std::str::FromStr;

use docqa_rag::RagConfig;

use crate::error::{AssistantError, Result};

pub const DEFAULT_GENERATION_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_QUESTION_COUNT: usize = 3;
pub const SUMMARY_INPUT_CHARS: usize = 10_000;
pub const QUESTION_INPUT_CHARS: usize = 15_000;
pub const SUMMARY_WORD_LIMIT: usize = 150;

/// Settings for the assistant and its model clients.
///
/// `Debug` output never includes the API key.
#[derive(Clone, PartialEq)]
pub struct AssistantConfig {
    pub api_key: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Chunking and retrieval settings. `rag.top_k` is used for both
    /// answering and evaluation.
    pub rag: RagConfig,
    /// Number of challenge questions generated when none is requested.
    pub question_count: usize,
    /// Characters of the document sent for summarization.
    pub summary_input_chars: usize,
    /// Characters of the document sent for question generation.
    pub question_input_chars: usize,
    /// Maximum number of words kept from a summary.
    pub summary_word_limit: usize,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"<redacted>")
            .field("generation_model", &self.generation_model)
            .field("embedding_model", &self.embedding_model)
            .field("rag", &self.rag)
            .field("question_count", &self.question_count)
            .field("summary_input_chars", &self.summary_input_chars)
            .field("question_input_chars", &self.question_input_chars)
            .field("summary_word_limit", &self.summary_word_limit)
            .finish()
    }
}

impl AssistantConfig {
    /// Create a new builder for the given API key.
    pub fn builder(api_key: impl Into<String>) -> AssistantConfigBuilder {
        AssistantConfigBuilder {
            config: AssistantConfig {
                api_key: api_key.into(),
                generation_model: DEFAULT_GENERATION_MODEL.to_string(),
                embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
                rag: RagConfig::default(),
                question_count: DEFAULT_QUESTION_COUNT,
                summary_input_chars: SUMMARY_INPUT_CHARS,
                question_input_chars: QUESTION_INPUT_CHARS,
                summary_word_limit: SUMMARY_WORD_LIMIT,
            },
        }
    }

    /// Turn this configuration back into a builder, e.g. to apply
    /// command-line overrides on top of the environment.
    pub fn into_builder(self) -> AssistantConfigBuilder {
        AssistantConfigBuilder { config: self }
    }

    /// Load configuration from the process environment.
    ///
    /// Reads `GEMINI_API_KEY` (or `GOOGLE_API_KEY`), `DOCQA_GENERATION_MODEL`,
    /// `DOCQA_EMBEDDING_MODEL`, `DOCQA_CHUNK_SIZE`, `DOCQA_CHUNK_OVERLAP`,
    /// `DOCQA_TOP_K`, and `DOCQA_QUESTION_COUNT`.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Configuration`] if no API key is set or a
    /// numeric setting does not parse or validate.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("GOOGLE_API_KEY")).ok_or_else(
            || {
                AssistantError::Configuration(
                    "GEMINI_API_KEY is not set; add it to the environment or a .env file".into(),
                )
            },
        )?;

        let mut builder = Self::builder(api_key.trim());
        if let Some(model) = non_empty("DOCQA_GENERATION_MODEL") {
            builder = builder.generation_model(model);
        }
        if let Some(model) = non_empty("DOCQA_EMBEDDING_MODEL") {
            builder = builder.embedding_model(model);
        }
        if let Some(size) = parse_var(&non_empty, "DOCQA_CHUNK_SIZE")? {
            builder = builder.chunk_size(size);
        }
        if let Some(overlap) = parse_var(&non_empty, "DOCQA_CHUNK_OVERLAP")? {
            builder = builder.chunk_overlap(overlap);
        }
        if let Some(top_k) = parse_var(&non_empty, "DOCQA_TOP_K")? {
            builder = builder.top_k(top_k);
        }
        if let Some(count) = parse_var(&non_empty, "DOCQA_QUESTION_COUNT")? {
            builder = builder.question_count(count);
        }
        builder.build()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                AssistantError::Configuration(format!("{key} has invalid value '{raw}': {e}"))
            })
        })
        .transpose()
}

/// Builder for constructing a validated [`AssistantConfig`].
#[derive(Debug, Clone)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.rag.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.rag.chunk_overlap = overlap;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.rag.top_k = k;
        self
    }

    pub fn question_count(mut self, count: usize) -> Self {
        self.config.question_count = count;
        self
    }

    pub fn summary_input_chars(mut self, chars: usize) -> Self {
        self.config.summary_input_chars = chars;
        self
    }

    pub fn question_input_chars(mut self, chars: usize) -> Self {
        self.config.question_input_chars = chars;
        self
    }

    pub fn summary_word_limit(mut self, words: usize) -> Self {
        self.config.summary_word_limit = words;
        self
    }

    /// Build the [`AssistantConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Configuration`] if the API key is empty,
    /// `question_count` is zero, or the retrieval settings are invalid.
    pub fn build(self) -> Result<AssistantConfig> {
        let config = self.config;
        if config.api_key.trim().is_empty() {
            return Err(AssistantError::Configuration("API key must not be empty".into()));
        }
        if config.question_count == 0 {
            return Err(AssistantError::Configuration(
                "question_count must be greater than 0".into(),
            ));
        }
        let rag = RagConfig::builder()
            .chunk_size(config.rag.chunk_size)
            .chunk_overlap(config.rag.chunk_overlap)
            .top_k(config.rag.top_k)
            .build()
            .map_err(|e| AssistantError::Configuration(e.to_string()))?;
        Ok(AssistantConfig { rag, ..config })
    }
}
