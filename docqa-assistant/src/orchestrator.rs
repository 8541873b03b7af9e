//! Prompting the generative model: summaries, grounded answers, challenge
//! questions, and answer evaluation.

use std::fmt;
use std::sync::{Arc, LazyLock};

use docqa_rag::{EmbeddedChunk, RetrievalResult, Retriever};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::config::{AssistantConfig, QUESTION_INPUT_CHARS, SUMMARY_INPUT_CHARS, SUMMARY_WORD_LIMIT};
use crate::error::{AssistantError, Operation, Result};
use crate::generator::TextGenerator;

/// Sentence the model is told to use when the context lacks the answer.
pub const NOT_IN_CONTEXT: &str =
    "The information is not directly available in the provided document context.";

const NO_RELEVANT_ANSWER: &str = "Could not find relevant information in the document.";
const NO_RELEVANT_JUSTIFICATION: &str = "No relevant chunks found.";
const NO_RELEVANT_EVALUATION: &str = "Could not find relevant document context for evaluation.";
const NO_CONTEXT: &str = "N/A";

static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Q(?:\d+|\[\d+\])\s*:\s*(.*)$").expect("question line pattern is valid")
});

/// A grounded answer with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// Model output, verbatim.
    pub text: String,
    /// `"Based on: "` followed by the retrieved chunks' justifications.
    pub justification: String,
    /// Full text of every retrieved chunk, best match first.
    pub snippets: Vec<String>,
}

/// Three-way grade extracted from an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    PartiallyCorrect,
    Incorrect,
    /// The model did not state a recognisable grade.
    Unknown,
}

impl Verdict {
    /// Find the grade in an evaluation response.
    ///
    /// Looks for an `Evaluation:` line first and falls back to the first line
    /// mentioning a grade.
    pub fn parse(text: &str) -> Self {
        let lines: Vec<String> = text
            .lines()
            .map(|line| line.trim().trim_matches(|c| c == '*' || c == '#').trim().to_lowercase())
            .filter(|line| !line.is_empty())
            .collect();

        let labelled = lines.iter().find_map(|line| {
            line.strip_prefix("evaluation")
                .and_then(|rest| rest.trim_start_matches('*').trim_start().strip_prefix(':'))
                .map(Self::classify)
        });
        match labelled {
            Some(verdict) if verdict != Verdict::Unknown => verdict,
            _ => lines
                .iter()
                .map(|line| Self::classify(line))
                .find(|verdict| *verdict != Verdict::Unknown)
                .unwrap_or(Verdict::Unknown),
        }
    }

    fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("partially correct") {
            Verdict::PartiallyCorrect
        } else if text.contains("incorrect") || text.contains("not correct") {
            Verdict::Incorrect
        } else if text.contains("correct") {
            Verdict::Correct
        } else {
            Verdict::Unknown
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Correct => "Correct",
            Verdict::PartiallyCorrect => "Partially Correct",
            Verdict::Incorrect => "Incorrect",
            Verdict::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// The model's assessment of a user's answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    /// Model output, verbatim.
    pub text: String,
    pub verdict: Verdict,
    /// The document context the evaluation was based on.
    pub context: String,
}

/// The longest prefix of `text` with at most `max_chars` characters.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Keep at most `limit` words, appending `...` when anything was cut.
///
/// Text within the limit is returned unchanged.
pub fn truncate_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return text.to_string();
    }
    format!("{}...", words[..limit].join(" "))
}

/// Extract up to `n` questions from lines of the form `Q1: text` or
/// `Q[1]: text`.
///
/// Other lines, and labelled lines without question text, are skipped.
pub fn parse_questions(text: &str, n: usize) -> Vec<String> {
    text.lines()
        .filter_map(|line| QUESTION_LINE.captures(line.trim()))
        .filter_map(|captures| captures.get(1))
        .map(|question| question.as_str().trim())
        .filter(|question| !question.is_empty())
        .take(n)
        .map(str::to_string)
        .collect()
}

fn summary_prompt(text: &str, word_limit: usize) -> String {
    format!(
        "Summarize the following document concisely in less than {word_limit} words. \
         Focus on the main points and overall topic:\n\n{text}..."
    )
}

fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Answer the following question ONLY based on the provided \
         context from the document.\n\
         Do not make up any information. If the answer cannot be found in the context, state \
         \"{NOT_IN_CONTEXT}\"\n\n\
         Question: {question}\n\n\
         Context from document:\n{context}\n\n\
         Your Answer:"
    )
}

fn questions_prompt(text: &str, n: usize) -> String {
    format!(
        "Based on the following document, generate {n} unique, logic-based or \
         comprehension-focused questions.\n\
         These questions should require understanding and reasoning beyond simple fact retrieval.\n\
         Each question should be answerable from the document.\n\
         Format each question on its own line as \"Q[Number]: [Question Text]\".\n\n\
         Document Context:\n{text}\n\n\
         Questions:"
    )
}

fn evaluation_prompt(question: &str, user_answer: &str, context: &str) -> String {
    format!(
        "You are evaluating a user's answer to a question about a document.\n\
         Determine whether the answer is correct, partially correct, or incorrect, and justify \
         the decision by referencing the document context.\n\n\
         Question: {question}\n\
         User's Answer: {user_answer}\n\n\
         Document Context:\n{context}\n\n\
         Evaluate the user's answer based ONLY on the document context.\n\
         State clearly if the answer is Correct, Partially Correct, or Incorrect.\n\
         Then give a brief justification citing information from the document.\n\n\
         Response format:\n\
         Evaluation: Correct/Partially Correct/Incorrect\n\
         Justification: [Explanation based on document context]"
    )
}

/// Runs the model-backed operations over a document.
pub struct Orchestrator {
    generator: Arc<dyn TextGenerator>,
    retriever: Retriever,
    top_k: usize,
    summary_input_chars: usize,
    question_input_chars: usize,
    summary_word_limit: usize,
}

impl Orchestrator {
    /// Create an orchestrator with the default limits and `top_k = 5`.
    pub fn new(generator: Arc<dyn TextGenerator>, retriever: Retriever) -> Self {
        Self {
            generator,
            retriever,
            top_k: 5,
            summary_input_chars: SUMMARY_INPUT_CHARS,
            question_input_chars: QUESTION_INPUT_CHARS,
            summary_word_limit: SUMMARY_WORD_LIMIT,
        }
    }

    /// Create an orchestrator using the limits from `config`.
    pub fn from_config(
        generator: Arc<dyn TextGenerator>,
        retriever: Retriever,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            generator,
            retriever,
            top_k: config.rag.top_k,
            summary_input_chars: config.summary_input_chars,
            question_input_chars: config.question_input_chars,
            summary_word_limit: config.summary_word_limit,
        }
    }

    /// Number of chunks retrieved for answering and evaluation.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    async fn generate(&self, operation: Operation, prompt: &str) -> Result<String> {
        debug!(%operation, model = self.generator.model_id(), prompt_len = prompt.len(), "calling model");
        self.generator.generate(prompt).await.map_err(|e| {
            error!(%operation, model = self.generator.model_id(), error = %e, "generation failed");
            AssistantError::Generation { operation, message: e.to_string() }
        })
    }

    async fn retrieve(
        &self,
        operation: Operation,
        query: &str,
        entries: &[EmbeddedChunk],
    ) -> Result<RetrievalResult> {
        self.retriever.retrieve(query, entries, self.top_k).await.map_err(|source| {
            error!(%operation, error = %source, "retrieval failed");
            AssistantError::Embedding { operation, source }
        })
    }

    /// Summarize the start of a document in a bounded number of words.
    ///
    /// Only the first `summary_input_chars` characters are sent; a reply
    /// longer than the word limit is cut down to it.
    #[instrument(skip_all, fields(text_chars = text.len()))]
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(AssistantError::NoDocument);
        }
        let prompt = summary_prompt(char_prefix(text, self.summary_input_chars), self.summary_word_limit);
        let summary = self.generate(Operation::Summarize, &prompt).await?;
        let summary = truncate_words(summary.trim(), self.summary_word_limit);
        info!(words = summary.split_whitespace().count(), "generated summary");
        Ok(summary)
    }

    /// Answer a question using only the document chunks most relevant to it.
    ///
    /// When nothing relevant is retrieved the model is not called and a
    /// fixed "not found" answer is returned.
    #[instrument(skip_all)]
    pub async fn answer(&self, question: &str, entries: &[EmbeddedChunk]) -> Result<Answer> {
        let retrieved = self.retrieve(Operation::Answer, question, entries).await?;
        if retrieved.is_empty() {
            info!("no relevant chunks for question");
            return Ok(Answer {
                text: NO_RELEVANT_ANSWER.to_string(),
                justification: NO_RELEVANT_JUSTIFICATION.to_string(),
                snippets: Vec::new(),
            });
        }

        let prompt = answer_prompt(question, &retrieved.context());
        let text = self.generate(Operation::Answer, &prompt).await?;
        info!(chunks = retrieved.len(), "answered question");
        Ok(Answer {
            text,
            justification: format!("Based on: {}", retrieved.justifications().join("; ")),
            snippets: retrieved.snippets().into_iter().map(str::to_string).collect(),
        })
    }

    /// Ask the model for `n` comprehension questions about the document.
    ///
    /// Returns fewer than `n` questions if the model produced fewer usable
    /// lines.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Generation`] if the call fails or the reply
    /// holds no question in the expected format.
    #[instrument(skip_all, fields(n = n))]
    pub async fn generate_questions(&self, text: &str, n: usize) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Err(AssistantError::NoDocument);
        }
        if n == 0 {
            return Ok(Vec::new());
        }
        let prompt = questions_prompt(char_prefix(text, self.question_input_chars), n);
        let reply = self.generate(Operation::GenerateQuestions, &prompt).await?;
        let questions = parse_questions(&reply, n);
        if questions.is_empty() {
            error!(reply_len = reply.len(), "no questions found in reply");
            return Err(AssistantError::Generation {
                operation: Operation::GenerateQuestions,
                message: "reply contained no questions in the expected format".into(),
            });
        }
        info!(requested = n, generated = questions.len(), "generated challenge questions");
        Ok(questions)
    }

    /// Grade a user's answer against the document context relevant to the
    /// question.
    #[instrument(skip_all)]
    pub async fn evaluate(
        &self,
        question: &str,
        user_answer: &str,
        entries: &[EmbeddedChunk],
    ) -> Result<Evaluation> {
        let retrieved = self.retrieve(Operation::Evaluate, question, entries).await?;
        if retrieved.is_empty() {
            info!("no relevant chunks for evaluation");
            return Ok(Evaluation {
                text: NO_RELEVANT_EVALUATION.to_string(),
                verdict: Verdict::Unknown,
                context: NO_CONTEXT.to_string(),
            });
        }

        let context = retrieved.context();
        let prompt = evaluation_prompt(question, user_answer, &context);
        let text = self.generate(Operation::Evaluate, &prompt).await?;
        let verdict = Verdict::parse(&text);
        info!(%verdict, "evaluated answer");
        Ok(Evaluation { text, verdict, context })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use docqa_rag::{Chunk, EmbeddingProvider, EmbeddingTask};

    use super::*;
    use crate::generator::MockGenerator;

    /// Every text embeds to the same vector, so ranking falls back to order.
    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        async fn embed(&self, _text: &str, _task: EmbeddingTask) -> docqa_rag::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }

        fn model_id(&self) -> &str {
            "constant"
        }
    }

    fn orchestrator(generator: &Arc<MockGenerator>) -> Orchestrator {
        Orchestrator::new(generator.clone(), Retriever::new(Arc::new(ConstantEmbedder)))
    }

    fn entries(texts: &[&str]) -> Vec<EmbeddedChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| EmbeddedChunk {
                chunk: Chunk { index, text: text.to_string() },
                embedding: vec![1.0, 0.0],
            })
            .collect()
    }

    #[tokio::test]
    async fn answer_without_chunks_does_not_call_the_model() {
        let generator = Arc::new(MockGenerator::new());
        let answer = orchestrator(&generator).answer("Who?", &[]).await.unwrap();

        assert_eq!(answer.text, "Could not find relevant information in the document.");
        assert_eq!(answer.justification, "No relevant chunks found.");
        assert!(answer.snippets.is_empty());
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn evaluate_without_chunks_does_not_call_the_model() {
        let generator = Arc::new(MockGenerator::new());
        let evaluation = orchestrator(&generator).evaluate("Who?", "Me", &[]).await.unwrap();

        assert_eq!(evaluation.text, "Could not find relevant document context for evaluation.");
        assert_eq!(evaluation.context, "N/A");
        assert_eq!(evaluation.verdict, Verdict::Unknown);
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn answer_uses_at_most_top_k_chunks() {
        let generator = Arc::new(MockGenerator::new().reply("An answer."));
        let orchestrator = orchestrator(&generator).with_top_k(1);

        let answer =
            orchestrator.answer("Which?", &entries(&["first chunk", "second chunk"])).await.unwrap();
        assert_eq!(answer.snippets, vec!["first chunk"]);

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains("first chunk"));
        assert!(!prompt.contains("second chunk"));
    }

    #[tokio::test]
    async fn summary_input_is_cut_at_ten_thousand_chars() {
        let generator = Arc::new(MockGenerator::new().reply("Short."));
        let text = format!("{}{}", "é".repeat(10_000), "ß".repeat(10_000));

        orchestrator(&generator).summarize(&text).await.unwrap();

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains(&"é".repeat(10_000)));
        assert!(!prompt.contains('ß'));
    }

    #[tokio::test]
    async fn question_input_is_cut_at_fifteen_thousand_chars() {
        let generator = Arc::new(MockGenerator::new().reply("Q1: Why?"));
        let text = format!("{}{}", "é".repeat(15_000), "ß".repeat(5_000));

        let questions = orchestrator(&generator).generate_questions(&text, 1).await.unwrap();
        assert_eq!(questions, vec!["Why?"]);

        let prompt = &generator.prompts()[0];
        assert!(prompt.contains(&"é".repeat(15_000)));
        assert!(!prompt.contains('ß'));
    }

    #[test]
    fn parses_labelled_questions_only() {
        let reply = "Q1: What colour is the cat?\nQ2: Where did the dog run?\nRandomText\nQ3: Why?";
        assert_eq!(
            parse_questions(reply, 3),
            vec!["What colour is the cat?", "Where did the dog run?", "Why?"]
        );
    }

    #[test]
    fn question_parsing_stops_at_n_and_skips_empty() {
        let reply = "Here are your questions:\n  Q[1]:  First?  \nQ2:\nQ3: Second?\nQ4: Third?";
        assert_eq!(parse_questions(reply, 2), vec!["First?", "Second?"]);
        assert!(parse_questions("Question: no label", 3).is_empty());
        assert!(parse_questions("Q1: ignored", 0).is_empty());
    }

    #[test]
    fn long_summary_is_cut_to_limit() {
        let reply: Vec<String> = (0..300).map(|i| format!("word{i}")).collect();
        let truncated = truncate_words(&reply.join(" "), 150);
        assert!(truncated.ends_with("word149..."));
        assert_eq!(truncated.trim_end_matches("...").split_whitespace().count(), 150);
    }

    #[test]
    fn short_summary_is_unchanged() {
        assert_eq!(truncate_words("A short\nsummary.", 150), "A short\nsummary.");
    }

    #[test]
    fn char_prefix_respects_char_boundaries() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("abc", 0), "");
    }

    #[test]
    fn verdict_prefers_evaluation_line() {
        let text = "Evaluation: Partially Correct\nJustification: The answer is correct about X.";
        assert_eq!(Verdict::parse(text), Verdict::PartiallyCorrect);
        assert_eq!(Verdict::parse("**Evaluation:** Incorrect\nJustification: ..."), Verdict::Incorrect);
        assert_eq!(Verdict::parse("Evaluation: Correct"), Verdict::Correct);
    }

    #[test]
    fn verdict_falls_back_to_any_line() {
        assert_eq!(Verdict::parse("The answer is not correct."), Verdict::Incorrect);
        assert_eq!(Verdict::parse("I cannot judge this."), Verdict::Unknown);
        assert_eq!(Verdict::PartiallyCorrect.to_string(), "Partially Correct");
    }

    #[test]
    fn answer_prompt_embeds_fallback_sentence() {
        let prompt = answer_prompt("Who?", "ctx");
        assert!(prompt.contains(NOT_IN_CONTEXT));
        assert!(prompt.contains("Question: Who?"));
        assert!(prompt.contains("Context from document:\nctx"));
    }
}
