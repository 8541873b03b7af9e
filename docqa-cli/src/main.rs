//! `docqa`: an interactive document assistant.
//!
//! Upload a PDF or text file, ask questions answered only from its content,
//! or test yourself with generated comprehension questions.

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use docqa_assistant::{Assistant, AssistantConfig, AssistantError, DocumentSession};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "docqa", version, about = "Ask questions about a document, grounded in its text")]
struct Cli {
    /// Document to load at startup
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Maximum chunk size in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Number of chunks retrieved per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Default number of challenge questions
    #[arg(long)]
    questions: Option<usize>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<AssistantConfig> {
    let mut builder = AssistantConfig::from_env()?.into_builder();
    if let Some(size) = cli.chunk_size {
        builder = builder.chunk_size(size);
    }
    if let Some(overlap) = cli.chunk_overlap {
        builder = builder.chunk_overlap(overlap);
    }
    if let Some(top_k) = cli.top_k {
        builder = builder.top_k(top_k);
    }
    if let Some(count) = cli.questions {
        builder = builder.question_count(count);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = load_config(&cli).context("invalid configuration")?;
    debug!(?config, "configuration loaded");
    let mut assistant = Assistant::from_config(&config).context("failed to start assistant")?;

    println!("docqa: document question answering. Type /help for commands.");
    if let Some(path) = &cli.file {
        upload(&mut assistant, path).await;
    }

    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    loop {
        let line = match editor.readline("docqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        if !line.trim().is_empty() {
            let _ = editor.add_history_entry(line.as_str());
        }

        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Upload(path) => upload(&mut assistant, &path).await,
            Command::Summary => match assistant.session() {
                Some(session) => println!("{}", session.summary),
                None => report(&AssistantError::NoDocument),
            },
            Command::Status => print_status(assistant.session()),
            Command::Challenge(n) => match assistant.generate_challenge(n).await {
                Ok(questions) => {
                    for (i, question) in questions.iter().enumerate() {
                        println!("Q{}: {question}", i + 1);
                    }
                    println!("Answer with /answer K TEXT.");
                }
                Err(e) => report(&e),
            },
            Command::Answer { number, text } => {
                let question = assistant
                    .session()
                    .and_then(|session| session.challenge.get(number - 1))
                    .map(|item| item.question.clone());
                let Some(question) = question else {
                    println!("No challenge question {number}. Generate some with /challenge.");
                    continue;
                };
                match assistant.submit_challenge_answer(&question, &text).await {
                    Ok(evaluation) => {
                        println!("{}", evaluation.text.trim());
                        println!("\nVerdict: {}", evaluation.verdict);
                        println!("\n--- Context used ---\n{}", evaluation.context);
                    }
                    Err(e) => report(&e),
                }
            }
            Command::Ask(question) => match assistant.ask(&question).await {
                Ok(answer) => {
                    println!("{}", answer.text.trim());
                    println!("\n{}", answer.justification);
                    for (i, snippet) in answer.snippets.iter().enumerate() {
                        println!("\n--- Snippet {} ---\n{snippet}", i + 1);
                    }
                }
                Err(e) => report(&e),
            },
        }
    }

    Ok(())
}

async fn upload(assistant: &mut Assistant, path: &Path) {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("document").to_string();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Reading failed before processing started; drop the old document too.
            assistant.clear();
            println!("Could not read {}: {e}", path.display());
            return;
        }
    };

    println!("Processing {name}...");
    match assistant.upload(&name, bytes).await {
        Ok(session) => {
            println!("Loaded {name}: {} chunks.", session.chunks.len());
            if session.skipped_chunks() > 0 {
                println!("{} chunks could not be embedded and were skipped.", session.skipped_chunks());
            }
            println!("\nSummary:\n{}", session.summary);
        }
        Err(e) => report(&e),
    }
}

fn report(err: &AssistantError) {
    error!(error = %err, "operation failed");
    println!("{}", err.user_message());
}

fn print_status(session: Option<&DocumentSession>) {
    let Some(session) = session else {
        println!("No document loaded.");
        return;
    };
    println!("Document: {} ({} characters)", session.document.name, session.document.char_count());
    println!("Chunks: {} embedded, {} skipped", session.chunks.len(), session.skipped_chunks());
    println!("Questions asked: {}", session.history.len());
    let answered = session.challenge.iter().filter(|item| item.evaluation.is_some()).count();
    println!("Challenge: {answered}/{} answered", session.challenge.len());
}
