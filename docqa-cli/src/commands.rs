//! REPL command parsing.

use std::path::PathBuf;

use thiserror::Error;

pub const HELP: &str = "\
Commands:
  /upload PATH      load a PDF or text file (replaces the current document)
  /summary          show the summary of the current document
  /challenge [N]    generate N comprehension questions (default from config)
  /answer K TEXT    answer challenge question K and get it evaluated
  /status           show what is loaded
  /help             show this help
  /quit             exit
Anything else is asked as a question about the document.";

/// A parsed REPL input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(PathBuf),
    Summary,
    Challenge(Option<usize>),
    /// Answer to the challenge question with the given 1-based number.
    Answer { number: usize, text: String },
    Status,
    Help,
    Quit,
    Ask(String),
    Empty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '/{0}', type /help for a list")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line of user input.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(if line.is_empty() { Command::Empty } else { Command::Ask(line.to_string()) });
    };

    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };

    match name {
        "upload" if !args.is_empty() => Ok(Command::Upload(PathBuf::from(args))),
        "upload" => Err(CommandError::Usage("/upload PATH")),
        "summary" => Ok(Command::Summary),
        "challenge" if args.is_empty() => Ok(Command::Challenge(None)),
        "challenge" => match args.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Command::Challenge(Some(n))),
            _ => Err(CommandError::Usage("/challenge [N] with N > 0")),
        },
        "answer" => {
            let (number, text) =
                args.split_once(char::is_whitespace).ok_or(CommandError::Usage("/answer K TEXT"))?;
            let number = number
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(CommandError::Usage("/answer K TEXT with K the question number"))?;
            Ok(Command::Answer { number, text: text.trim().to_string() })
        }
        "status" => Ok(Command::Status),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}
