//! Command-line interface parsing and startup wiring.

use std::error::Error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::core::constants::{
    DEFAULT_BASE_URL, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MAX_CONTEXT_DOCS,
};
use crate::ui::chat_loop::run_chat;

#[derive(Parser, Debug)]
#[command(name = "arcvale")]
#[command(about = "A terminal chat client for the Arctic Valley advisor API")]
#[command(
    long_about = "Arcvale is a full-screen terminal chat client for the Arctic Valley advisor, \
a retrieval-augmented question-answering service. Answers stream into the \
transcript as they are generated, with source citations attached where the \
backend provides them.\n\n\
Controls:\n\
  Type              Enter your question in the input field\n\
  Enter             Send the question\n\
  Up/Down/Mouse     Scroll through the conversation\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    /// Advisor service base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Number of context documents the backend should retrieve per query
    #[arg(long, default_value_t = DEFAULT_MAX_CONTEXT_DOCS)]
    pub max_context_docs: u32,

    /// Use the single-shot query endpoint instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// Fail a stream that produces no data for this many seconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT_SECS)]
    pub idle_timeout_secs: u64,

    /// Write diagnostic logs to this file (the TUI owns the terminal, so
    /// logging is off unless a file is given; filter with RUST_LOG)
    #[arg(short = 'l', long, value_name = "FILE")]
    pub log: Option<String>,
}

pub async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    if let Some(path) = &args.log {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("arcvale=debug")),
            )
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .init();
    }

    run_chat(args).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_contract() {
        let args = Args::parse_from(["arcvale"]);
        assert_eq!(args.base_url, DEFAULT_BASE_URL);
        assert_eq!(args.max_context_docs, DEFAULT_MAX_CONTEXT_DOCS);
        assert_eq!(args.idle_timeout_secs, DEFAULT_IDLE_TIMEOUT_SECS);
        assert!(!args.no_stream);
        assert!(args.log.is_none());
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from([
            "arcvale",
            "--base-url",
            "http://advisor.internal:9000/",
            "--max-context-docs",
            "8",
            "--no-stream",
            "--idle-timeout-secs",
            "0",
            "-l",
            "arcvale.log",
        ]);
        assert_eq!(args.base_url, "http://advisor.internal:9000/");
        assert_eq!(args.max_context_docs, 8);
        assert!(args.no_stream);
        assert_eq!(args.idle_timeout_secs, 0);
        assert_eq!(args.log.as_deref(), Some("arcvale.log"));
    }
}
