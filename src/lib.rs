//! Arcvale is a terminal chat client for the Arctic Valley advisor API, a
//! retrieval-augmented question-answering service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation transcript, the streaming reconciler
//!   state machine, and the event-stream decoding that feeds it.
//! - [`api`] defines the wire payloads and the single-shot HTTP client used
//!   for queries and the startup health probe.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`cli`] parses command-line arguments and dispatches into the chat
//!   loop.
//!
//! The runtime entrypoint lives in the binary crate (`src/main.rs`) and
//! routes through [`crate::cli::run`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
