//! Shared constants used across the application

/// Default advisor service endpoint; override with `--base-url`.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default number of context documents requested per query.
pub const DEFAULT_MAX_CONTEXT_DOCS: u32 = 4;

/// Default idle timeout for a streaming response, in seconds. A stream that
/// produces no bytes for this long is failed rather than left hanging.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 90;

/// Seed message shown once the health probe reports a reachable backend.
pub const WELCOME_MESSAGE: &str = "Welcome to the Arctic Valley advisor! \
How can I help you with your business simulation project?";
