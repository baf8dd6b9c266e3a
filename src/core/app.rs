use tracing::debug;

use crate::api::QueryResponse;
use crate::core::chat_stream::StreamMessage;
use crate::core::constants::WELCOME_MESSAGE;
use crate::core::reconciler::{format_error_message, StreamReconciler};
use crate::core::transcript::Transcript;

/// Backend reachability, decided once at startup by the health probe.
/// Never reverts to `Checking`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiStatus {
    Checking,
    Healthy,
    Unhealthy,
}

/// Application state driven by the chat event loop. One request may be in
/// flight at a time; `is_loading` is the sole concurrency control and also
/// disables the input pane while set.
pub struct App {
    pub transcript: Transcript,
    pub api_status: ApiStatus,
    pub input: String,
    pub is_loading: bool,
    pub scroll_offset: u16,
    pub auto_scroll: bool,
    base_url: String,
    reconciler: Option<StreamReconciler>,
    pending_query: Option<u64>,
    next_request_id: u64,
}

impl App {
    pub fn new(base_url: String) -> Self {
        Self {
            transcript: Transcript::new(),
            api_status: ApiStatus::Checking,
            input: String::new(),
            is_loading: false,
            scroll_offset: 0,
            auto_scroll: true,
            base_url,
            reconciler: None,
            pending_query: None,
            next_request_id: 1,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Record the startup probe's verdict. Healthy seeds the welcome turn;
    /// unhealthy leaves the transcript empty behind the blocking error
    /// screen. Later calls are ignored so the status is set exactly once.
    pub fn apply_health(&mut self, healthy: bool) {
        if self.api_status != ApiStatus::Checking {
            return;
        }
        if healthy {
            self.api_status = ApiStatus::Healthy;
            self.transcript.push_assistant(WELCOME_MESSAGE, Vec::new());
        } else {
            self.api_status = ApiStatus::Unhealthy;
        }
    }

    /// Validate a submission: trimmed-nonempty text, a healthy backend, and
    /// no request already in flight.
    fn sanitize_submission(&self, text: &str) -> Option<String> {
        if self.is_loading || self.api_status != ApiStatus::Healthy {
            return None;
        }
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_string())
    }

    fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Start a streamed request: append the user turn and the streaming
    /// placeholder, and return the text and id the caller should hand to
    /// the stream service. `None` means the submission was a no-op.
    pub fn begin_streaming_submission(&mut self, text: &str) -> Option<(String, u64)> {
        let query = self.sanitize_submission(text)?;
        let stream_id = self.allocate_request_id();

        self.transcript.push_user(query.clone());
        let mut reconciler = StreamReconciler::new(stream_id);
        reconciler.begin(&mut self.transcript);
        self.reconciler = Some(reconciler);
        self.is_loading = true;
        self.auto_scroll = true;

        Some((query, stream_id))
    }

    /// Start a single-shot request: only the user turn is appended; the
    /// answer turn arrives whole in [`App::complete_query`].
    pub fn begin_query_submission(&mut self, text: &str) -> Option<(String, u64)> {
        let query = self.sanitize_submission(text)?;
        let request_id = self.allocate_request_id();

        self.transcript.push_user(query.clone());
        self.pending_query = Some(request_id);
        self.is_loading = true;
        self.auto_scroll = true;

        Some((query, request_id))
    }

    /// Route one stream message to the live reconciler. Messages tagged
    /// with any other stream id are dropped.
    pub fn apply_stream_message(&mut self, stream_id: u64, message: StreamMessage) {
        let Some(reconciler) = self.reconciler.as_mut() else {
            debug!(stream_id, "dropping stream message with no stream in flight");
            return;
        };
        if reconciler.stream_id() != stream_id {
            debug!(stream_id, "dropping stream message from superseded stream");
            return;
        }

        reconciler.apply(&mut self.transcript, message);
        if reconciler.is_terminal() {
            self.reconciler = None;
            self.is_loading = false;
        }
    }

    /// Land a single-shot result in the transcript.
    pub fn complete_query(&mut self, request_id: u64, result: Result<QueryResponse, String>) {
        if self.pending_query != Some(request_id) {
            debug!(request_id, "dropping query result from superseded request");
            return;
        }
        self.pending_query = None;
        self.is_loading = false;

        match result {
            Ok(response) => self
                .transcript
                .push_assistant(response.answer, response.sources),
            Err(detail) => self.transcript.push_error(format_error_message(&detail)),
        }
    }

    /// The standalone typing indicator is only shown when a request is in
    /// flight and the last turn is not itself streaming, so two loading
    /// affordances never appear at once.
    pub fn show_typing_indicator(&self) -> bool {
        self.is_loading && !self.transcript.has_streaming_turn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SourceRef;

    fn healthy_app() -> App {
        let mut app = App::new("http://localhost:8000".to_string());
        app.apply_health(true);
        app
    }

    #[test]
    fn healthy_probe_seeds_exactly_one_welcome_turn() {
        let app = healthy_app();
        assert_eq!(app.api_status, ApiStatus::Healthy);
        assert_eq!(app.transcript.len(), 1);
        let welcome = app.transcript.last().unwrap();
        assert!(welcome.is_assistant());
        assert!(welcome.content.contains("Arctic Valley"));
    }

    #[test]
    fn unhealthy_probe_never_adds_a_welcome_turn() {
        let mut app = App::new("http://localhost:8000".to_string());
        app.apply_health(false);
        assert_eq!(app.api_status, ApiStatus::Unhealthy);
        assert!(app.transcript.is_empty());
        assert!(app.begin_streaming_submission("hello").is_none());
    }

    #[test]
    fn health_status_is_set_once() {
        let mut app = healthy_app();
        app.apply_health(false);
        assert_eq!(app.api_status, ApiStatus::Healthy);
        assert_eq!(app.transcript.len(), 1);
    }

    #[test]
    fn whitespace_submission_is_a_no_op() {
        let mut app = healthy_app();
        assert!(app.begin_streaming_submission("").is_none());
        assert!(app.begin_streaming_submission("   \n\t ").is_none());
        assert!(app.begin_query_submission("  ").is_none());
        assert_eq!(app.transcript.len(), 1);
        assert!(!app.is_loading);
    }

    #[test]
    fn submission_is_blocked_while_a_request_is_in_flight() {
        let mut app = healthy_app();
        let (_, first) = app.begin_streaming_submission("first").unwrap();
        assert!(app.begin_streaming_submission("second").is_none());
        assert!(app.begin_query_submission("second").is_none());

        app.apply_stream_message(first, StreamMessage::End);
        assert!(app.begin_streaming_submission("second").is_some());
    }

    #[test]
    fn streamed_conversation_end_to_end() {
        let mut app = healthy_app();

        let (query, stream_id) = app
            .begin_streaming_submission("What is the demand forecast?")
            .unwrap();
        assert_eq!(query, "What is the demand forecast?");
        assert!(app.is_loading);

        for delta in ["The", " forecast", " is up."] {
            app.apply_stream_message(stream_id, StreamMessage::Chunk(delta.to_string()));
        }
        app.apply_stream_message(stream_id, StreamMessage::End);

        // Welcome, user turn, answer.
        assert_eq!(app.transcript.len(), 3);
        let last = app.transcript.last().unwrap();
        assert_eq!(last.content, "The forecast is up.");
        assert!(!last.is_streaming);
        assert!(!app.is_loading);
    }

    #[test]
    fn stale_stream_messages_are_dropped() {
        let mut app = healthy_app();
        let (_, stream_id) = app.begin_streaming_submission("question").unwrap();

        app.apply_stream_message(stream_id + 1, StreamMessage::Chunk("intruder".to_string()));
        assert_eq!(app.transcript.last().unwrap().content, "");

        app.apply_stream_message(stream_id, StreamMessage::End);
        app.apply_stream_message(stream_id, StreamMessage::Chunk("late".to_string()));
        assert_eq!(app.transcript.last().unwrap().content, "");
        assert!(!app.is_loading);
    }

    #[test]
    fn stream_error_lands_in_the_placeholder() {
        let mut app = healthy_app();
        let (_, stream_id) = app.begin_streaming_submission("question").unwrap();

        app.apply_stream_message(stream_id, StreamMessage::Error("boom".to_string()));
        app.apply_stream_message(stream_id, StreamMessage::End);

        let last = app.transcript.last().unwrap();
        assert!(last.content.contains("boom"));
        assert!(!last.is_streaming);
        assert!(!app.is_loading);
        assert_eq!(app.transcript.len(), 3);
    }

    #[test]
    fn single_shot_success_attaches_sources() {
        let mut app = healthy_app();
        let (_, request_id) = app.begin_query_submission("question").unwrap();
        assert!(app.show_typing_indicator());

        app.complete_query(
            request_id,
            Ok(QueryResponse {
                answer: "It depends.".to_string(),
                sources: vec![SourceRef {
                    title: "Forecast methodology".to_string(),
                    origin: "docs/forecast.md".to_string(),
                }],
            }),
        );

        let last = app.transcript.last().unwrap();
        assert_eq!(last.content, "It depends.");
        assert_eq!(last.sources.len(), 1);
        assert!(!app.is_loading);
    }

    #[test]
    fn single_shot_failure_becomes_an_error_turn() {
        let mut app = healthy_app();
        let (_, request_id) = app.begin_query_submission("question").unwrap();

        app.complete_query(request_id, Err("connection refused".to_string()));

        let last = app.transcript.last().unwrap();
        assert!(last.content.contains("connection refused"));
        assert!(last.content.starts_with("Sorry, I encountered an error."));
        assert!(!app.is_loading);
    }

    #[test]
    fn typing_indicator_defers_to_the_streaming_turn() {
        let mut app = healthy_app();
        assert!(!app.show_typing_indicator());

        // The placeholder is already streaming, so no second affordance.
        let (_, stream_id) = app.begin_streaming_submission("question").unwrap();
        assert!(!app.show_typing_indicator());

        app.apply_stream_message(stream_id, StreamMessage::End);
        assert!(!app.show_typing_indicator());
    }
}
