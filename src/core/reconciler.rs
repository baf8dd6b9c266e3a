use crate::core::chat_stream::StreamMessage;
use crate::core::transcript::Transcript;

/// Failure text rendered in place of an answer. Mirrors the tone of the
/// rest of the transcript rather than exposing raw transport errors.
pub fn format_error_message(detail: &str) -> String {
    format!("Sorry, I encountered an error. {detail} Please try again later.")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Streaming,
    Completed,
    Failed,
}

/// Applies one stream's messages to the transcript.
///
/// Phases run `Idle -> Streaming -> {Completed, Failed}` and never move
/// again after a terminal phase: a stray message arriving after `Done` is
/// dropped. A stream may also die without ever delivering a terminal event;
/// the reconciler tolerates that by simply never reaching a terminal phase
/// (the transport layer converts detectable cases, connection close and
/// idle timeout, into explicit terminals before they get here).
#[derive(Debug)]
pub struct StreamReconciler {
    stream_id: u64,
    phase: StreamPhase,
}

impl StreamReconciler {
    pub fn new(stream_id: u64) -> Self {
        Self {
            stream_id,
            phase: StreamPhase::Idle,
        }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, StreamPhase::Completed | StreamPhase::Failed)
    }

    /// Append the placeholder turn before the first byte arrives, so the
    /// UI shows activity without delay.
    pub fn begin(&mut self, transcript: &mut Transcript) {
        debug_assert_eq!(self.phase, StreamPhase::Idle);
        transcript.push_placeholder();
        self.phase = StreamPhase::Streaming;
    }

    pub fn apply(&mut self, transcript: &mut Transcript, message: StreamMessage) {
        match (self.phase, message) {
            (StreamPhase::Streaming, StreamMessage::Chunk(delta)) => {
                transcript.append_to_streaming(&delta);
            }
            (StreamPhase::Streaming, StreamMessage::End) => {
                transcript.finalize_streaming();
                self.phase = StreamPhase::Completed;
            }
            (StreamPhase::Streaming, StreamMessage::Error(detail)) => {
                transcript.fail_streaming(format_error_message(&detail));
                self.phase = StreamPhase::Failed;
            }
            // Failure before the stream ever opened: there is no
            // placeholder to overwrite, so a fresh error turn is appended.
            (StreamPhase::Idle, StreamMessage::Error(detail)) => {
                transcript.fail_streaming(format_error_message(&detail));
                self.phase = StreamPhase::Failed;
            }
            (StreamPhase::Idle, StreamMessage::End) => {
                self.phase = StreamPhase::Completed;
            }
            // Chunks before begin() and anything after a terminal phase
            // are dropped.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streaming_setup() -> (Transcript, StreamReconciler) {
        let mut transcript = Transcript::new();
        transcript.push_user("What is the demand forecast?");
        let mut reconciler = StreamReconciler::new(1);
        reconciler.begin(&mut transcript);
        (transcript, reconciler)
    }

    #[test]
    fn chunks_concatenate_in_order_and_done_finalizes() {
        let (mut transcript, mut reconciler) = streaming_setup();

        for delta in ["The", " forecast", " is up."] {
            reconciler.apply(&mut transcript, StreamMessage::Chunk(delta.to_string()));
        }
        reconciler.apply(&mut transcript, StreamMessage::End);

        let last = transcript.last().unwrap();
        assert_eq!(last.content, "The forecast is up.");
        assert!(!last.is_streaming);
        assert_eq!(reconciler.phase(), StreamPhase::Completed);
    }

    #[test]
    fn error_overwrites_partial_content() {
        let (mut transcript, mut reconciler) = streaming_setup();

        reconciler.apply(&mut transcript, StreamMessage::Chunk("partial".to_string()));
        reconciler.apply(
            &mut transcript,
            StreamMessage::Error("model overloaded".to_string()),
        );
        reconciler.apply(&mut transcript, StreamMessage::End);

        let last = transcript.last().unwrap();
        assert_eq!(last.content, format_error_message("model overloaded"));
        assert!(last.content.contains("model overloaded"));
        assert!(!last.is_streaming);
        assert_eq!(reconciler.phase(), StreamPhase::Failed);
    }

    #[test]
    fn failure_before_open_appends_a_new_error_turn() {
        let mut transcript = Transcript::new();
        transcript.push_user("hello");
        let mut reconciler = StreamReconciler::new(1);

        // No begin(): the request failed before the stream opened.
        reconciler.apply(
            &mut transcript,
            StreamMessage::Error("connection refused".to_string()),
        );

        assert_eq!(transcript.len(), 2);
        let last = transcript.last().unwrap();
        assert!(last.content.contains("connection refused"));
        assert!(!last.is_streaming);
        assert_eq!(reconciler.phase(), StreamPhase::Failed);
    }

    #[test]
    fn messages_after_done_are_dropped() {
        let (mut transcript, mut reconciler) = streaming_setup();

        reconciler.apply(&mut transcript, StreamMessage::Chunk("answer".to_string()));
        reconciler.apply(&mut transcript, StreamMessage::End);
        reconciler.apply(&mut transcript, StreamMessage::Chunk(" late".to_string()));
        reconciler.apply(&mut transcript, StreamMessage::End);

        assert_eq!(transcript.last().unwrap().content, "answer");
        assert_eq!(reconciler.phase(), StreamPhase::Completed);
    }

    #[test]
    fn stream_without_terminal_leaves_turn_streaming() {
        let (mut transcript, mut reconciler) = streaming_setup();

        reconciler.apply(&mut transcript, StreamMessage::Chunk("partial".to_string()));

        assert!(!reconciler.is_terminal());
        assert!(transcript.last().unwrap().is_streaming);
    }
}
