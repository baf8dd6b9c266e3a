use crate::api::SourceRef;
use crate::core::message::Message;

/// Ordered sequence of conversation turns; the single source of truth for
/// what is rendered.
///
/// Turns are append-only, except that the last turn may be patched while it
/// is streaming. Invariant: at most one turn is streaming at any time, and
/// if present it is the last element. The patch operations below are the
/// only way a streaming flag is cleared or streamed text accumulates, so the
/// invariant holds by construction as long as callers only append a
/// placeholder via [`Transcript::push_placeholder`].
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// True while the last turn is still receiving streamed content.
    pub fn has_streaming_turn(&self) -> bool {
        self.messages.last().is_some_and(|m| m.is_streaming)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        debug_assert!(!self.has_streaming_turn());
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, sources: Vec<SourceRef>) {
        debug_assert!(!self.has_streaming_turn());
        self.messages
            .push(Message::assistant_with_sources(content, sources));
    }

    pub fn push_error(&mut self, content: impl Into<String>) {
        debug_assert!(!self.has_streaming_turn());
        self.messages.push(Message::app_error(content));
    }

    /// Append the empty assistant turn a stream will patch in place.
    pub fn push_placeholder(&mut self) {
        debug_assert!(!self.has_streaming_turn());
        self.messages.push(Message::streaming_placeholder());
    }

    /// Append a content delta to the streaming turn. Deltas arriving when no
    /// turn is streaming (a stale stream, or one already finalized) are
    /// dropped rather than appended to an earlier turn.
    pub fn append_to_streaming(&mut self, delta: &str) {
        if let Some(last) = self.messages.last_mut() {
            if last.is_streaming {
                last.content.push_str(delta);
            }
        }
    }

    /// Clear the streaming flag on the last turn, leaving its text as the
    /// final answer. No-op when nothing is streaming.
    pub fn finalize_streaming(&mut self) {
        if let Some(last) = self.messages.last_mut() {
            last.is_streaming = false;
        }
    }

    /// Replace the streaming turn's text with formatted failure text and
    /// clear its flag. When no placeholder exists (the request failed before
    /// the stream opened) a fresh error turn is appended instead.
    pub fn fail_streaming(&mut self, error_text: impl Into<String>) {
        match self.messages.last_mut() {
            Some(last) if last.is_streaming => {
                last.content = error_text.into();
                last.is_streaming = false;
            }
            _ => self.messages.push(Message::app_error(error_text)),
        }
    }

    #[cfg(test)]
    pub fn streaming_turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_streaming).count()
    }
}
