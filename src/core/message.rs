use crate::api::SourceRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptRole {
    User,
    Assistant,
    /// App-authored failure text rendered in the transcript but never
    /// transmitted to the backend.
    AppError,
}

impl TranscriptRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::AppError => "app/error",
        }
    }

    pub fn is_user(self) -> bool {
        self == TranscriptRole::User
    }

    pub fn is_assistant(self) -> bool {
        self == TranscriptRole::Assistant
    }
}

impl AsRef<str> for TranscriptRole {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One rendered entry in the conversation.
///
/// A single shape covers every turn: user turns carry neither sources nor a
/// streaming flag, finished assistant turns may carry sources, and an
/// in-flight assistant turn has `is_streaming` set until its stream delivers
/// a terminal event. User turns are immutable once created; streaming turns
/// are mutated only through the transcript's patch-last operations.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: TranscriptRole,
    pub content: String,
    pub sources: Vec<SourceRef>,
    pub is_streaming: bool,
}

impl Message {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            sources: Vec::new(),
            is_streaming: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::Assistant, content)
    }

    pub fn assistant_with_sources(content: impl Into<String>, sources: Vec<SourceRef>) -> Self {
        Self {
            sources,
            ..Self::assistant(content)
        }
    }

    /// Empty assistant turn appended before the first streamed byte arrives.
    pub fn streaming_placeholder() -> Self {
        Self {
            is_streaming: true,
            ..Self::assistant("")
        }
    }

    pub fn app_error(content: impl Into<String>) -> Self {
        Self::new(TranscriptRole::AppError, content)
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_an_empty_streaming_assistant_turn() {
        let placeholder = Message::streaming_placeholder();
        assert!(placeholder.is_assistant());
        assert!(placeholder.is_streaming);
        assert!(placeholder.content.is_empty());
        assert!(placeholder.sources.is_empty());
    }

    #[test]
    fn constructors_set_roles() {
        assert_eq!(Message::user("hi").role, TranscriptRole::User);
        assert_eq!(Message::assistant("hello").role, TranscriptRole::Assistant);
        assert_eq!(Message::app_error("boom").role, TranscriptRole::AppError);
    }

    #[test]
    fn non_placeholder_turns_are_not_streaming() {
        assert!(!Message::user("hi").is_streaming);
        assert!(!Message::assistant("hello").is_streaming);
        assert!(!Message::app_error("boom").is_streaming);
    }
}
