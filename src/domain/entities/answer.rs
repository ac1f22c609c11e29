use serde_json::json;

/// One event of a chat turn's output sequence.
///
/// A turn yields zero or more `Fragment`s followed by exactly one `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEvent {
    Fragment(String),
    Done,
}

impl AnswerEvent {
    pub fn fragment(content: impl Into<String>) -> Self {
        Self::Fragment(content.into())
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn to_payload(&self) -> serde_json::Value {
        match self {
            Self::Fragment(text) => json!({ "answer": text }),
            Self::Done => json!({ "done": true }),
        }
    }

    pub fn to_sse_data(&self) -> String {
        self.to_payload().to_string()
    }
}

/// Outcome of the canned-answer predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Canned(String),
    NeedsSearch,
}
