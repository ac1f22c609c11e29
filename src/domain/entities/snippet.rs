use serde::{Deserialize, Serialize};

/// One search hit, reduced to the text that ends up in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSnippet {
    pub source: Option<String>,
    pub content: String,
}

impl SearchSnippet {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            source: None,
            content: content.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = (!source.is_empty()).then_some(source);
        self
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
