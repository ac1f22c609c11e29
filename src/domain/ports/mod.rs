mod llm;
mod search;

pub use llm::{CompletionService, FragmentStream};
pub use search::SearchService;
