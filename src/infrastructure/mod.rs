pub mod config;
pub(crate) mod http;
pub mod llm;
pub mod search;

pub use config::{
    AppConfig, CannedRule, Config, LlmConfig, PromptsConfig, SearchConfig, SearchProvider,
    Transport,
};
pub use llm::MoonshotLlm;
pub use search::{BochaSearch, TavilySearch};
