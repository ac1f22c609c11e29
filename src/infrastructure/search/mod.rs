pub mod bocha;
pub mod tavily;

use std::sync::Arc;

use crate::domain::{ports::SearchService, DomainError};
use crate::infrastructure::config::{SearchConfig, SearchProvider};

pub use bocha::BochaSearch;
pub use tavily::TavilySearch;

/// Builds the configured search collaborator. A provider without a key
/// yields `None` and the service answers without web context.
pub fn from_config(config: &SearchConfig) -> Result<Option<Arc<dyn SearchService>>, DomainError> {
    let Some(key) = config.api_key() else {
        if config.provider != SearchProvider::None {
            tracing::warn!(provider = ?config.provider, "Search API key missing, web search disabled");
        }
        return Ok(None);
    };

    let service: Arc<dyn SearchService> = match config.provider {
        SearchProvider::Tavily => Arc::new(TavilySearch::new(key, config)?),
        SearchProvider::Bocha => Arc::new(BochaSearch::new(key, config)?),
        SearchProvider::None => return Ok(None),
    };
    Ok(Some(service))
}
