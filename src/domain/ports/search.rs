use async_trait::async_trait;

use crate::domain::{errors::DomainError, SearchSnippet};

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchSnippet>, DomainError>;
    fn provider(&self) -> &'static str;
}
