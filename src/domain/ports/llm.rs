use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::{errors::DomainError, Message};

/// Incremental text fragments from a streaming completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, DomainError>> + Send>>;

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, DomainError>;
    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream, DomainError>;
}
