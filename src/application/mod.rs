//! Application layer - Use cases and orchestration.
//!
//! Services here depend on domain ports (traits) rather than concrete
//! HTTP clients, so a chat turn can run against in-memory fakes.

pub mod services;

pub use services::{AnswerStream, ChatTurnOrchestrator, Delivery, IntentClassifier, PromptBuilder};
