//! Campus chat assistant: a single-turn chat service that enriches questions
//! with web search results and answers through the Moonshot completion API.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
