mod intent;
mod orchestrator;
mod prompt;

pub use intent::IntentClassifier;
pub use orchestrator::{AnswerStream, ChatTurnOrchestrator, Delivery};
pub use prompt::PromptBuilder;
