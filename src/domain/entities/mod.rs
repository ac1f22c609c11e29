mod answer;
mod message;
mod question;
mod snippet;

pub use answer::{AnswerEvent, Intent};
pub use message::{Message, MessageRole};
pub use question::Question;
pub use snippet::SearchSnippet;
